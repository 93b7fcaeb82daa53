use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub spectrum: SpectrumConfig,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_fps")]
    pub fps: f64,
    #[serde(default)]
    pub history: usize,
}

#[derive(Debug, Deserialize)]
pub struct SpectrumConfig {
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_zero_extension")]
    pub zero_extension: usize,
    #[serde(default = "default_min_db")]
    pub min_db: f32,
    #[serde(default = "default_output_resolution")]
    pub output_resolution: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            fps: default_fps(),
            history: 0,
        }
    }
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            zero_extension: default_zero_extension(),
            min_db: default_min_db(),
            output_resolution: default_output_resolution(),
        }
    }
}

fn default_dir() -> PathBuf { PathBuf::from("./fftimg") }
fn default_fps() -> f64 { 30.0 }
fn default_window_size() -> usize { 1024 }
fn default_zero_extension() -> usize { 1024 }
fn default_min_db() -> f32 { -18.0 }
fn default_output_resolution() -> usize { 2048 }

pub fn load_config(path: &PathBuf) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}
