mod audio;
mod cli;
mod config;
mod error;
mod export;
mod render;
mod spectrum;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use cli::Cli;
use export::{ExportConfig, SpectrumExporter, StepStatus};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    // Load config: spektra.toml next to the invocation, or the global one
    let config_path = {
        let local = std::path::PathBuf::from("spektra.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("spektra").join("config.toml");
            xdg.exists().then_some(xdg)
        } else {
            None
        }
    };
    if let Some(ref path) = config_path {
        if let Some(cfg) = config::load_config(path) {
            log::info!("Loaded config from {}", path.display());
            // Merge: config values apply only when CLI is at its default
            if cli.out_dir == std::path::Path::new("./fftimg") { cli.out_dir = cfg.output.dir; }
            if cli.fps == 30.0 { cli.fps = cfg.output.fps; }
            if cli.history == 0 { cli.history = cfg.output.history; }
            if cli.window_size == 1024 { cli.window_size = cfg.spectrum.window_size; }
            if cli.zero_extension == 1024 { cli.zero_extension = cfg.spectrum.zero_extension; }
            if cli.min_db == -18.0 { cli.min_db = cfg.spectrum.min_db; }
            if cli.output_resolution == 2048 { cli.output_resolution = cfg.spectrum.output_resolution; }
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }

    log::info!("spektra - audio spectrum image sequence exporter");
    log::info!("Input: {}", cli.input.display());
    log::info!("Output: {}", cli.out_dir.display());

    log::info!("Decoding audio...");
    let mut signal = audio::decode::decode_audio(&cli.input)?;
    if !cli.no_normalize {
        signal.normalize();
    }
    signal.apply_gain_db(cli.gain);

    let name = cli.name.clone().unwrap_or_else(|| {
        let stem = cli
            .input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("spectrum");
        format!("{stem}_fft")
    });

    let export_config = ExportConfig {
        window_size: cli.window_size,
        zero_extension: cli.zero_extension,
        fps: cli.fps,
        history_depth: cli.history,
        keep_dc_offset: cli.keep_dc_offset,
        use_db: !cli.no_db,
        min_db: cli.min_db,
        logscale: !cli.no_logscale,
        log_base: cli.log_base,
        min_freq: cli.min_freq,
        max_freq: cli.max_freq,
        output_resolution: cli.output_resolution,
        bass_rolloff: !cli.no_bass_rolloff,
        time_smoothing: cli.time_smoothing,
        boost_per_octave_db: cli.boost_per_octave,
    };

    let mut exporter = SpectrumExporter::start(export_config, signal, &cli.out_dir, &name)
        .context("Failed to start export")?;

    let pb = ProgressBar::new(exporter.total_frames() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")
            .unwrap()
            .progress_chars("=>-"),
    );

    loop {
        match exporter.step().context("Export failed")? {
            StepStatus::Continue(_) => {
                pb.set_position(exporter.frames_done() as u64);
            }
            StepStatus::Finished(handle) => {
                pb.finish_with_message("Export complete");
                log::info!(
                    "Done! {} frames of {}x{} px, sequence head: {}",
                    handle.frame_count,
                    handle.width,
                    handle.height,
                    handle.first_frame.display()
                );
                break;
            }
            StepStatus::Cancelled => {
                pb.abandon_with_message("Export cancelled");
                break;
            }
        }
    }

    Ok(())
}
