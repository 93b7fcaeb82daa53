use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "spektra", about = "Audio spectrum to PNG image sequence exporter")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: PathBuf,

    /// Directory the image sequence is written to (created if absent)
    #[arg(short, long, default_value = "./fftimg")]
    pub out_dir: PathBuf,

    /// Sequence name; defaults to the input file name plus "_fft"
    #[arg(short, long)]
    pub name: Option<String>,

    /// Samples per analysis window
    #[arg(long, default_value_t = 1024)]
    pub window_size: usize,

    /// Zeros appended after the window for higher, interpolated resolution
    #[arg(long, default_value_t = 1024)]
    pub zero_extension: usize,

    /// Frames per second of the generated sequence
    #[arg(long, default_value_t = 30.0)]
    pub fps: f64,

    /// Previous spectra kept as extra image rows, shifted down per frame
    #[arg(long, default_value_t = 0)]
    pub history: usize,

    /// Keep the DC bin in the output
    #[arg(long)]
    pub keep_dc_offset: bool,

    /// Output linear magnitudes instead of dBFS
    #[arg(long)]
    pub no_db: bool,

    /// dBFS level that maps to intensity 0
    #[arg(long, default_value_t = -18.0)]
    pub min_db: f32,

    /// Keep the linear frequency axis instead of the logarithmic remap
    #[arg(long)]
    pub no_logscale: bool,

    /// Base of the logarithmic frequency axis
    #[arg(long, default_value_t = 10)]
    pub log_base: u32,

    /// Lowest displayed frequency in Hz (logscale only)
    #[arg(long, default_value_t = 20.0)]
    pub min_freq: f32,

    /// Highest displayed frequency in Hz (logscale only)
    #[arg(long, default_value_t = 21050.0)]
    pub max_freq: f32,

    /// Output width in pixels (logscale only)
    #[arg(long, default_value_t = 2048)]
    pub output_resolution: usize,

    /// Skip the parabolic rolloff at the low-frequency border
    #[arg(long)]
    pub no_bass_rolloff: bool,

    /// Blend each frame 50/50 with the previous one
    #[arg(long)]
    pub time_smoothing: bool,

    /// dB per octave added to lift weak high frequencies
    #[arg(long, default_value_t = 0.0)]
    pub boost_per_octave: f32,

    /// Skip peak normalization of the decoded audio
    #[arg(long)]
    pub no_normalize: bool,

    /// Gain in dB applied after normalization
    #[arg(long, default_value_t = 0.0)]
    pub gain: f32,
}
