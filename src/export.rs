//! The chunked, cancellable export driver.
//!
//! One `SpectrumExporter` owns everything mutable for a run: the signal,
//! the output matrix, the smoothing state, and the clock. The caller pumps
//! `step()` from whatever scheduler it likes; each call processes at most
//! one batch of frames and returns, so the driver stays responsive and
//! cancellable between batches.

use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::audio::signal::AudioSignal;
use crate::audio::window::{blackman_harris, collect_samples};
use crate::error::{ExportError, Result};
use crate::render::artifact;
use crate::render::matrix::FrameMatrix;
use crate::spectrum::shape::{SpectrumShaper, TemporalSmoother};
use crate::spectrum::transform::{SpectralFrame, SpectrumAnalyzer};

/// Frames processed per `step()` call. Bounds the work done between two
/// suspension points; cancellation is polled at this granularity.
pub const FRAMES_PER_BATCH: usize = 30;

/// Spectral analysis parameters for one export. Validated by `start`.
#[derive(Clone, Debug)]
pub struct ExportConfig {
    /// Samples per analysis window.
    pub window_size: usize,
    /// Zeros appended to the window before the transform.
    pub zero_extension: usize,
    /// Output sequence frame rate.
    pub fps: f64,
    /// Previous frames kept as extra image rows.
    pub history_depth: usize,
    /// Keep the DC bin in linear output.
    pub keep_dc_offset: bool,
    /// Compress magnitudes to dBFS.
    pub use_db: bool,
    /// dBFS level that maps to intensity 0.
    pub min_db: f32,
    /// Resample the frequency axis logarithmically.
    pub logscale: bool,
    pub log_base: u32,
    pub min_freq: f32,
    pub max_freq: f32,
    /// Output bins in logscale mode.
    pub output_resolution: usize,
    /// Parabolic attenuation of the lowest 8% of bins.
    pub bass_rolloff: bool,
    /// 50/50 blend with the previous frame.
    pub time_smoothing: bool,
    /// dB added per octave, to lift weak high frequencies.
    pub boost_per_octave_db: f32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            window_size: 1024,
            zero_extension: 1024,
            fps: 30.0,
            history_depth: 0,
            keep_dc_offset: false,
            use_db: true,
            min_db: -18.0,
            logscale: true,
            log_base: 10,
            min_freq: 20.0,
            max_freq: 21050.0,
            output_resolution: 2048,
            bass_rolloff: true,
            time_smoothing: false,
            boost_per_octave_db: 0.0,
        }
    }
}

impl ExportConfig {
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(ExportError::Config(msg));
        if self.window_size < 32 {
            return fail(format!("window_size must be >= 32, got {}", self.window_size));
        }
        if self.fps < 1.0 {
            return fail(format!("fps must be >= 1, got {}", self.fps));
        }
        if self.min_db >= -3.0 {
            return fail(format!("min_db must be below -3 dB, got {}", self.min_db));
        }
        if !(-60.0..=100.0).contains(&self.boost_per_octave_db) {
            return fail(format!(
                "boost_per_octave_db must be in [-60, 100], got {}",
                self.boost_per_octave_db
            ));
        }
        if self.log_base < 2 {
            return fail(format!("log_base must be >= 2, got {}", self.log_base));
        }
        if self.min_freq < 1.0 {
            return fail(format!("min_freq must be >= 1 Hz, got {}", self.min_freq));
        }
        if !(1.0..=100_000.0).contains(&self.max_freq) {
            return fail(format!(
                "max_freq must be in [1, 100000] Hz, got {}",
                self.max_freq
            ));
        }
        if self.min_freq >= self.max_freq {
            return fail(format!(
                "min_freq ({}) must be below max_freq ({})",
                self.min_freq, self.max_freq
            ));
        }
        if self.logscale && self.output_resolution < 2 {
            return fail(format!(
                "output_resolution must be >= 2 in logscale mode, got {}",
                self.output_resolution
            ));
        }
        Ok(())
    }

    /// 1 when the DC bin is dropped from the output. Logscale keeps DC
    /// internally as an interpolation anchor.
    pub fn fft_offset(&self) -> usize {
        if self.keep_dc_offset || self.logscale {
            0
        } else {
            1
        }
    }

    /// Pixel width of every output frame; fixed for the whole export.
    pub fn frame_width(&self) -> usize {
        if self.logscale {
            self.output_resolution
        } else {
            (self.window_size + self.zero_extension) / 2 + 1 - self.fft_offset()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Running,
    Finished,
    Cancelled,
    Failed,
}

/// Outcome of one `step()` call.
#[derive(Debug)]
pub enum StepStatus {
    /// Batch done, more frames remain. Carries progress in percent.
    Continue(u32),
    /// All frames written; the handle designates the sequence head.
    Finished(SequenceHandle),
    /// A cancellation request took effect. Artifacts written so far stay.
    Cancelled,
}

/// Designates the finished artifact sequence: where it starts, how many
/// frames it has, and the frame dimensions.
#[derive(Clone, Debug)]
pub struct SequenceHandle {
    pub first_frame: PathBuf,
    pub frame_count: usize,
    pub width: usize,
    pub height: usize,
}

pub struct SpectrumExporter {
    signal: AudioSignal,
    config: ExportConfig,
    analyzer: SpectrumAnalyzer,
    shaper: SpectrumShaper,
    smoother: Option<TemporalSmoother>,
    matrix: FrameMatrix,
    out_dir: PathBuf,
    base_name: String,
    digits: usize,
    frame_interval: f64,
    sound_length: f64,
    elapsed_time: f64,
    frame_index: usize,
    total_frames: usize,
    state: RunState,
    cancel_requested: bool,
}

impl SpectrumExporter {
    /// Validates the configuration, allocates the run state, and creates
    /// the output directory. No frames are processed yet.
    pub fn start(
        config: ExportConfig,
        signal: AudioSignal,
        out_dir: &Path,
        name: &str,
    ) -> Result<Self> {
        config.validate()?;

        std::fs::create_dir_all(out_dir).map_err(|source| ExportError::Io {
            path: out_dir.to_path_buf(),
            source,
        })?;

        let sound_length = signal.duration();
        let frame_interval = 1.0 / config.fps;
        // Truncating division, observable in the artifact count. A signal
        // whose length is an exact multiple of the frame interval can come
        // out one frame short of the inclusive count; consumers rely on
        // this, so it stays.
        let total_frames = (sound_length / frame_interval) as usize + 1;
        let digits = (total_frames as f64).log10().floor() as usize + 1;

        let frame_width = config.frame_width();
        let analyzer = SpectrumAnalyzer::new(config.window_size, config.zero_extension);
        let shaper = SpectrumShaper::from_config(&config, signal.sample_rate, frame_width);
        let smoother = config
            .time_smoothing
            .then(|| TemporalSmoother::new(frame_width));
        let matrix = FrameMatrix::new(frame_width, config.history_depth);

        log::info!(
            "Export started: {} frames, {}x{} px, {:.1}s of audio",
            total_frames,
            frame_width,
            config.history_depth + 1,
            sound_length
        );

        Ok(Self {
            signal,
            config,
            analyzer,
            shaper,
            smoother,
            matrix,
            out_dir: out_dir.to_path_buf(),
            base_name: artifact::sanitize_name(name),
            digits,
            frame_interval,
            sound_length,
            elapsed_time: 0.0,
            frame_index: 1,
            total_frames,
            state: RunState::Running,
            cancel_requested: false,
        })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    /// Frames completed so far.
    pub fn frames_done(&self) -> usize {
        self.frame_index - 1
    }

    /// Progress in whole percent.
    pub fn progress(&self) -> u32 {
        ((self.frame_index - 1) as f64 / self.total_frames as f64 * 100.0) as u32
    }

    /// Requests cancellation; takes effect at the next batch boundary.
    pub fn cancel(&mut self) {
        if self.state == RunState::Running {
            self.cancel_requested = true;
        }
    }

    /// Processes up to one batch of frames. Returns the run status; any
    /// error moves the run to `Failed` and surfaces to the caller.
    pub fn step(&mut self) -> Result<StepStatus> {
        if self.state != RunState::Running {
            return Err(ExportError::NotRunning);
        }

        if self.cancel_requested {
            self.state = RunState::Cancelled;
            log::info!("Export cancelled after {} frames", self.frames_done());
            return Ok(StepStatus::Cancelled);
        }

        if let Err(e) = self.run_batch() {
            self.state = RunState::Failed;
            return Err(e);
        }

        if self.elapsed_time > self.sound_length {
            self.state = RunState::Finished;
            let handle = SequenceHandle {
                first_frame: artifact::frame_path(&self.out_dir, &self.base_name, 1, self.digits),
                frame_count: self.frames_done(),
                width: self.matrix.width(),
                height: self.matrix.rows(),
            };
            log::info!(
                "Export finished: {} frames, sequence head {}",
                handle.frame_count,
                handle.first_frame.display()
            );
            return Ok(StepStatus::Finished(handle));
        }

        Ok(StepStatus::Continue(self.progress()))
    }

    fn run_batch(&mut self) -> Result<()> {
        let batch_end = self.frame_index + FRAMES_PER_BATCH;

        if self.smoother.is_some() {
            // Frame n depends on frame n-1's unsmoothed spectrum, so the
            // batch runs strictly in time order.
            while self.elapsed_time <= self.sound_length && self.frame_index < batch_end {
                let mut frame = self.render_frame(self.elapsed_time);
                let off = self.config.fft_offset();
                if let Some(smoother) = self.smoother.as_mut() {
                    smoother.smooth(&mut frame.magnitude[off..], &mut frame.phase[off..]);
                }
                self.pack_and_write(&frame, self.frame_index)?;
                self.elapsed_time += self.frame_interval;
                self.frame_index += 1;
            }
            return Ok(());
        }

        // Without smoothing every frame is a pure function of the signal
        // and its center index; fan the batch out and write in order.
        let mut pending: Vec<f64> = Vec::with_capacity(FRAMES_PER_BATCH);
        let mut t = self.elapsed_time;
        let mut id = self.frame_index;
        while t <= self.sound_length && id < batch_end {
            pending.push(t);
            t += self.frame_interval;
            id += 1;
        }

        let this: &Self = self;
        let frames: Vec<SpectralFrame> = pending
            .par_iter()
            .map(|&time| this.render_frame(time))
            .collect();

        for frame in &frames {
            self.pack_and_write(frame, self.frame_index)?;
            self.elapsed_time += self.frame_interval;
            self.frame_index += 1;
        }
        Ok(())
    }

    /// Stages 4.1-4.4 for the frame centered at `elapsed` seconds.
    fn render_frame(&self, elapsed: f64) -> SpectralFrame {
        let center = (elapsed * self.signal.sample_rate as f64) as i64;
        let mut window = collect_samples(&self.signal.samples, center, self.config.window_size);
        blackman_harris(&mut window);
        let mut frame = self.analyzer.analyze(&window);
        self.shaper.shape(&mut frame);
        frame
    }

    fn pack_and_write(&mut self, frame: &SpectralFrame, index: usize) -> Result<()> {
        let off = self.config.fft_offset();
        self.matrix.shift_history();
        self.matrix
            .write_front(&frame.magnitude[off..], &frame.phase[off..]);
        let path = artifact::frame_path(&self.out_dir, &self.base_name, index, self.digits);
        artifact::write_frame(&path, &self.matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silent_signal(seconds: f64) -> AudioSignal {
        AudioSignal::new(vec![0.0; (seconds * 44100.0) as usize], 44100)
    }

    fn small_config() -> ExportConfig {
        ExportConfig {
            window_size: 256,
            zero_extension: 0,
            output_resolution: 64,
            ..ExportConfig::default()
        }
    }

    fn temp_out(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("spektra_{tag}_{}", std::process::id()))
    }

    #[test]
    fn rejects_tiny_window() {
        let cfg = ExportConfig {
            window_size: 16,
            ..ExportConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ExportError::Config(_))));
    }

    #[test]
    fn rejects_inverted_frequency_range() {
        let cfg = ExportConfig {
            min_freq: 5000.0,
            max_freq: 100.0,
            ..ExportConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn frame_width_linear_vs_logscale() {
        let mut cfg = ExportConfig {
            window_size: 64,
            zero_extension: 0,
            logscale: false,
            ..ExportConfig::default()
        };
        // DC dropped: 33 one-sided bins minus the DC bin
        assert_eq!(cfg.fft_offset(), 1);
        assert_eq!(cfg.frame_width(), 32);

        cfg.keep_dc_offset = true;
        assert_eq!(cfg.frame_width(), 33);

        cfg.logscale = true;
        assert_eq!(cfg.fft_offset(), 0);
        assert_eq!(cfg.frame_width(), cfg.output_resolution);
    }

    #[test]
    fn silent_second_produces_eleven_frames() {
        let out = temp_out("silent");
        let cfg = ExportConfig {
            fps: 10.0,
            ..small_config()
        };
        let mut exporter =
            SpectrumExporter::start(cfg, silent_signal(1.0), &out, "silent").unwrap();
        assert_eq!(exporter.total_frames(), 11);

        let handle = loop {
            match exporter.step().unwrap() {
                StepStatus::Continue(_) => {}
                StepStatus::Finished(handle) => break handle,
                StepStatus::Cancelled => panic!("unexpected cancellation"),
            }
        };

        assert_eq!(handle.frame_count, 11);
        assert_eq!(exporter.progress(), 100);
        assert_eq!(exporter.state(), RunState::Finished);
        assert_eq!(handle.first_frame, out.join("silent_01.png"));
        for i in 1..=11 {
            assert!(out.join(format!("silent_{i:02}.png")).exists(), "frame {i}");
        }
        assert!(!out.join("silent_12.png").exists());

        // Silence stays at the dB floor: frame 1 decodes to all-zero R/G.
        let img = image::open(&handle.first_frame).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (64, 1));
        assert!(img.pixels().all(|p| p.0[0] == 0 && p.0[1] == 0));

        std::fs::remove_dir_all(&out).ok();
    }

    #[test]
    fn cancellation_takes_effect_at_batch_boundary() {
        let out = temp_out("cancel");
        let cfg = ExportConfig {
            fps: 10.0,
            ..small_config()
        };
        let mut exporter =
            SpectrumExporter::start(cfg, silent_signal(4.0), &out, "cancel").unwrap();
        assert_eq!(exporter.total_frames(), 41);

        match exporter.step().unwrap() {
            StepStatus::Continue(progress) => assert_eq!(progress, 73),
            other => panic!("expected Continue, got {other:?}"),
        }
        assert_eq!(exporter.frames_done(), 30);

        exporter.cancel();
        assert!(matches!(exporter.step().unwrap(), StepStatus::Cancelled));
        assert_eq!(exporter.state(), RunState::Cancelled);

        // Artifacts from the completed batch stay, nothing past it exists.
        assert!(out.join("cancel_30.png").exists());
        assert!(!out.join("cancel_31.png").exists());

        // A terminal run can no longer be stepped.
        assert!(matches!(exporter.step(), Err(ExportError::NotRunning)));

        std::fs::remove_dir_all(&out).ok();
    }

    #[test]
    fn smoothing_produces_time_ordered_frames() {
        let out = temp_out("smooth");
        let cfg = ExportConfig {
            fps: 10.0,
            time_smoothing: true,
            ..small_config()
        };
        // An actual tone, so smoothed frames differ from raw ones.
        let samples: Vec<f32> = (0..44100)
            .map(|i| (std::f32::consts::TAU * 440.0 * i as f32 / 44100.0).sin())
            .collect();
        let signal = AudioSignal::new(samples, 44100);

        let mut exporter = SpectrumExporter::start(cfg, signal, &out, "smooth").unwrap();
        loop {
            match exporter.step().unwrap() {
                StepStatus::Continue(_) => {}
                StepStatus::Finished(handle) => {
                    assert_eq!(handle.frame_count, 11);
                    break;
                }
                StepStatus::Cancelled => panic!("unexpected cancellation"),
            }
        }

        std::fs::remove_dir_all(&out).ok();
    }
}
