//! One-sided real FFT of a windowed, zero-extended sample buffer.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::TAU;
use std::sync::Arc;

/// Magnitude and phase of one analysis window, full one-sided resolution
/// (DC still included; the exporter slices it off when configured to).
#[derive(Clone, Debug)]
pub struct SpectralFrame {
    pub magnitude: Vec<f32>,
    /// Phase in turns, range (-0.5, 0.5].
    pub phase: Vec<f32>,
}

/// Plans the forward FFT once per export and turns sample windows into
/// spectral frames. `&self` analysis, so batches can fan out over rayon.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window_size: usize,
    transform_len: usize,
}

impl SpectrumAnalyzer {
    pub fn new(window_size: usize, zero_extension: usize) -> Self {
        let transform_len = window_size + zero_extension;
        let mut planner = FftPlanner::<f32>::new();
        Self {
            fft: planner.plan_fft_forward(transform_len),
            window_size,
            transform_len,
        }
    }

    /// Number of one-sided output bins, DC included.
    pub fn bins(&self) -> usize {
        self.transform_len / 2 + 1
    }

    /// Transforms a windowed buffer of `window_size` samples. The zero
    /// extension is implicit; the buffer is placed at the front of the
    /// transform and the remainder stays silent.
    pub fn analyze(&self, windowed: &[f32]) -> SpectralFrame {
        debug_assert_eq!(windowed.len(), self.window_size);

        let mut buffer: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); self.transform_len];
        for (slot, &s) in buffer.iter_mut().zip(windowed) {
            slot.re = s;
        }
        self.fft.process(&mut buffer);

        let scale = 1.0 / self.window_size as f32;
        let bins = self.bins();
        let mut magnitude = Vec::with_capacity(bins);
        let mut phase = Vec::with_capacity(bins);
        for c in &buffer[..bins] {
            let c = *c * scale;
            magnitude.push(c.norm());
            phase.push(c.arg() / TAU);
        }

        SpectralFrame { magnitude, phase }
    }
}
