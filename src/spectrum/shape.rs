//! Perceptual post-processing of the raw spectrum.
//!
//! Stages run in a fixed order: octave boost, dB compression, logarithmic
//! frequency remapping, bass rolloff, temporal smoothing. Each stage is a
//! no-op when its config flag is off. Only temporal smoothing carries
//! state across frames; everything else is pure, which is what allows a
//! batch to be computed in parallel when smoothing is disabled.

use crate::export::ExportConfig;

use super::transform::SpectralFrame;

/// Stateless stages (1-4), built once per export from the config.
pub struct SpectrumShaper {
    nyquist: f32,
    octave_gain: Option<f32>,
    min_db: Option<f32>,
    log_axis: Option<LogAxis>,
    rolloff_span: usize,
}

struct LogAxis {
    min_freq: f32,
    max_freq: f32,
    base: f64,
    resolution: usize,
}

impl SpectrumShaper {
    pub fn from_config(config: &ExportConfig, sample_rate: u32, frame_width: usize) -> Self {
        let octave_gain = (config.boost_per_octave_db.abs() > 1e-2)
            .then(|| 10f32.powf(config.boost_per_octave_db / 20.0));

        let log_axis = config.logscale.then(|| LogAxis {
            min_freq: config.min_freq,
            max_freq: config.max_freq,
            base: config.log_base as f64,
            resolution: config.output_resolution,
        });

        let rolloff_span = if config.bass_rolloff {
            (frame_width as f32 * 0.08) as usize
        } else {
            0
        };

        Self {
            nyquist: (sample_rate / 2) as f32,
            octave_gain,
            min_db: config.use_db.then_some(config.min_db),
            log_axis,
            rolloff_span,
        }
    }

    /// Runs stages 1-4 on a raw spectral frame.
    pub fn shape(&self, frame: &mut SpectralFrame) {
        if let Some(gain) = self.octave_gain {
            apply_octave_boost(&mut frame.magnitude, self.nyquist, gain);
        }
        if let Some(min_db) = self.min_db {
            compress_to_db(&mut frame.magnitude, min_db);
        }
        if let Some(ref axis) = self.log_axis {
            frame.magnitude = remap_log_frequency(
                &frame.magnitude,
                self.nyquist,
                axis.min_freq,
                axis.max_freq,
                axis.base,
                axis.resolution,
            );
            frame.phase = remap_log_frequency(
                &frame.phase,
                self.nyquist,
                axis.min_freq,
                axis.max_freq,
                axis.base,
                axis.resolution,
            );
        }
        if self.rolloff_span > 0 {
            apply_bass_rolloff(&mut frame.magnitude, self.rolloff_span);
        }
    }
}

/// Multiplies bin `k` at frequency `f_k` by `gain^log2(f_k + 1)`. The `+1`
/// keeps the exponent finite at DC.
pub fn apply_octave_boost(magnitude: &mut [f32], nyquist: f32, gain: f32) {
    let n = magnitude.len();
    if n < 2 {
        return;
    }
    let spacing = nyquist / (n - 1) as f32;
    for (k, m) in magnitude.iter_mut().enumerate() {
        let freq = k as f32 * spacing;
        *m *= gain.powf((freq + 1.0).log2());
    }
}

/// Replaces magnitudes above the dB floor with their dBFS value, clamps the
/// rest to `min_db`, then rescales so the floor maps to 0 and unity gain
/// maps to 1.
pub fn compress_to_db(magnitude: &mut [f32], min_db: f32) {
    let min_gain = 10f32.powf(min_db / 20.0);
    for m in magnitude.iter_mut() {
        let db = if *m > min_gain { 20.0 * m.log10() } else { min_db };
        *m = (db - min_db) / -min_db;
    }
}

/// Resamples `values` from their linear axis (`len` points over
/// `[0, nyquist]`) onto `resolution` points log-spaced from `min_freq` to
/// `max_freq`. Queries outside the native axis produce 0, not an
/// edge-clamped value.
pub fn remap_log_frequency(
    values: &[f32],
    nyquist: f32,
    min_freq: f32,
    max_freq: f32,
    base: f64,
    resolution: usize,
) -> Vec<f32> {
    let ln_base = base.ln();
    let min_v = (min_freq as f64).ln() / ln_base;
    let max_v = (max_freq as f64).ln() / ln_base;
    let step = (max_v - min_v) / (resolution - 1) as f64;

    (0..resolution)
        .map(|i| {
            let freq = base.powf(min_v + i as f64 * step) as f32;
            interp_linear(values, nyquist, freq)
        })
        .collect()
}

/// Linear interpolation over a `[0, nyquist]` axis; out-of-range queries
/// extrapolate to 0.
fn interp_linear(values: &[f32], nyquist: f32, query: f32) -> f32 {
    if query < 0.0 || query > nyquist || values.len() < 2 {
        return 0.0;
    }
    let pos = query / nyquist * (values.len() - 1) as f32;
    let i0 = pos as usize;
    if i0 + 1 >= values.len() {
        return values[values.len() - 1];
    }
    let frac = pos - i0 as f32;
    values[i0] * (1.0 - frac) + values[i0 + 1] * frac
}

/// Attenuates the lowest `span` bins with a downward parabola `1 - t²`,
/// `t` running inclusively from -1 (full attenuation) to 0 (untouched).
pub fn apply_bass_rolloff(magnitude: &mut [f32], span: usize) {
    let span = span.min(magnitude.len());
    if span == 0 {
        return;
    }
    for (i, m) in magnitude[..span].iter_mut().enumerate() {
        let t = if span == 1 {
            -1.0
        } else {
            -1.0 + i as f32 / (span - 1) as f32
        };
        *m *= 1.0 - t * t;
    }
}

/// Cross-frame 50/50 blend. The stored state is always the *pre-blend*
/// frame, so frame `n` depends on frame `n-1`'s unsmoothed values.
pub struct TemporalSmoother {
    prev_magnitude: Vec<f32>,
    prev_phase: Vec<f32>,
}

impl TemporalSmoother {
    pub fn new(width: usize) -> Self {
        Self {
            prev_magnitude: vec![0.0; width],
            prev_phase: vec![0.0; width],
        }
    }

    pub fn smooth(&mut self, magnitude: &mut [f32], phase: &mut [f32]) {
        debug_assert_eq!(magnitude.len(), self.prev_magnitude.len());
        for (m, prev) in magnitude.iter_mut().zip(self.prev_magnitude.iter_mut()) {
            let current = *m;
            *m = 0.5 * current + 0.5 * *prev;
            *prev = current;
        }
        for (p, prev) in phase.iter_mut().zip(self.prev_phase.iter_mut()) {
            let current = *p;
            *p = 0.5 * current + 0.5 * *prev;
            *prev = current;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn octave_boost_leaves_dc_untouched() {
        let mut mag = vec![1.0f32; 5];
        apply_octave_boost(&mut mag, 4.0, 2.0);
        assert_eq!(mag[0], 1.0);
        // Bin 1 sits at 1 Hz: 2^log2(2) = 2
        assert!((mag[1] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn db_floor_maps_to_zero_and_unity_to_one() {
        let min_db = -18.0f32;
        let min_gain = 10f32.powf(min_db / 20.0);
        let mut mag = vec![min_gain, 1.0, 0.0, min_gain * 0.5];
        compress_to_db(&mut mag, min_db);
        assert_eq!(mag[0], 0.0); // exactly at the floor clamps down
        assert!((mag[1] - 1.0).abs() < 1e-6);
        assert_eq!(mag[2], 0.0);
        assert_eq!(mag[3], 0.0); // below the floor clamps, no -inf
    }

    #[test]
    fn log_remap_zeroes_queries_past_nyquist() {
        let values = vec![1.0f32; 64];
        // max_freq well above the native axis: the tail must be 0, not the
        // edge value.
        let out = remap_log_frequency(&values, 1000.0, 20.0, 8000.0, 10.0, 32);
        assert_eq!(*out.last().unwrap(), 0.0);
        assert!((out[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn log_remap_interpolates_within_axis() {
        // Ramp 0..=1 over [0, 100] Hz; querying 50 Hz should give ~0.5.
        let values: Vec<f32> = (0..101).map(|i| i as f32 / 100.0).collect();
        let v = interp_linear(&values, 100.0, 50.0);
        assert!((v - 0.5).abs() < 1e-5);
        assert_eq!(interp_linear(&values, 100.0, -1.0), 0.0);
        assert_eq!(interp_linear(&values, 100.0, 100.5), 0.0);
    }

    #[test]
    fn bass_rolloff_parabola_endpoints() {
        let mut mag = vec![1.0f32; 100];
        apply_bass_rolloff(&mut mag, 8);
        assert_eq!(mag[0], 0.0); // t = -1 kills the first bin
        assert!((mag[7] - 1.0).abs() < 1e-6); // t = 0 at the span boundary
        assert_eq!(mag[8], 1.0); // outside the span untouched
        for i in 1..7 {
            assert!(mag[i] > mag[i - 1]);
        }
    }

    #[test]
    fn smoothing_reaches_steady_state_on_constant_input() {
        let mut smoother = TemporalSmoother::new(3);
        let mut mag = vec![0.8f32; 3];
        let mut phase = vec![0.2f32; 3];
        smoother.smooth(&mut mag, &mut phase);
        assert!((mag[0] - 0.4).abs() < 1e-6);

        let mut mag = vec![0.8f32; 3];
        let mut phase = vec![0.2f32; 3];
        smoother.smooth(&mut mag, &mut phase);
        assert!((mag[0] - 0.8).abs() < 1e-6);
        assert!((phase[0] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn smoothing_halves_an_impulse_on_the_next_frame() {
        let mut smoother = TemporalSmoother::new(1);
        let mut mag = vec![1.0f32];
        let mut phase = vec![0.0f32];
        smoother.smooth(&mut mag, &mut phase);

        let mut mag = vec![0.0f32];
        let mut phase = vec![0.0f32];
        smoother.smooth(&mut mag, &mut phase);
        assert_eq!(mag[0], 0.5);
    }
}
