/// A decoded mono waveform. Owned exclusively by one export run.
#[derive(Clone, Debug)]
pub struct AudioSignal {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioSignal {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    /// Signal length in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Scales the signal so the loudest sample has magnitude 1.0.
    ///
    /// A near-silent signal (peak below 1e-9) is left untouched instead of
    /// blowing up on a near-zero divisor; returns whether scaling happened.
    pub fn normalize(&mut self) -> bool {
        let peak = self.samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
        if peak < 1e-9 {
            log::warn!("Signal is near-silent (peak={peak:e}), skipping normalization");
            return false;
        }
        for s in &mut self.samples {
            *s /= peak;
        }
        true
    }

    /// Applies a gain in dB on top of the (possibly normalized) samples.
    pub fn apply_gain_db(&mut self, gain_db: f32) {
        if gain_db == 0.0 {
            return;
        }
        let factor = 10f32.powf(gain_db / 20.0);
        for s in &mut self.samples {
            *s *= factor;
        }
    }
}
