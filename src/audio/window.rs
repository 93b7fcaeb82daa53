//! Sample window extraction and tapering.

/// Collects `width` samples centered on `center`, zero-filling every
/// position that falls outside the signal.
///
/// `center` may be negative or past the end of the signal; the window is
/// still well-defined (silence), which is what makes the first and last
/// analysis frames of an export work without caller-side clamping.
pub fn collect_samples(samples: &[f32], center: i64, width: usize) -> Vec<f32> {
    let mut buffer = vec![0.0f32; width];
    let half = (width / 2) as i64;
    for (i, slot) in buffer.iter_mut().enumerate() {
        let sel = i as i64 - half + center;
        if sel >= 0 && (sel as usize) < samples.len() {
            *slot = samples[sel as usize];
        }
    }
    buffer
}

/// Applies a Blackman-Harris taper in place.
///
/// Requires `len >= 2`; config validation (`window_size >= 32`) guarantees
/// the denominator never degenerates.
pub fn blackman_harris(samples: &mut [f32]) {
    let n = samples.len();
    let denom = (n - 1) as f32;
    for (i, s) in samples.iter_mut().enumerate() {
        let t = std::f32::consts::PI * i as f32 / denom;
        let w = 0.35875 - 0.48829 * (2.0 * t).cos() + 0.14128 * (4.0 * t).cos()
            - 0.01168 * (6.0 * t).cos();
        *s *= w;
    }
}
