//! IIR band-pass filtering for band-limited onset analysis.

use std::f32::consts::PI;

/// One second-order section: `[b0, b1, b2, a0, a1, a2]` with `a0 == 1`.
pub type Sos = [f32; 6];

/// Design a simple IIR band-pass filter using a biquad cascade.
///
/// Each stage is a constant 0 dB peak gain band-pass biquad with
/// `Q = center / bandwidth`.
///
/// # Arguments
/// * `center_freq` - Center frequency (Hz)
/// * `bandwidth` - Filter bandwidth (Hz)
/// * `sample_rate` - Sample rate (Hz)
/// * `order` - Filter order (number of biquad stages)
///
/// # Returns
/// Filter coefficients as second-order sections
///
/// # Errors
/// Returns `Error::InvalidFrequencyRange` if the center is not strictly
/// between 0 and Nyquist or the bandwidth is not positive, and
/// `Error::InvalidSize` for a zero order.
///
/// # Example
/// ```
/// use groovescribe::filters::design_bandpass_sos;
///
/// let sos = design_bandpass_sos(100.0, 20.0, 44100.0, 1).unwrap();
/// assert_eq!(sos.len(), 1);
/// assert!(design_bandpass_sos(12500.0, 5000.0, 22050.0, 1).is_err());
/// ```
pub fn design_bandpass_sos(
    center_freq: f32,
    bandwidth: f32,
    sample_rate: f32,
    order: usize,
) -> crate::Result<Vec<Sos>> {
    let nyquist = sample_rate / 2.0;
    if !(center_freq > 0.0 && center_freq < nyquist) || !(bandwidth > 0.0) {
        return Err(crate::Error::InvalidFrequencyRange {
            fmin: center_freq - bandwidth / 2.0,
            fmax: center_freq + bandwidth / 2.0,
            reason: format!("center must lie in (0, {nyquist}) with a positive bandwidth"),
        });
    }
    if order == 0 {
        return Err(crate::Error::InvalidSize {
            name: "order",
            value: 0,
            reason: "must be > 0",
        });
    }

    // Normalize frequencies
    let w0 = 2.0 * PI * center_freq / sample_rate;
    let bw = 2.0 * PI * bandwidth / sample_rate;
    let q = w0 / bw;

    let alpha = w0.sin() / (2.0 * q);
    let cos_w0 = w0.cos();

    let b0 = alpha;
    let b2 = -alpha;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_w0;
    let a2 = 1.0 - alpha;

    let sos = [b0 / a0, 0.0, b2 / a0, 1.0, a1 / a0, a2 / a0];
    Ok(vec![sos; order])
}

/// Apply a single SOS filter section to a signal.
fn apply_sos_section(x: &[f32], sos: &Sos) -> Vec<f32> {
    let [b0, b1, b2, _, a1, a2] = *sos;

    let mut y = vec![0.0f32; x.len()];
    let mut x1 = 0.0f32;
    let mut x2 = 0.0f32;
    let mut y1 = 0.0f32;
    let mut y2 = 0.0f32;

    for (yi, &xi) in y.iter_mut().zip(x.iter()) {
        *yi = b0 * xi + b1 * x1 + b2 * x2 - a1 * y1 - a2 * y2;
        x2 = x1;
        x1 = xi;
        y2 = y1;
        y1 = *yi;
    }

    y
}

/// Apply SOS filter (forward only).
pub fn sosfilt(sos: &[Sos], x: &[f32]) -> Vec<f32> {
    let mut y = x.to_vec();
    for section in sos {
        y = apply_sos_section(&y, section);
    }
    y
}

/// Apply SOS filter forward and backward (zero-phase filtering).
pub fn sosfiltfilt(sos: &[Sos], x: &[f32]) -> Vec<f32> {
    let forward = sosfilt(sos, x);
    let reversed: Vec<f32> = forward.into_iter().rev().collect();
    sosfilt(sos, &reversed).into_iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Signal;

    fn rms(x: &[f32]) -> f32 {
        (x.iter().map(|v| v * v).sum::<f32>() / x.len().max(1) as f32).sqrt()
    }

    #[test]
    fn test_passband_and_stopband() {
        let sr = 44100.0;
        let sos = design_bandpass_sos(350.0, 100.0, sr, 1).unwrap();
        let pass = Signal::tone(350.0, 44100, 0.5).unwrap();
        let stop = Signal::tone(5000.0, 44100, 0.5).unwrap();
        // skip the transient
        let pass_out = sosfilt(&sos, pass.samples());
        let stop_out = sosfilt(&sos, stop.samples());
        let pass_rms = rms(&pass_out[4410..]);
        let stop_rms = rms(&stop_out[4410..]);
        assert!((pass_rms - rms(&pass.samples()[4410..])).abs() < 0.05);
        assert!(stop_rms < 0.05 * pass_rms);
    }

    #[test]
    fn test_filtfilt_zero_phase_peak() {
        let mut x = vec![0.0f32; 2001];
        x[1000] = 1.0;
        let sos = design_bandpass_sos(1000.0, 500.0, 8000.0, 1).unwrap();
        let y = sosfiltfilt(&sos, &x);
        assert_eq!(y.len(), x.len());
        let peak = y
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc })
            .0;
        assert!((999..=1001).contains(&peak), "peak at {peak}");
    }

    #[test]
    fn test_cascade_order() {
        let sos = design_bandpass_sos(100.0, 30.0, 22050.0, 3).unwrap();
        assert_eq!(sos.len(), 3);
        assert!(design_bandpass_sos(100.0, 30.0, 22050.0, 0).is_err());
        assert!(design_bandpass_sos(100.0, 0.0, 22050.0, 1).is_err());
    }

    #[test]
    fn test_empty_input() {
        let sos = design_bandpass_sos(100.0, 30.0, 22050.0, 1).unwrap();
        assert!(sosfilt(&sos, &[]).is_empty());
        assert!(sosfiltfilt(&sos, &[]).is_empty());
    }
}
