use ndarray::Array2;
use num_complex::Complex32;

use super::{Separated, SourceSeparator};
use crate::spectrum::{istft, magnitude, stft, StftConfig};
use crate::Signal;

/// Harmonic-percussive separation by median filtering the magnitude
/// spectrogram along time (harmonic) and along frequency (percussive),
/// followed by soft masking.
///
/// # Example
/// ```
/// use groovescribe::separation::{MedianFilterSeparator, SourceSeparator};
/// use groovescribe::Signal;
///
/// let separator = MedianFilterSeparator::new().with_stft(1024, 256).with_kernels(17, 17);
/// let mix = Signal::tone(110.0, 22050, 0.5).unwrap();
/// let parts = separator.separate(&mix).unwrap();
/// assert_eq!(parts.harmonic.len(), mix.len());
/// assert_eq!(parts.percussive.len(), mix.len());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MedianFilterSeparator {
    pub n_fft: usize,
    pub hop_size: usize,
    /// Median width across frames for the harmonic estimate
    pub harmonic_kernel: usize,
    /// Median width across bins for the percussive estimate
    pub percussive_kernel: usize,
    /// Exponent for Wiener-like masking
    pub power: f32,
    /// Separation margin (>= 1); larger values leave more residual in neither part
    pub margin: f32,
}

impl MedianFilterSeparator {
    pub fn new() -> Self {
        Self {
            n_fft: 2048,
            hop_size: 1024,
            harmonic_kernel: 150,
            percussive_kernel: 150,
            power: 2.0,
            margin: 1.0,
        }
    }

    pub fn with_stft(mut self, n_fft: usize, hop_size: usize) -> Self {
        self.n_fft = n_fft;
        self.hop_size = hop_size;
        self
    }

    pub fn with_kernels(mut self, harmonic_kernel: usize, percussive_kernel: usize) -> Self {
        self.harmonic_kernel = harmonic_kernel;
        self.percussive_kernel = percussive_kernel;
        self
    }

    pub fn with_power(mut self, power: f32) -> Self {
        self.power = power;
        self
    }

    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    fn stft_config(&self) -> StftConfig {
        StftConfig::new(self.n_fft, self.hop_size)
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.stft_config().validate()?;
        if self.harmonic_kernel == 0 || self.percussive_kernel == 0 {
            return Err(crate::Error::InvalidSize {
                name: "kernel",
                value: 0,
                reason: "median kernels must be > 0",
            });
        }
        if !(self.power > 0.0) {
            return Err(crate::Error::invalid("power", self.power, "must be > 0"));
        }
        if !(self.margin >= 1.0) {
            return Err(crate::Error::invalid("margin", self.margin, "must be >= 1"));
        }
        Ok(())
    }

    /// Split a complex spectrogram into harmonic and percussive spectrograms.
    pub fn split(&self, spec: &Array2<Complex32>) -> (Array2<Complex32>, Array2<Complex32>) {
        let mag = magnitude(spec);
        let harmonic = median_filter_2d(&mag, (1, self.harmonic_kernel));
        let percussive = median_filter_2d(&mag, (self.percussive_kernel, 1));

        let mut spec_h = spec.clone();
        let mut spec_p = spec.clone();
        for (((h_cell, p_cell), &h), &p) in spec_h
            .iter_mut()
            .zip(spec_p.iter_mut())
            .zip(harmonic.iter())
            .zip(percussive.iter())
        {
            let (mask_h, mask_p) = soft_masks(h, p, self.power, self.margin);
            *h_cell *= mask_h;
            *p_cell *= mask_p;
        }
        (spec_h, spec_p)
    }
}

impl Default for MedianFilterSeparator {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceSeparator for MedianFilterSeparator {
    fn separate(&self, signal: &Signal) -> crate::Result<Separated> {
        self.validate()?;
        let config = self.stft_config();
        let spec = stft(signal.samples(), &config)?;
        let (spec_h, spec_p) = self.split(&spec);
        let harmonic = istft(&spec_h, &config, signal.len())?;
        let percussive = istft(&spec_p, &config, signal.len())?;
        log::debug!(
            "hpss: {} frames, kernels ({}, {})",
            spec.ncols(),
            self.harmonic_kernel,
            self.percussive_kernel
        );
        Ok(Separated {
            harmonic: signal.with_samples(harmonic),
            percussive: signal.with_samples(percussive),
        })
    }
}

/// Wiener-style masks `H^p / (H^p + (margin P)^p)` and the converse.
/// Cells where both estimates vanish are split evenly.
fn soft_masks(h: f32, p: f32, power: f32, margin: f32) -> (f32, f32) {
    let hp = h.powf(power);
    let pp = p.powf(power);
    let mh = hp / (hp + (margin * p).powf(power));
    let mp = pp / (pp + (margin * h).powf(power));
    (
        if mh.is_finite() { mh } else { 0.5 },
        if mp.is_finite() { mp } else { 0.5 },
    )
}

/// 2D median filter with specified kernel size, truncated at the edges.
fn median_filter_2d(input: &Array2<f32>, kernel_size: (usize, usize)) -> Array2<f32> {
    let (n_freq, n_frames) = input.dim();
    let mut output = Array2::<f32>::zeros((n_freq, n_frames));
    let (kh, kw) = kernel_size;
    let mut window = Vec::with_capacity(kh * kw);

    for i in 0..n_freq {
        for j in 0..n_frames {
            window.clear();

            let i_start = i.saturating_sub(kh / 2);
            let i_end = (i + kh / 2 + 1).min(n_freq);
            let j_start = j.saturating_sub(kw / 2);
            let j_end = (j + kw / 2 + 1).min(n_frames);

            for ii in i_start..i_end {
                for jj in j_start..j_end {
                    window.push(input[(ii, jj)]);
                }
            }

            let mid = window.len() / 2;
            output[(i, j)] = if window.is_empty() {
                0.0
            } else {
                *window
                    .select_nth_unstable_by(mid, |a, b| a.total_cmp(b))
                    .1
            };
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn energy(x: &[f32]) -> f32 {
        x.iter().map(|v| v * v).sum()
    }

    #[test]
    fn test_median_filter_basic() {
        let input =
            Array2::from_shape_vec((3, 3), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0])
                .unwrap();
        let filtered = median_filter_2d(&input, (3, 3));
        assert_eq!(filtered.dim(), input.dim());
        assert_relative_eq!(filtered[(1, 1)], 5.0);
    }

    #[test]
    fn test_soft_masks_sum_to_one() {
        let (h, p) = soft_masks(3.0, 1.0, 2.0, 1.0);
        assert_relative_eq!(h + p, 1.0, epsilon = 1e-6);
        assert_relative_eq!(h, 0.9, epsilon = 1e-6);
        assert_eq!(soft_masks(0.0, 0.0, 2.0, 1.0), (0.5, 0.5));
    }

    #[test]
    fn test_tone_and_clicks_separate() {
        let sr = 22050;
        let tone = Signal::tone(220.0, sr, 2.0).unwrap();
        let clicks = Signal::clicks(&[0.5, 1.0, 1.5], sr, 2.0, 0.005, 4000.0).unwrap();
        let mix = tone.mix(&clicks).unwrap();

        let separator = MedianFilterSeparator::new().with_stft(1024, 256).with_kernels(31, 31);
        let parts = separator.separate(&mix).unwrap();

        // harmonic part keeps the tone between clicks
        let quiet = 11025 + 2000..11025 + 8000;
        assert!(
            energy(&parts.harmonic.samples()[quiet.clone()])
                > 10.0 * energy(&parts.percussive.samples()[quiet])
        );
        // percussive part carries more click energy than the tone leaks
        let hit = 11025..11025 + 110;
        let click_energy = energy(&clicks.samples()[hit.clone()]);
        assert!(energy(&parts.percussive.samples()[hit]) > 0.3 * click_energy);
    }

    #[test]
    fn test_parts_sum_to_mix() {
        let mix = Signal::tone(330.0, 8000, 1.0).unwrap();
        let separator = MedianFilterSeparator::new().with_stft(256, 64).with_kernels(9, 9);
        let parts = separator.separate(&mix).unwrap();
        for i in 256..7700 {
            let sum = parts.harmonic.samples()[i] + parts.percussive.samples()[i];
            assert_relative_eq!(sum, mix.samples()[i], epsilon = 1e-3);
        }
    }

    #[test]
    fn test_validation() {
        assert!(MedianFilterSeparator::new().with_kernels(0, 3).validate().is_err());
        assert!(MedianFilterSeparator::new().with_margin(0.5).validate().is_err());
    }

    #[test]
    fn test_empty_signal() {
        let separator = MedianFilterSeparator::new().with_stft(256, 64).with_kernels(5, 5);
        let parts = separator.separate(&Signal::empty(8000).unwrap()).unwrap();
        assert!(parts.harmonic.is_empty());
        assert!(parts.percussive.is_empty());
    }
}
