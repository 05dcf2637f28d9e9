//! Short-time Fourier transform and its overlap-add inverse.

use crate::fft::FftPlan;
use crate::window::WindowType;
use ndarray::Array2;
use num_complex::Complex32;

/// STFT parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct StftConfig {
    pub n_fft: usize,
    pub hop_size: usize,
    pub window: WindowType,
    /// Pad `n_fft / 2` zeros on both sides so frame `t` is centred at `t * hop_size`
    pub center: bool,
}

impl StftConfig {
    pub fn new(n_fft: usize, hop_size: usize) -> Self {
        Self {
            n_fft,
            hop_size,
            window: WindowType::Hann,
            center: true,
        }
    }

    pub fn with_window(mut self, window: WindowType) -> Self {
        self.window = window;
        self
    }

    pub fn with_center(mut self, center: bool) -> Self {
        self.center = center;
        self
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.n_fft < 2 {
            return Err(crate::Error::InvalidSize {
                name: "n_fft",
                value: self.n_fft,
                reason: "must be >= 2",
            });
        }
        if self.hop_size == 0 {
            return Err(crate::Error::InvalidSize {
                name: "hop_size",
                value: 0,
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

impl Default for StftConfig {
    fn default() -> Self {
        Self::new(2048, 512)
    }
}

fn pad_center(y: &[f32], n_fft: usize, center: bool) -> Vec<f32> {
    if !center {
        return y.to_vec();
    }
    let pad = n_fft / 2;
    let mut out = vec![0.0f32; y.len() + 2 * pad];
    out[pad..pad + y.len()].copy_from_slice(y);
    out
}

#[inline]
fn compute_frame(
    frame: usize,
    padded: &[f32],
    window: &[f32],
    fft: &FftPlan,
    hop_size: usize,
    n_freq: usize,
) -> Vec<Complex32> {
    let start = frame * hop_size;
    let mut buffer: Vec<Complex32> = window
        .iter()
        .enumerate()
        .map(|(i, &w)| Complex32::new(padded.get(start + i).copied().unwrap_or(0.0) * w, 0.0))
        .collect();
    fft.forward(&mut buffer);
    buffer.truncate(n_freq);
    buffer
}

/// Compute the Short-Time Fourier Transform (STFT).
///
/// # Arguments
/// * `y` - Input samples
/// * `config` - STFT configuration
///
/// # Returns
/// Complex STFT matrix of shape (n_freq, n_frames) where n_freq = n_fft/2 + 1
///
/// # Example
/// ```
/// use groovescribe::spectrum::{stft, StftConfig};
///
/// let y = vec![0.0f32; 4096];
/// let spec = stft(&y, &StftConfig::new(1024, 256)).unwrap();
/// assert_eq!(spec.shape(), &[513, 17]);
/// ```
pub fn stft(y: &[f32], config: &StftConfig) -> crate::Result<Array2<Complex32>> {
    config.validate()?;

    let window = config.window.build(config.n_fft);
    let padded = pad_center(y, config.n_fft, config.center);
    let n_frames = if padded.len() < config.n_fft {
        0
    } else {
        (padded.len() - config.n_fft) / config.hop_size + 1
    };

    let n_freq = config.n_fft / 2 + 1;
    let fft = FftPlan::new(config.n_fft);

    let frame_results: Vec<Vec<Complex32>> = {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            (0..n_frames)
                .into_par_iter()
                .map(|frame| compute_frame(frame, &padded, &window, &fft, config.hop_size, n_freq))
                .collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            (0..n_frames)
                .map(|frame| compute_frame(frame, &padded, &window, &fft, config.hop_size, n_freq))
                .collect()
        }
    };

    let mut stft_matrix = Array2::<Complex32>::zeros((n_freq, n_frames));
    for (frame, result) in frame_results.iter().enumerate() {
        for (f, &val) in result.iter().enumerate() {
            stft_matrix[(f, frame)] = val;
        }
    }

    Ok(stft_matrix)
}

/// Compute the Inverse Short-Time Fourier Transform (ISTFT).
///
/// Reconstructs a time-domain signal from its STFT representation using
/// weighted overlap-add synthesis.
///
/// # Arguments
/// * `stft_matrix` - Complex STFT matrix (n_freq x n_frames)
/// * `config` - STFT configuration (must match the forward STFT)
/// * `length` - Output length; the result is truncated or zero-extended to it
///
/// # Errors
/// Returns an error if the matrix height does not match `n_fft / 2 + 1`.
pub fn istft(
    stft_matrix: &Array2<Complex32>,
    config: &StftConfig,
    length: usize,
) -> crate::Result<Vec<f32>> {
    config.validate()?;
    let (n_freq, n_frames) = stft_matrix.dim();
    let n_fft = config.n_fft;
    if n_freq != n_fft / 2 + 1 {
        return Err(crate::Error::ShapeMismatch {
            expected: format!("{} frequency bins", n_fft / 2 + 1),
            got: format!("{n_freq}"),
        });
    }
    if n_frames == 0 {
        return Ok(vec![0.0; length]);
    }

    let window = config.window.build(n_fft);
    let mut y = vec![0.0f32; (n_frames - 1) * config.hop_size + n_fft];
    let mut window_sums = vec![0.0f32; y.len()];
    let fft = FftPlan::new(n_fft);

    for frame in 0..n_frames {
        let start = frame * config.hop_size;
        let mut buffer = vec![Complex32::new(0.0, 0.0); n_fft];

        for f in 0..n_freq {
            buffer[f] = stft_matrix[(f, frame)];
        }
        for f in 1..(n_fft - n_freq + 1) {
            buffer[n_fft - f] = stft_matrix[(f, frame)].conj();
        }

        fft.inverse(&mut buffer);

        for (i, (&w, b)) in window.iter().zip(buffer.iter()).enumerate() {
            y[start + i] += b.re * w;
            window_sums[start + i] += w * w;
        }
    }

    for (v, &s) in y.iter_mut().zip(window_sums.iter()) {
        if s > 1e-8 {
            *v /= s;
        }
    }

    let offset = if config.center { n_fft / 2 } else { 0 };
    let mut out: Vec<f32> = y.into_iter().skip(offset).take(length).collect();
    out.resize(length, 0.0);
    Ok(out)
}

/// Magnitude of every STFT cell.
pub fn magnitude(stft_matrix: &Array2<Complex32>) -> Array2<f32> {
    stft_matrix.mapv(|c| c.norm())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_roundtrip_reconstructs_interior() {
        let y: Vec<f32> = (0..8000).map(|i| (i as f32 * 0.05).sin() * 0.5).collect();
        let config = StftConfig::new(512, 128);
        let spec = stft(&y, &config).unwrap();
        let back = istft(&spec, &config, y.len()).unwrap();
        assert_eq!(back.len(), y.len());
        for i in 512..7500 {
            assert_relative_eq!(back[i], y[i], epsilon = 1e-3);
        }
    }

    #[test]
    fn test_shape_mismatch() {
        let spec = Array2::<Complex32>::zeros((10, 4));
        assert!(istft(&spec, &StftConfig::new(512, 128), 100).is_err());
    }

    #[test]
    fn test_empty_input() {
        let config = StftConfig::new(256, 64);
        let spec = stft(&[], &config).unwrap();
        assert_eq!(spec.shape()[0], 129);
        let back = istft(&spec, &config, 0).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn test_magnitude_of_dc() {
        let y = vec![1.0f32; 1024];
        let spec = stft(&y, &StftConfig::new(256, 64).with_center(false)).unwrap();
        let mag = magnitude(&spec);
        // Hann window sums to n/2 at DC
        assert_relative_eq!(mag[(0, 0)], 128.0, epsilon = 1e-2);
    }
}
