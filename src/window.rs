//! Analysis window functions.

use std::f32::consts::PI;

/// Compute a periodic Hann (raised cosine) window.
///
/// # Arguments
/// * `n` - Window length
///
/// # Returns
/// Hann window of length `n`
pub fn hann(n: usize) -> Vec<f32> {
    cosine_sum(n, &[0.5, 0.5])
}

/// Compute a periodic Hamming window.
pub fn hamming(n: usize) -> Vec<f32> {
    cosine_sum(n, &[0.54, 0.46])
}

/// Compute a periodic Blackman window.
pub fn blackman(n: usize) -> Vec<f32> {
    cosine_sum(n, &[0.42, 0.5, 0.08])
}

fn cosine_sum(n: usize, coeffs: &[f32]) -> Vec<f32> {
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![1.0];
    }
    let m = n as f32;
    (0..n)
        .map(|i| {
            coeffs
                .iter()
                .enumerate()
                .map(|(k, &c)| {
                    let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                    sign * c * (2.0 * PI * k as f32 * i as f32 / m).cos()
                })
                .sum()
        })
        .collect()
}

/// Window shapes accepted by frame analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowType {
    #[default]
    Hann,
    Hamming,
    Blackman,
}

impl WindowType {
    /// Parse a window type from a string (case-insensitive).
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "hann" | "hanning" => Some(WindowType::Hann),
            "hamming" => Some(WindowType::Hamming),
            "blackman" => Some(WindowType::Blackman),
            _ => None,
        }
    }

    /// Build a window of this type and length `n`.
    pub fn build(self, n: usize) -> Vec<f32> {
        match self {
            WindowType::Hann => hann(n),
            WindowType::Hamming => hamming(n),
            WindowType::Blackman => blackman(n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hann_endpoints() {
        let w = hann(8);
        assert_relative_eq!(w[0], 0.0, epsilon = 1e-6);
        assert_relative_eq!(w[4], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_hamming_floor() {
        let w = hamming(16);
        assert_relative_eq!(w[0], 0.08, epsilon = 1e-5);
    }

    #[test]
    fn test_degenerate_lengths() {
        assert!(hann(0).is_empty());
        assert_eq!(blackman(1), vec![1.0]);
    }

    #[test]
    fn test_parse() {
        assert_eq!(WindowType::parse("Hanning"), Some(WindowType::Hann));
        assert_eq!(WindowType::parse("kaiser"), None);
    }
}
