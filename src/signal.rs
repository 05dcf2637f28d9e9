//! Mono audio signals and synthetic fixtures.
//!
//! The transcription core never decodes files: callers hand it a decoded
//! [`Signal`]. An absent signal is expressed as `Option<Signal>` by the
//! caller; a zero-length `Signal` is a valid, present, empty input.

use std::f32::consts::PI;

/// A decoded mono signal at a fixed sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Signal {
    /// Wrap decoded samples.
    ///
    /// # Errors
    /// Returns `Error::InvalidSampleRate` if `sample_rate` is 0 and
    /// `Error::NonFiniteAudio` if any sample is NaN or infinite.
    ///
    /// # Example
    /// ```
    /// use groovescribe::Signal;
    ///
    /// let signal = Signal::new(vec![0.0; 44100], 44100).unwrap();
    /// assert_eq!(signal.duration(), 1.0);
    /// assert!(Signal::new(vec![f32::NAN], 44100).is_err());
    /// ```
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> crate::Result<Self> {
        if sample_rate == 0 {
            return Err(crate::Error::InvalidSampleRate);
        }
        if !samples.iter().all(|v| v.is_finite()) {
            return Err(crate::Error::NonFiniteAudio);
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// An empty signal at the given rate.
    pub fn empty(sample_rate: u32) -> crate::Result<Self> {
        Self::new(Vec::new(), sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Build a signal with the same rate from derived samples.
    pub(crate) fn with_samples(&self, samples: Vec<f32>) -> Self {
        Self {
            samples,
            sample_rate: self.sample_rate,
        }
    }

    /// `duration` seconds of digital silence.
    pub fn silence(sample_rate: u32, duration: f32) -> crate::Result<Self> {
        let n = (duration.max(0.0) * sample_rate as f32) as usize;
        Self::new(vec![0.0; n], sample_rate)
    }

    /// A pure sine tone.
    pub fn tone(frequency: f32, sample_rate: u32, duration: f32) -> crate::Result<Self> {
        Self::harmonic_tone(frequency, &[1.0], sample_rate, duration)
    }

    /// A tone built from the given harmonic amplitudes
    /// (`amplitudes[0]` is the fundamental).
    ///
    /// # Example
    /// ```
    /// use groovescribe::Signal;
    ///
    /// let bass = Signal::harmonic_tone(110.0, &[1.0, 0.5, 0.25], 22050, 0.5).unwrap();
    /// assert_eq!(bass.len(), 11025);
    /// ```
    pub fn harmonic_tone(
        frequency: f32,
        amplitudes: &[f32],
        sample_rate: u32,
        duration: f32,
    ) -> crate::Result<Self> {
        if sample_rate == 0 {
            return Err(crate::Error::InvalidSampleRate);
        }
        let n_samples = (duration.max(0.0) * sample_rate as f32) as usize;
        let norm: f32 = amplitudes.iter().map(|a| a.abs()).sum::<f32>().max(1.0);
        let samples = (0..n_samples)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                amplitudes
                    .iter()
                    .enumerate()
                    .map(|(h, &a)| a * (2.0 * PI * frequency * (h + 1) as f32 * t).sin())
                    .sum::<f32>()
                    / norm
            })
            .collect();
        Self::new(samples, sample_rate)
    }

    /// A click track: exponentially decaying sine bursts at `times`.
    pub fn clicks(
        times: &[f32],
        sample_rate: u32,
        duration: f32,
        click_duration: f32,
        click_freq: f32,
    ) -> crate::Result<Self> {
        if sample_rate == 0 {
            return Err(crate::Error::InvalidSampleRate);
        }
        let len = (duration.max(0.0) * sample_rate as f32) as usize;
        let mut y = vec![0.0f32; len];

        let click_samples = (click_duration * sample_rate as f32) as usize;
        let angular_freq = 2.0 * PI * click_freq / sample_rate as f32;

        for &time in times {
            if time < 0.0 {
                continue;
            }
            let start = (time * sample_rate as f32) as usize;
            for i in 0..click_samples {
                let idx = start + i;
                if idx >= len {
                    break;
                }
                let t = i as f32;
                let envelope = (-t / (click_samples as f32 * 0.1)).exp();
                y[idx] += envelope * (angular_freq * t).sin();
            }
        }
        Self::new(y, sample_rate)
    }

    /// Concatenate signals sharing one sample rate.
    pub fn concat(parts: &[Signal]) -> crate::Result<Self> {
        let Some(first) = parts.first() else {
            return Err(crate::Error::InvalidSize {
                name: "parts",
                value: 0,
                reason: "need at least one signal",
            });
        };
        let sr = first.sample_rate;
        if let Some(other) = parts.iter().find(|p| p.sample_rate != sr) {
            return Err(crate::Error::ShapeMismatch {
                expected: format!("sample rate {sr}"),
                got: format!("sample rate {}", other.sample_rate),
            });
        }
        let samples = parts.iter().flat_map(|p| p.samples.iter().copied()).collect();
        Ok(Self {
            samples,
            sample_rate: sr,
        })
    }

    /// Sample-wise sum of two signals; the shorter one is zero-extended.
    pub fn mix(&self, other: &Signal) -> crate::Result<Self> {
        if self.sample_rate != other.sample_rate {
            return Err(crate::Error::ShapeMismatch {
                expected: format!("sample rate {}", self.sample_rate),
                got: format!("sample rate {}", other.sample_rate),
            });
        }
        let n = self.len().max(other.len());
        let samples = (0..n)
            .map(|i| {
                self.samples.get(i).copied().unwrap_or(0.0)
                    + other.samples.get(i).copied().unwrap_or(0.0)
            })
            .collect();
        Ok(self.with_samples(samples))
    }

    /// Apply a linear attack and exponential release envelope in place.
    pub fn shape_envelope(mut self, attack_secs: f32, release_secs: f32) -> Self {
        let sr = self.sample_rate as f32;
        let attack = (attack_secs * sr) as usize;
        let n = self.samples.len();
        for (i, s) in self.samples.iter_mut().enumerate() {
            let a = if attack > 0 && i < attack {
                i as f32 / attack as f32
            } else {
                1.0
            };
            let r = if release_secs > 0.0 {
                let from_end = (n - i) as f32 / sr;
                (from_end / release_secs).min(1.0)
            } else {
                1.0
            };
            *s *= a * r;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rejects_zero_rate() {
        assert!(matches!(
            Signal::new(vec![0.0], 0),
            Err(crate::Error::InvalidSampleRate)
        ));
    }

    #[test]
    fn test_empty_is_valid() {
        let s = Signal::empty(44100).unwrap();
        assert!(s.is_empty());
        assert_eq!(s.duration(), 0.0);
    }

    #[test]
    fn test_tone_peak() {
        let s = Signal::tone(441.0, 44100, 0.1).unwrap();
        assert_eq!(s.len(), 4410);
        let peak = s.samples().iter().fold(0.0f32, |a, &b| a.max(b.abs()));
        assert_relative_eq!(peak, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_concat_and_mix() {
        let a = Signal::new(vec![1.0, 2.0], 10).unwrap();
        let b = Signal::new(vec![3.0], 10).unwrap();
        let c = Signal::concat(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(c.samples(), &[1.0, 2.0, 3.0]);
        let m = a.mix(&b).unwrap();
        assert_eq!(m.samples(), &[4.0, 2.0]);
    }

    #[test]
    fn test_concat_rate_mismatch() {
        let a = Signal::new(vec![1.0], 10).unwrap();
        let b = Signal::new(vec![1.0], 20).unwrap();
        assert!(Signal::concat(&[a, b]).is_err());
    }

    #[test]
    fn test_clicks_placement() {
        let s = Signal::clicks(&[0.5], 1000, 1.0, 0.01, 100.0).unwrap();
        assert!(s.samples()[..500].iter().all(|&v| v == 0.0));
        assert!(s.samples()[500..510].iter().any(|&v| v != 0.0));
    }
}
