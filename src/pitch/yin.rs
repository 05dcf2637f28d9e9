use num_complex::Complex32;

use super::{PitchEstimator, PitchFrame, PitchTrack};
use crate::fft::FftPlan;
use crate::frame::{FrameAnalyzer, FrameConfig};
use crate::Signal;

/// Configuration for YIN pitch estimation.
///
/// This struct provides a builder pattern for configuring YIN parameters
/// instead of using many positional arguments.
///
/// # Example
/// ```
/// use groovescribe::pitch::YinConfig;
///
/// let config = YinConfig::new()
///     .with_frequency_range(40.0, 400.0)
///     .with_tolerance(0.1);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct YinConfig {
    /// Length of analysis frames in samples
    pub frame_size: usize,
    /// Number of samples between frames
    pub hop_size: usize,
    /// Minimum frequency to consider in Hz
    pub min_frequency: f32,
    /// Maximum frequency to consider in Hz
    pub max_frequency: f32,
    /// CMNDF dip threshold for picking the period
    pub tolerance: f32,
    /// Frames with confidence at or below this are reported unvoiced
    pub confidence_threshold: f32,
}

impl YinConfig {
    /// Create a new YIN configuration with defaults.
    pub fn new() -> Self {
        Self {
            frame_size: 2048,
            hop_size: 512,
            min_frequency: 20.0,
            max_frequency: 22050.0,
            tolerance: 0.15,
            confidence_threshold: 0.25,
        }
    }

    pub fn with_frame_size(mut self, frame_size: usize) -> Self {
        self.frame_size = frame_size;
        self
    }

    pub fn with_hop_size(mut self, hop_size: usize) -> Self {
        self.hop_size = hop_size;
        self
    }

    pub fn with_frequency_range(mut self, min_frequency: f32, max_frequency: f32) -> Self {
        self.min_frequency = min_frequency;
        self.max_frequency = max_frequency;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_confidence_threshold(mut self, confidence_threshold: f32) -> Self {
        self.confidence_threshold = confidence_threshold;
        self
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.frame_size < 4 {
            return Err(crate::Error::InvalidSize {
                name: "frame_size",
                value: self.frame_size,
                reason: "must be >= 4",
            });
        }
        FrameConfig::new(self.frame_size, self.hop_size).validate()?;
        if !(self.min_frequency > 0.0) || !(self.max_frequency > self.min_frequency) {
            return Err(crate::Error::InvalidFrequencyRange {
                fmin: self.min_frequency,
                fmax: self.max_frequency,
                reason: "need 0 < fmin < fmax".into(),
            });
        }
        if !(self.tolerance > 0.0 && self.tolerance <= 1.0) {
            return Err(crate::Error::invalid("tolerance", self.tolerance, "must be in (0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(crate::Error::invalid(
                "confidence_threshold",
                self.confidence_threshold,
                "must be in [0, 1]",
            ));
        }
        Ok(())
    }
}

impl Default for YinConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// YIN pitch estimator.
///
/// YIN is an autocorrelation-based pitch estimation algorithm that uses
/// the cumulative mean normalized difference function (CMNDF) to detect
/// the fundamental frequency. Confidence is `1 - cmndf(tau)` at the chosen
/// period; frames at or below `confidence_threshold` come back unvoiced.
///
/// # Example
/// ```
/// use groovescribe::pitch::{PitchEstimator, Yin, YinConfig};
/// use groovescribe::Signal;
///
/// let signal = Signal::tone(220.0, 22050, 0.5).unwrap();
/// let yin = Yin::new(YinConfig::new()).unwrap();
/// let track = yin.track(&signal).unwrap();
/// let voiced: Vec<f32> = track.frequencies().into_iter().filter(|&f| f > 0.0).collect();
/// let avg = voiced.iter().sum::<f32>() / voiced.len() as f32;
/// assert!((avg - 220.0).abs() < 5.0);
/// ```
#[derive(Debug)]
pub struct Yin {
    config: YinConfig,
    analyzer: FrameAnalyzer,
    plan: FftPlan,
}

impl Yin {
    pub fn new(config: YinConfig) -> crate::Result<Self> {
        config.validate()?;
        let analyzer = FrameAnalyzer::new(
            FrameConfig::new(config.frame_size, config.hop_size).with_start_from_zero(false),
        )?;
        let plan = FftPlan::new(2 * config.frame_size);
        Ok(Self {
            config,
            analyzer,
            plan,
        })
    }

    pub fn config(&self) -> &YinConfig {
        &self.config
    }

    /// Raw per-frame estimates `(frequency, confidence)` without gating.
    pub fn estimate(&self, signal: &Signal) -> Vec<(f32, f32)> {
        let sr = signal.sample_rate() as f32;
        let half = self.config.frame_size / 2;
        let tau_min = ((sr / self.config.max_frequency).floor() as usize).clamp(1, half);
        let tau_max = ((sr / self.config.min_frequency).ceil() as usize).min(half);

        self.analyzer
            .frames(signal)
            .map(|frame| self.estimate_frame(&frame.samples, sr, tau_min, tau_max))
            .collect()
    }

    fn estimate_frame(&self, frame: &[f32], sr: f32, tau_min: usize, tau_max: usize) -> (f32, f32) {
        if tau_min + 1 >= tau_max {
            return (0.0, 0.0);
        }
        let cmndf = self.cmndf(frame, tau_max);
        let Some(cmndf) = cmndf else {
            return (0.0, 0.0);
        };

        // First dip below tolerance, followed down to its local minimum.
        let mut tau = (tau_min..tau_max).find(|&t| cmndf[t] < self.config.tolerance);
        if let Some(t) = tau.as_mut() {
            while *t + 1 < tau_max && cmndf[*t + 1] < cmndf[*t] {
                *t += 1;
            }
        }
        // No dip: fall back to the global minimum.
        let tau = tau.unwrap_or_else(|| {
            (tau_min..tau_max).fold(tau_min, |best, t| if cmndf[t] < cmndf[best] { t } else { best })
        });

        let (shift, value) = if tau > 0 && tau + 1 < cmndf.len() {
            parabolic(cmndf[tau - 1], cmndf[tau], cmndf[tau + 1])
        } else {
            (0.0, cmndf[tau])
        };
        let period = tau as f32 + shift;
        if period <= 0.0 {
            return (0.0, 0.0);
        }
        (sr / period, (1.0 - value).clamp(0.0, 1.0))
    }

    /// CMNDF for lags `0..tau_max`, or `None` for a silent frame.
    ///
    /// The difference function is built from the FFT autocorrelation:
    /// `d(tau) = e(0, n - tau) + e(tau, n) - 2 r(tau)`.
    fn cmndf(&self, frame: &[f32], tau_max: usize) -> Option<Vec<f32>> {
        let n = frame.len();
        let mut buffer: Vec<Complex32> = frame
            .iter()
            .map(|&x| Complex32::new(x, 0.0))
            .chain(std::iter::repeat(Complex32::new(0.0, 0.0)))
            .take(self.plan.len())
            .collect();
        self.plan.forward(&mut buffer);
        for c in buffer.iter_mut() {
            *c = Complex32::new(c.norm_sqr(), 0.0);
        }
        self.plan.inverse(&mut buffer);

        // cumulative energy: energy[j] = sum of x^2 over 0..j
        let mut energy = Vec::with_capacity(n + 1);
        energy.push(0.0f32);
        for &x in frame {
            let last = energy[energy.len() - 1];
            energy.push(last + x * x);
        }
        if energy[n] <= f32::EPSILON {
            return None;
        }

        let mut cmndf = vec![1.0f32; tau_max];
        let mut running_sum = 0.0f32;
        for tau in 1..tau_max {
            let head = energy[n - tau];
            let tail = energy[n] - energy[tau];
            let diff = (head + tail - 2.0 * buffer[tau].re).max(0.0);
            running_sum += diff;
            cmndf[tau] = if running_sum > 0.0 {
                diff * tau as f32 / running_sum
            } else {
                1.0
            };
        }
        Some(cmndf)
    }
}

/// Vertex of the parabola through three equally spaced points:
/// `(offset from the centre, value at the vertex)`.
fn parabolic(s0: f32, s1: f32, s2: f32) -> (f32, f32) {
    let denom = s0 - 2.0 * s1 + s2;
    if denom.abs() <= 1e-10 {
        return (0.0, s1);
    }
    let shift = (0.5 * (s0 - s2) / denom).clamp(-1.0, 1.0);
    (shift, s1 - 0.25 * (s0 - s2) * shift)
}

impl PitchEstimator for Yin {
    fn track(&self, signal: &Signal) -> crate::Result<PitchTrack> {
        let sr = signal.sample_rate();
        let frames = self
            .estimate(signal)
            .into_iter()
            .enumerate()
            .map(|(i, (frequency, confidence))| PitchFrame {
                time: self.analyzer.frame_time(i, sr),
                frequency,
                confidence: Some(confidence),
            })
            .collect();
        let track = PitchTrack::new(frames).gate(self.config.confidence_threshold);
        log::debug!(
            "yin: {} frames, {} voiced",
            track.len(),
            track.frames().iter().filter(|f| f.is_voiced()).count()
        );
        Ok(track)
    }

    fn hop_size(&self) -> usize {
        self.config.hop_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn median_voiced(track: &PitchTrack) -> f32 {
        let voiced: Vec<f32> = track.frequencies().into_iter().filter(|&f| f > 0.0).collect();
        crate::utils::median(&voiced).unwrap_or(0.0)
    }

    #[test]
    fn test_yin_pure_tone() {
        let signal = Signal::tone(110.0, 44100, 1.0).unwrap();
        let yin = Yin::new(YinConfig::new()).unwrap();
        let track = yin.track(&signal).unwrap();
        assert_eq!(track.len(), 44100 / 512 + 1);
        assert_relative_eq!(median_voiced(&track), 110.0, epsilon = 1.0);
    }

    #[test]
    fn test_yin_harmonic_tone() {
        let signal = Signal::harmonic_tone(82.41, &[1.0, 0.6, 0.3, 0.2], 44100, 1.0).unwrap();
        let yin = Yin::new(YinConfig::new().with_frequency_range(40.0, 400.0)).unwrap();
        let track = yin.track(&signal).unwrap();
        assert_relative_eq!(median_voiced(&track), 82.41, epsilon = 1.0);
    }

    #[test]
    fn test_yin_confidence_high_on_tone() {
        let signal = Signal::tone(220.0, 22050, 0.5).unwrap();
        let yin = Yin::new(YinConfig::new()).unwrap();
        let estimates = yin.estimate(&signal);
        let mid = estimates[estimates.len() / 2];
        assert!(mid.1 > 0.9, "confidence {}", mid.1);
    }

    #[test]
    fn test_yin_silence_unvoiced() {
        let signal = Signal::silence(22050, 0.5).unwrap();
        let yin = Yin::new(YinConfig::new()).unwrap();
        let track = yin.track(&signal).unwrap();
        assert!(track.frames().iter().all(|f| f.frequency == 0.0));
        assert!(track.frames().iter().all(|f| f.confidence == Some(0.0)));
    }

    #[test]
    fn test_yin_empty() {
        let signal = Signal::empty(22050).unwrap();
        let yin = Yin::new(YinConfig::new()).unwrap();
        assert!(yin.track(&signal).unwrap().is_empty());
    }

    #[test]
    fn test_yin_frame_times() {
        let signal = Signal::tone(220.0, 22050, 0.2).unwrap();
        let yin = Yin::new(YinConfig::new().with_hop_size(441)).unwrap();
        let track = yin.track(&signal).unwrap();
        assert_relative_eq!(track.frames()[2].time, 0.04, epsilon = 1e-6);
    }

    #[test]
    fn test_parabolic_vertex() {
        let (shift, value) = parabolic(1.0, 0.0, 1.0);
        assert_eq!(shift, 0.0);
        assert_eq!(value, 0.0);
        let (shift, _) = parabolic(2.0, 1.0, 2.0 / 3.0 + 1.0);
        assert!(shift > 0.0);
    }

    #[test]
    fn test_rejects_bad_range() {
        assert!(Yin::new(YinConfig::new().with_frequency_range(0.0, 100.0)).is_err());
        assert!(Yin::new(YinConfig::new().with_tolerance(0.0)).is_err());
        assert!(Yin::new(YinConfig::new().with_confidence_threshold(1.5)).is_err());
        assert!(Yin::new(YinConfig::new().with_confidence_threshold(-0.1)).is_err());
        assert!(Yin::new(YinConfig::new().with_confidence_threshold(1.0)).is_ok());
    }
}
