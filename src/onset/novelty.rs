use crate::frame::{FrameAnalyzer, FrameConfig, SpectralFrame};
use crate::Signal;
use num_complex::Complex32;
use std::f32::consts::PI;

/// Spectral novelty function used to build the onset-strength curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnsetMethod {
    /// Rectified complex-domain deviation: bins whose magnitude grew are
    /// compared against a prediction from the two previous frames.
    #[default]
    Complex,
    /// Complex-domain deviation over every bin.
    ComplexPhase,
    /// High-frequency content, `sum(k * |X_k|^2)`.
    Hfc,
    /// Spectral flux, the L1 sum of positive magnitude changes.
    Flux,
}

impl OnsetMethod {
    /// Parse a method name (case-insensitive).
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "complex" => Some(OnsetMethod::Complex),
            "complex_phase" => Some(OnsetMethod::ComplexPhase),
            "hfc" => Some(OnsetMethod::Hfc),
            "flux" => Some(OnsetMethod::Flux),
            _ => None,
        }
    }
}

/// Wrap a phase into (-pi, pi].
fn princarg(phase: f32) -> f32 {
    let wrapped = (phase + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}

/// Running state for frame-to-frame novelty.
#[derive(Debug, Clone)]
pub(crate) struct NoveltyState {
    method: OnsetMethod,
    prev_mag: Vec<f32>,
    prev_phase: Vec<f32>,
    prev2_phase: Vec<f32>,
}

impl NoveltyState {
    pub(crate) fn new(method: OnsetMethod, n_bins: usize) -> Self {
        Self {
            method,
            prev_mag: vec![0.0; n_bins],
            prev_phase: vec![0.0; n_bins],
            prev2_phase: vec![0.0; n_bins],
        }
    }

    /// Novelty of `frame` relative to the frames seen so far.
    pub(crate) fn push(&mut self, frame: &SpectralFrame) -> f32 {
        let value = match self.method {
            OnsetMethod::Complex => self.complex_domain(frame, true),
            OnsetMethod::ComplexPhase => self.complex_domain(frame, false),
            OnsetMethod::Hfc => frame
                .magnitude
                .iter()
                .enumerate()
                .map(|(k, &m)| k as f32 * m * m)
                .sum(),
            OnsetMethod::Flux => frame
                .magnitude
                .iter()
                .zip(self.prev_mag.iter())
                .map(|(&m, &p)| (m - p).max(0.0))
                .sum(),
        };

        std::mem::swap(&mut self.prev2_phase, &mut self.prev_phase);
        self.prev_phase.copy_from_slice(&frame.phase);
        self.prev_mag.copy_from_slice(&frame.magnitude);
        value
    }

    fn complex_domain(&self, frame: &SpectralFrame, rectify: bool) -> f32 {
        let mut sum = 0.0f32;
        for k in 0..frame.magnitude.len() {
            let mag = frame.magnitude[k];
            let prev = self.prev_mag[k];
            if rectify && mag < prev {
                continue;
            }
            let target_phase = princarg(2.0 * self.prev_phase[k] - self.prev2_phase[k]);
            let target = Complex32::from_polar(prev, target_phase);
            let observed = Complex32::from_polar(mag, frame.phase[k]);
            sum += (observed - target).norm();
        }
        sum
    }
}

/// Compute the onset-strength (novelty) curve of a signal, one value per
/// frame.
///
/// # Arguments
/// * `signal` - Input signal
/// * `frame` - Framing parameters
/// * `method` - Novelty function
///
/// # Example
/// ```
/// use groovescribe::frame::FrameConfig;
/// use groovescribe::onset::{novelty_curve, OnsetMethod};
/// use groovescribe::Signal;
///
/// let signal = Signal::silence(44100, 1.0).unwrap();
/// let curve = novelty_curve(&signal, &FrameConfig::new(1024, 512), OnsetMethod::Complex).unwrap();
/// assert!(curve.iter().all(|&v| v == 0.0));
/// ```
pub fn novelty_curve(
    signal: &Signal,
    frame: &FrameConfig,
    method: OnsetMethod,
) -> crate::Result<Vec<f32>> {
    let analyzer = FrameAnalyzer::new(frame.clone())?;
    let mut state = NoveltyState::new(method, analyzer.n_bins());
    Ok(analyzer
        .spectra(signal)
        .map(|spectrum| state.push(&spectrum))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_princarg_range() {
        assert_relative_eq!(princarg(3.0 * PI), PI, epsilon = 1e-5);
        assert_relative_eq!(princarg(-0.5), -0.5, epsilon = 1e-6);
        assert_relative_eq!(princarg(2.0 * PI + 0.25), 0.25, epsilon = 1e-5);
    }

    #[test]
    fn test_empty_signal_empty_curve() {
        let signal = Signal::empty(44100).unwrap();
        let curve = novelty_curve(&signal, &FrameConfig::new(1024, 512), OnsetMethod::Complex)
            .unwrap();
        assert!(curve.is_empty());
    }

    #[test]
    fn test_step_produces_peak() {
        let mut samples = vec![0.0f32; 4096];
        samples.extend(Signal::tone(1000.0, 44100, 0.2).unwrap().samples());
        let signal = Signal::new(samples, 44100).unwrap();
        for method in [
            OnsetMethod::Complex,
            OnsetMethod::ComplexPhase,
            OnsetMethod::Flux,
        ] {
            let curve = novelty_curve(&signal, &FrameConfig::new(1024, 512), method).unwrap();
            let (argmax, _) = curve
                .iter()
                .enumerate()
                .fold((0, f32::MIN), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc });
            // The tone starts at frame 8; the strongest change lands within
            // the frames that overlap the transition.
            assert!((6..=9).contains(&argmax), "{:?}: argmax {}", method, argmax);
            assert!(curve[..6].iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn test_stationary_tone_complex_is_quiet() {
        let signal = Signal::tone(441.0, 44100, 1.0).unwrap();
        let curve = novelty_curve(&signal, &FrameConfig::new(1024, 512), OnsetMethod::Complex)
            .unwrap();
        let onset_peak = curve[..3].iter().copied().fold(0.0f32, f32::max);
        let steady_max = curve[10..].iter().copied().fold(0.0f32, f32::max);
        assert!(steady_max < 0.05 * onset_peak);
    }

    #[test]
    fn test_hfc_weights_high_bins() {
        let low = Signal::tone(200.0, 44100, 0.1).unwrap();
        let high = Signal::tone(8000.0, 44100, 0.1).unwrap();
        let cfg = FrameConfig::new(1024, 512);
        let l = novelty_curve(&low, &cfg, OnsetMethod::Hfc).unwrap();
        let h = novelty_curve(&high, &cfg, OnsetMethod::Hfc).unwrap();
        assert!(h[0] > 10.0 * l[0]);
    }

    #[test]
    fn test_parse() {
        assert_eq!(OnsetMethod::parse("HFC"), Some(OnsetMethod::Hfc));
        assert_eq!(OnsetMethod::parse("melflux"), None);
    }
}
