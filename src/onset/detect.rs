use crate::frame::{FrameAnalyzer, FrameConfig};
use crate::onset::novelty::{NoveltyState, OnsetMethod};
use crate::utils::{localmax, mean, median, normalize_max};
use crate::window::WindowType;
use crate::Signal;

/// Sorted, duplicate-free onset times in seconds.
pub type OnsetSet = Vec<f32>;

/// Configuration for onset detection.
///
/// This struct provides a builder pattern for configuring onset detection parameters.
///
/// # Example
/// ```
/// use groovescribe::onset::{OnsetConfig, OnsetMethod};
///
/// let config = OnsetConfig::new()
///     .with_method(OnsetMethod::Hfc)
///     .with_alpha(0.2);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct OnsetConfig {
    /// Analysis frame size
    pub frame_size: usize,
    /// Hop between frames
    pub hop_size: usize,
    /// Analysis window
    pub window: WindowType,
    /// Novelty function
    pub method: OnsetMethod,
    /// Weight of the moving mean in the adaptive threshold
    pub alpha: f32,
    /// Half-width, in frames, of the adaptive threshold window
    pub delay: usize,
    /// Normalized novelty below this value never yields an onset
    pub silence_threshold: f32,
}

impl OnsetConfig {
    /// Create a new onset detection configuration with defaults.
    pub fn new() -> Self {
        Self {
            frame_size: 1024,
            hop_size: 512,
            window: WindowType::Hann,
            method: OnsetMethod::Complex,
            alpha: 0.1,
            delay: 5,
            silence_threshold: 0.02,
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

    pub fn with_window(mut self, window: WindowType) -> Self {
        self.window = window;
        self
    }

    pub fn with_method(mut self, method: OnsetMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_delay(mut self, delay: usize) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_silence_threshold(mut self, silence_threshold: f32) -> Self {
        self.silence_threshold = silence_threshold;
        self
    }

    pub(crate) fn frame_config(&self) -> FrameConfig {
        FrameConfig::new(self.frame_size, self.hop_size)
            .with_window(self.window)
            .with_start_from_zero(false)
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.frame_config().validate()?;
        if !(self.alpha >= 0.0) {
            return Err(crate::Error::invalid("alpha", self.alpha, "must be >= 0"));
        }
        if !(0.0..1.0).contains(&self.silence_threshold) {
            return Err(crate::Error::invalid(
                "silence_threshold",
                self.silence_threshold,
                "must be in [0, 1)",
            ));
        }
        Ok(())
    }

    /// Detect onsets with this configuration.
    pub fn detect(&self, signal: &Signal) -> crate::Result<OnsetSet> {
        detect_onsets(signal, self)
    }
}

impl Default for OnsetConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick onset times from a single novelty stream.
///
/// The stream is scaled by its maximum, an adaptive threshold
/// `median + alpha * mean` over `delay` frames on either side is
/// subtracted, and the remaining positive local maxima above the silence
/// threshold are reported as `frame / frame_rate` seconds.
///
/// # Example
/// ```
/// use groovescribe::onset::{select_onsets, OnsetConfig};
///
/// let mut novelty = vec![0.0f32; 40];
/// novelty[10] = 1.0;
/// novelty[30] = 0.8;
/// let onsets = select_onsets(&novelty, 10.0, &OnsetConfig::new());
/// assert_eq!(onsets, vec![1.0, 3.0]);
/// ```
pub fn select_onsets(novelty: &[f32], frame_rate: f32, config: &OnsetConfig) -> OnsetSet {
    if novelty.is_empty() || !(frame_rate > 0.0) {
        return Vec::new();
    }
    if !novelty.iter().any(|&v| v > 0.0) {
        return Vec::new();
    }

    let norm = normalize_max(novelty);
    let n = norm.len();
    let thresholded: Vec<f32> = (0..n)
        .map(|i| {
            let lo = i.saturating_sub(config.delay);
            let hi = (i + config.delay + 1).min(n);
            let window = &norm[lo..hi];
            let threshold = median(window).unwrap_or(0.0) + config.alpha * mean(window);
            (norm[i] - threshold).max(0.0)
        })
        .collect();

    localmax(&thresholded)
        .into_iter()
        .filter(|&i| thresholded[i] > 0.0 && norm[i] > config.silence_threshold)
        .map(|i| i as f32 / frame_rate)
        .collect()
}

/// Onset detector holding a reusable frame analyzer.
#[derive(Debug)]
pub struct OnsetDetector {
    config: OnsetConfig,
    analyzer: FrameAnalyzer,
}

impl OnsetDetector {
    pub fn new(config: OnsetConfig) -> crate::Result<Self> {
        config.validate()?;
        let analyzer = FrameAnalyzer::new(config.frame_config())?;
        Ok(Self { config, analyzer })
    }

    pub fn config(&self) -> &OnsetConfig {
        &self.config
    }

    /// Per-frame novelty curve.
    pub fn novelty(&self, signal: &Signal) -> Vec<f32> {
        let mut state = NoveltyState::new(self.config.method, self.analyzer.n_bins());
        self.analyzer
            .spectra(signal)
            .map(|spectrum| state.push(&spectrum))
            .collect()
    }

    /// Detect onset times in seconds. Empty or silent signals give an
    /// empty set.
    pub fn detect(&self, signal: &Signal) -> OnsetSet {
        let novelty = self.novelty(signal);
        let frame_rate = signal.sample_rate() as f32 / self.config.hop_size as f32;
        let duration = signal.duration();
        let mut onsets = select_onsets(&novelty, frame_rate, &self.config);
        onsets.retain(|&t| t <= duration);
        log::debug!(
            "onsets: {} detected over {} frames ({:.2}s)",
            onsets.len(),
            novelty.len(),
            duration
        );
        onsets
    }
}

/// Detect onsets in a signal.
///
/// # Arguments
/// * `signal` - Input signal (or a band-filtered sub-signal)
/// * `config` - Detection parameters
///
/// # Returns
/// Sorted onset times in seconds within `[0, duration]`
///
/// # Errors
/// Only configuration errors; degenerate audio yields an empty set.
pub fn detect_onsets(signal: &Signal, config: &OnsetConfig) -> crate::Result<OnsetSet> {
    Ok(OnsetDetector::new(config.clone())?.detect(signal))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_empty_and_flat() {
        let cfg = OnsetConfig::new();
        assert!(select_onsets(&[], 86.0, &cfg).is_empty());
        assert!(select_onsets(&[0.0; 32], 86.0, &cfg).is_empty());
        assert!(select_onsets(&[1.0; 32], 86.0, &cfg).is_empty());
    }

    #[test]
    fn test_select_respects_silence_threshold() {
        let mut novelty = vec![0.0f32; 40];
        novelty[5] = 1.0;
        novelty[25] = 0.01;
        let onsets = select_onsets(&novelty, 10.0, &OnsetConfig::new());
        assert_eq!(onsets, vec![0.5]);
    }

    #[test]
    fn test_select_first_frame() {
        let mut novelty = vec![0.0f32; 20];
        novelty[0] = 1.0;
        let onsets = select_onsets(&novelty, 10.0, &OnsetConfig::new());
        assert_eq!(onsets, vec![0.0]);
    }

    #[test]
    fn test_validate() {
        assert!(OnsetConfig::new().with_alpha(-1.0).validate().is_err());
        assert!(OnsetConfig::new().with_hop_size(0).validate().is_err());
        assert!(OnsetConfig::new().with_silence_threshold(1.5).validate().is_err());
    }

    #[test]
    fn test_detect_silence() {
        let signal = Signal::silence(44100, 1.0).unwrap();
        assert!(detect_onsets(&signal, &OnsetConfig::new()).unwrap().is_empty());
    }

    #[test]
    fn test_detect_empty() {
        let signal = Signal::empty(44100).unwrap();
        assert!(detect_onsets(&signal, &OnsetConfig::new()).unwrap().is_empty());
    }
}
