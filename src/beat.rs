//! Beat tracking, beat sequences and external segmentation metadata.

use serde::Deserialize;

use crate::frame::FrameConfig;
use crate::onset::{novelty_curve, OnsetMethod};
use crate::Signal;

/// Configuration for beat tracking.
///
/// This struct provides a builder pattern for configuring beat tracking parameters.
///
/// # Example
/// ```
/// use groovescribe::beat::BeatTrackConfig;
///
/// let config = BeatTrackConfig::new().with_tempo_range(90.0, 130.0);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BeatTrackConfig {
    /// Frame size of the onset envelope analysis
    pub frame_size: usize,
    /// Hop between envelope frames
    pub hop_size: usize,
    /// Lowest tempo considered, in BPM
    pub min_tempo: f32,
    /// Highest tempo considered, in BPM
    pub max_tempo: f32,
    /// Centre of the tempo prior, in BPM
    pub start_bpm: f32,
}

impl BeatTrackConfig {
    /// Create a new beat tracking configuration with defaults.
    pub fn new() -> Self {
        Self {
            frame_size: 2048,
            hop_size: 512,
            min_tempo: 40.0,
            max_tempo: 208.0,
            start_bpm: 120.0,
        }
    }

    /// Tempo bounds used on the percussive path.
    pub fn drums() -> Self {
        Self::new().with_tempo_range(90.0, 130.0)
    }

    pub fn with_frame_size(mut self, frame_size: usize) -> Self {
        self.frame_size = frame_size;
        self
    }

    pub fn with_hop_size(mut self, hop_size: usize) -> Self {
        self.hop_size = hop_size;
        self
    }

    pub fn with_tempo_range(mut self, min_tempo: f32, max_tempo: f32) -> Self {
        self.min_tempo = min_tempo;
        self.max_tempo = max_tempo;
        self
    }

    pub fn with_start_bpm(mut self, start_bpm: f32) -> Self {
        self.start_bpm = start_bpm;
        self
    }

    pub fn validate(&self) -> crate::Result<()> {
        FrameConfig::new(self.frame_size, self.hop_size).validate()?;
        if !(self.min_tempo > 0.0) {
            return Err(crate::Error::invalid("min_tempo", self.min_tempo, "must be > 0"));
        }
        if !(self.max_tempo > self.min_tempo) {
            return Err(crate::Error::invalid(
                "max_tempo",
                self.max_tempo,
                format!("must be > min_tempo ({})", self.min_tempo),
            ));
        }
        if !(self.start_bpm > 0.0) {
            return Err(crate::Error::invalid("start_bpm", self.start_bpm, "must be > 0"));
        }
        Ok(())
    }

    /// Track beats with this configuration.
    pub fn track(&self, signal: &Signal) -> crate::Result<(f32, BeatSequence)> {
        track_beats(signal, self)
    }
}

impl Default for BeatTrackConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Sorted beat times in seconds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BeatSequence {
    times: Vec<f32>,
}

impl BeatSequence {
    /// Build a sequence, sorting and removing duplicates.
    pub fn new(mut times: Vec<f32>) -> Self {
        crate::utils::sort_dedup(&mut times);
        Self { times }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.times
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Add one synthetic beat before the first and one after the last,
    /// using the adjacent inter-beat interval.
    ///
    /// The leading beat is kept when it lands at a positive time. One that
    /// falls below zero by less than a quarter interval is clamped to 0.
    /// Sequences with fewer than two beats are returned unchanged.
    ///
    /// # Example
    /// ```
    /// use groovescribe::beat::BeatSequence;
    ///
    /// let beats = BeatSequence::new(vec![0.6, 1.1, 1.6]).extend_boundaries();
    /// assert_eq!(beats.len(), 5);
    /// ```
    pub fn extend_boundaries(mut self) -> Self {
        let n = self.times.len();
        if n < 2 {
            return self;
        }
        let first_interval = self.times[1] - self.times[0];
        let last_interval = self.times[n - 1] - self.times[n - 2];

        let lead = self.times[0] - first_interval;
        if lead > 0.0 {
            self.times.insert(0, lead);
        } else if lead >= -0.25 * first_interval && self.times[0] > 0.0 {
            self.times.insert(0, 0.0);
        }
        let tail = self.times[self.times.len() - 1] + last_interval;
        self.times.push(tail);
        self
    }
}

impl From<Vec<f32>> for BeatSequence {
    fn from(times: Vec<f32>) -> Self {
        Self::new(times)
    }
}

/// Bar-level segmentation supplied by an external analysis.
///
/// The percussive loop of `length_bar` 4/4 bars spans `length_s` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Segmentation {
    pub length_s: f32,
    pub length_bar: u32,
}

#[derive(Deserialize)]
struct SegmentationFile {
    percussive: Segmentation,
}

impl Segmentation {
    pub fn new(length_s: f32, length_bar: u32) -> crate::Result<Self> {
        let seg = Self {
            length_s,
            length_bar,
        };
        seg.validate()?;
        Ok(seg)
    }

    /// Parse the `percussive` entry of a segmentation JSON document.
    ///
    /// # Example
    /// ```
    /// use groovescribe::beat::Segmentation;
    ///
    /// let json = r#"{"percussive": {"length_s": 8.0, "length_bar": 4}}"#;
    /// let seg = Segmentation::from_json(json).unwrap();
    /// assert_eq!(seg.beats().len(), 17);
    /// ```
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let file: SegmentationFile = serde_json::from_str(json)?;
        file.percussive.validate()?;
        Ok(file.percussive)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if !(self.length_s > 0.0) || !self.length_s.is_finite() {
            return Err(crate::Error::invalid("length_s", self.length_s, "must be > 0"));
        }
        if self.length_bar == 0 {
            return Err(crate::Error::InvalidSize {
                name: "length_bar",
                value: 0,
                reason: "must be > 0",
            });
        }
        Ok(())
    }

    /// Number of quarter-note beats in the loop.
    pub fn beat_count(&self) -> u32 {
        4 * self.length_bar
    }

    /// Beat times `k * length_s / (4 * length_bar)` for
    /// `k = 0..=4 * length_bar`.
    pub fn beats(&self) -> BeatSequence {
        let n = self.beat_count();
        let step = self.length_s / n as f32;
        BeatSequence {
            times: (0..=n).map(|k| k as f32 * step).collect(),
        }
    }
}

/// Where a transcriber takes its beats from.
#[derive(Debug, Clone, PartialEq)]
pub enum BeatSource {
    /// Track beats in the signal itself
    Detected(BeatTrackConfig),
    /// Derive beats from external bar segmentation
    Segmentation(Segmentation),
    /// Caller-provided beat times in seconds
    Fixed(Vec<f32>),
}

impl Default for BeatSource {
    fn default() -> Self {
        BeatSource::Detected(BeatTrackConfig::new())
    }
}

impl BeatSource {
    pub fn validate(&self) -> crate::Result<()> {
        match self {
            BeatSource::Detected(config) => config.validate(),
            BeatSource::Segmentation(seg) => seg.validate(),
            BeatSource::Fixed(_) => Ok(()),
        }
    }

    /// Resolve the beat sequence for `signal`.
    pub fn beats(&self, signal: &Signal) -> crate::Result<BeatSequence> {
        match self {
            BeatSource::Detected(config) => Ok(track_beats(signal, config)?.1),
            BeatSource::Segmentation(seg) => Ok(seg.beats()),
            BeatSource::Fixed(times) => Ok(BeatSequence::new(times.clone())),
        }
    }
}

/// Simple beat tracking using an onset envelope and tempo.
///
/// The envelope is the positive spectral flux of the signal. Tempo comes
/// from its autocorrelation within `[min_tempo, max_tempo]`, weighted by a
/// log-normal prior around `start_bpm`. Beats are then picked at the
/// envelope maxima nearest each expected period.
///
/// # Arguments
/// * `signal` - Audio signal
/// * `config` - Frame and tempo parameters
///
/// # Returns
/// (tempo, beats) - Estimated tempo in BPM and beat times in seconds
///
/// # Example
/// ```
/// use groovescribe::beat::{track_beats, BeatTrackConfig};
/// use groovescribe::Signal;
///
/// let signal = Signal::empty(22050).unwrap();
/// let (tempo, beats) = track_beats(&signal, &BeatTrackConfig::new()).unwrap();
/// assert_eq!(tempo, 120.0);
/// assert!(beats.is_empty());
/// ```
pub fn track_beats(signal: &Signal, config: &BeatTrackConfig) -> crate::Result<(f32, BeatSequence)> {
    config.validate()?;
    let frame = FrameConfig::new(config.frame_size, config.hop_size).with_start_from_zero(false);
    let env = novelty_curve(signal, &frame, OnsetMethod::Flux)?;

    if env.len() < 2 {
        return Ok((config.start_bpm, BeatSequence::default()));
    }

    let sr = signal.sample_rate();
    let tempo = estimate_tempo(&env, sr, config);
    let frames = find_beats(&env, tempo, sr, config.hop_size);
    let times = crate::convert::frames_to_time(&frames, sr, config.hop_size);
    log::debug!("beats: tempo {:.1} BPM, {} beats", tempo, times.len());
    Ok((tempo, BeatSequence::new(times)))
}

/// Estimate tempo from an onset envelope using autocorrelation.
fn estimate_tempo(onset_env: &[f32], sr: u32, config: &BeatTrackConfig) -> f32 {
    let frames_per_minute = 60.0 * sr as f32 / config.hop_size as f32;
    let min_lag = (frames_per_minute / config.max_tempo).ceil().max(1.0) as usize;
    let max_lag = ((frames_per_minute / config.min_tempo).floor() as usize).min(onset_env.len() - 1);

    if min_lag > max_lag {
        return config.start_bpm.clamp(config.min_tempo, config.max_tempo);
    }

    let mut best_lag = 0;
    let mut best_score = 0.0f32;

    for lag in min_lag..=max_lag {
        let corr: f32 = onset_env
            .iter()
            .zip(onset_env[lag..].iter())
            .map(|(a, b)| a * b)
            .sum();
        let bpm = frames_per_minute / lag as f32;
        let prior = (-0.5 * (bpm / config.start_bpm).log2().powi(2)).exp();
        let score = corr * prior;

        if score > best_score {
            best_score = score;
            best_lag = lag;
        }
    }

    if best_lag == 0 {
        return config.start_bpm.clamp(config.min_tempo, config.max_tempo);
    }
    frames_per_minute / best_lag as f32
}

/// Find beat frames by peak picking around each expected period.
fn find_beats(onset_env: &[f32], tempo: f32, sr: u32, hop_size: usize) -> Vec<usize> {
    let period = 60.0 * sr as f32 / (tempo * hop_size as f32);
    if !(period >= 1.0) {
        return Vec::new();
    }

    let global_max = onset_env.iter().copied().fold(0.0f32, f32::max);
    if global_max <= 0.0 {
        return Vec::new();
    }
    let floor = 0.1 * global_max;
    let half = (period / 2.0).round() as usize;

    let argmax = |start: usize, end: usize| -> (usize, f32) {
        onset_env[start..end]
            .iter()
            .enumerate()
            .fold((start, 0.0f32), |acc, (i, &v)| if v > acc.1 { (start + i, v) } else { acc })
    };

    // First beat: strongest frame within half a period of the first
    // significant onset.
    let Some(first_active) = onset_env.iter().position(|&v| v > floor) else {
        return Vec::new();
    };
    let (first, _) = argmax(first_active, (first_active + half + 1).min(onset_env.len()));

    let mut beats = vec![first];
    let mut expected = first as f32 + period;
    while (expected.round() as usize) < onset_env.len() {
        let centre = expected.round() as usize;
        let start = centre.saturating_sub(half);
        let end = (centre + half + 1).min(onset_env.len());
        let (pos, val) = argmax(start, end);

        if val > floor && beats.last().map_or(true, |&last| pos > last) {
            beats.push(pos);
            // Re-anchor on the detected beat to follow small drifts.
            expected = pos as f32 + period;
        } else {
            expected += period;
        }
    }

    beats
}
