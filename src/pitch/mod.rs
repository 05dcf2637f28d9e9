//! Fundamental frequency tracking.
//!
//! Two estimators share the [`PitchEstimator`] interface:
//!
//! - [`MelodyEstimator`]: harmonic-summation salience that finds the
//!   predominant pitch in polyphonic material
//! - [`Yin`]: the monophonic YIN estimator, gated by its own confidence
//!
//! [`Estimator`] picks one at run time from configuration.

mod melody;
mod yin;

pub use melody::{MelodyConfig, MelodyEstimator};
pub use yin::{Yin, YinConfig};

use crate::convert::{pitch_to_midi, NO_PITCH};
use crate::Signal;

/// Pitch estimate for one analysis frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchFrame {
    /// Frame time in seconds
    pub time: f32,
    /// Fundamental frequency in Hz, 0 when unvoiced
    pub frequency: f32,
    /// Estimator confidence in `[0, 1]`, when the estimator reports one
    pub confidence: Option<f32>,
}

impl PitchFrame {
    pub fn is_voiced(&self) -> bool {
        self.frequency > 0.0
    }
}

/// Per-frame pitch contour.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PitchTrack {
    frames: Vec<PitchFrame>,
}

impl PitchTrack {
    pub fn new(frames: Vec<PitchFrame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[PitchFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn times(&self) -> Vec<f32> {
        self.frames.iter().map(|f| f.time).collect()
    }

    pub fn frequencies(&self) -> Vec<f32> {
        self.frames.iter().map(|f| f.frequency).collect()
    }

    pub fn confidences(&self) -> Vec<Option<f32>> {
        self.frames.iter().map(|f| f.confidence).collect()
    }

    /// MIDI value per frame (0 for unvoiced frames).
    ///
    /// # Example
    /// ```
    /// use groovescribe::pitch::{PitchFrame, PitchTrack};
    ///
    /// let track = PitchTrack::new(vec![
    ///     PitchFrame { time: 0.0, frequency: 440.0, confidence: None },
    ///     PitchFrame { time: 0.1, frequency: 0.0, confidence: None },
    /// ]);
    /// assert_eq!(track.to_midi(true), vec![69.0, 0.0]);
    /// ```
    pub fn to_midi(&self, quantize: bool) -> Vec<f32> {
        self.frames
            .iter()
            .map(|f| pitch_to_midi(f.frequency, quantize))
            .collect()
    }

    /// Quantized MIDI numbers per frame.
    pub fn to_midi_numbers(&self) -> Vec<i32> {
        self.to_midi(true).into_iter().map(|m| m as i32).collect()
    }

    /// Silence every frame whose confidence is at or below `threshold`.
    /// Frames without a confidence are left as they are.
    pub fn gate(mut self, threshold: f32) -> Self {
        for frame in &mut self.frames {
            if matches!(frame.confidence, Some(c) if c <= threshold) {
                frame.frequency = NO_PITCH;
            }
        }
        self
    }
}

/// Common interface of the pitch estimators.
pub trait PitchEstimator {
    /// Estimate the pitch of every frame of `signal`.
    fn track(&self, signal: &Signal) -> crate::Result<PitchTrack>;

    /// Samples between consecutive frames.
    fn hop_size(&self) -> usize;
}

/// Run-time choice of pitch estimator.
#[derive(Debug, Clone, PartialEq)]
pub enum Estimator {
    Melody(MelodyConfig),
    Yin(YinConfig),
}

impl Default for Estimator {
    fn default() -> Self {
        Estimator::Melody(MelodyConfig::default())
    }
}

impl Estimator {
    pub fn validate(&self) -> crate::Result<()> {
        match self {
            Estimator::Melody(config) => config.validate(),
            Estimator::Yin(config) => config.validate(),
        }
    }

    /// Build the configured estimator.
    pub fn build(&self) -> crate::Result<Box<dyn PitchEstimator + Send + Sync>> {
        Ok(match self {
            Estimator::Melody(config) => Box::new(MelodyEstimator::new(config.clone())?),
            Estimator::Yin(config) => Box::new(Yin::new(config.clone())?),
        })
    }

    pub fn hop_size(&self) -> usize {
        match self {
            Estimator::Melody(config) => config.hop_size,
            Estimator::Yin(config) => config.hop_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(time: f32, frequency: f32, confidence: Option<f32>) -> PitchFrame {
        PitchFrame {
            time,
            frequency,
            confidence,
        }
    }

    #[test]
    fn test_gate() {
        let track = PitchTrack::new(vec![
            frame(0.0, 110.0, Some(0.9)),
            frame(0.1, 110.0, Some(0.25)),
            frame(0.2, 110.0, None),
        ])
        .gate(0.25);
        assert_eq!(track.frequencies(), vec![110.0, 0.0, 110.0]);
    }

    #[test]
    fn test_midi_numbers() {
        let track = PitchTrack::new(vec![frame(0.0, 110.0, None), frame(0.1, -3.0, None)]);
        assert_eq!(track.to_midi_numbers(), vec![45, 0]);
    }

    #[test]
    fn test_estimator_build_validates() {
        let bad = Estimator::Yin(YinConfig::new().with_frequency_range(300.0, 100.0));
        assert!(bad.build().is_err());
        assert!(Estimator::default().build().is_ok());
    }
}
