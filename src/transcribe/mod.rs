//! Note-level transcription pipelines.
//!
//! - [`bassline`]: pitch contour to grid-aligned notes
//! - [`drums`]: band-limited onsets to a bands x grid-steps matrix
//! - [`runs`]: run-length segmentation of quantized pitch shared by both

pub mod bassline;
pub mod drums;
pub mod runs;

pub use bassline::{
    BasslineAnalysis, BasslineConfig, BasslineTranscriber, OnsetAnchoredAnalysis, StageTrace,
};
pub use drums::{quantize_onsets, Band, BandAnalysis, DrumAnalysis, DrumConfig, DrumTranscriber};
pub use runs::{expand_runs, group_runs, pitched_runs, Run};

/// A transcribed note: onset and offset in seconds and a MIDI value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    pub onset: f32,
    pub offset: f32,
    pub midi: f32,
}

impl NoteEvent {
    pub fn duration(&self) -> f32 {
        self.offset - self.onset
    }
}

/// Time-span form of a pitch run, carried through the bassline stages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Track {
    /// Start time in seconds
    pub start: f32,
    /// End time in seconds
    pub end: f32,
    pub midi: f32,
}

impl Track {
    pub fn new(start: f32, end: f32, midi: f32) -> Self {
        Self { start, end, midi }
    }

    /// Span of `run` using frame times `index * hop_size / sample_rate`.
    pub fn from_run(run: &Run, hop_size: usize, sample_rate: u32) -> Self {
        use crate::convert::frame_to_time;
        Self {
            start: frame_to_time(run.start_index, sample_rate, hop_size),
            end: frame_to_time(run.end_index, sample_rate, hop_size),
            midi: run.midi as f32,
        }
    }

    pub fn duration(&self) -> f32 {
        self.end - self.start
    }
}
