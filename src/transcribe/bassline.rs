//! Bassline transcription: pitch contour to grid-aligned notes.
//!
//! The pipeline runs in fixed stages, each a pure function over
//! [`Track`]s so it can be inspected or reused on its own:
//!
//! 1. quantized pitch runs to tracks
//! 2. drop tracks not anchored to an onset ([`filter_tracks_near_onsets`])
//! 3. split tracks at interior onsets ([`split_at_onsets`])
//! 4. drop tracks shorter than a frame budget ([`remove_short_tracks`])
//! 5. snap boundaries to the beat grid ([`snap_to_grid`])
//! 6. emit [`NoteEvent`]s sorted by onset

use super::runs::{pitched_runs, Run};
use super::{NoteEvent, Track};
use crate::beat::{BeatSequence, BeatSource};
use crate::convert::frame_to_time;
use crate::grid::{build_grid, Grid};
use crate::onset::{detect_onsets, OnsetConfig, OnsetSet};
use crate::pitch::{Estimator, PitchEstimator, Yin, YinConfig};
use crate::utils::{median, nearest_index, sort_dedup};
use crate::Signal;

/// Bassline transcription parameters.
///
/// # Example
/// ```
/// use groovescribe::beat::BeatSource;
/// use groovescribe::transcribe::BasslineConfig;
///
/// let config = BasslineConfig::new()
///     .with_beats(BeatSource::Fixed(vec![0.0, 0.5, 1.0]))
///     .with_beat_division(2);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BasslineConfig {
    /// Frame-wise pitch estimator feeding the run segmentation
    pub pitch: Estimator,
    pub onset: OnsetConfig,
    pub beats: BeatSource,
    /// Explicit grid; built from the beats when `None`
    pub grid: Option<Grid>,
    pub beat_division: usize,
    pub delete_where_no_onset: bool,
    /// Largest distance between a track start and its nearest onset
    pub onset_to_start_max_secs: f32,
    /// Share of the track that must lie after its onset
    pub post_onset_fraction: f32,
    pub split_where_onset: bool,
    pub delete_short_tracks: bool,
    pub min_frames_of_track: usize,
    pub snap_grid: bool,
    pub snap_beginning: bool,
    pub snap_end: bool,
    /// Estimator for the onset-anchored path
    pub yin: YinConfig,
}

impl BasslineConfig {
    pub fn new() -> Self {
        Self {
            pitch: Estimator::default(),
            onset: OnsetConfig::new(),
            beats: BeatSource::default(),
            grid: None,
            beat_division: 4,
            delete_where_no_onset: true,
            onset_to_start_max_secs: 0.1,
            post_onset_fraction: 0.8,
            split_where_onset: true,
            delete_short_tracks: true,
            min_frames_of_track: 1,
            snap_grid: true,
            snap_beginning: true,
            snap_end: true,
            yin: YinConfig::new(),
        }
    }

    pub fn with_pitch(mut self, pitch: Estimator) -> Self {
        self.pitch = pitch;
        self
    }

    pub fn with_onset(mut self, onset: OnsetConfig) -> Self {
        self.onset = onset;
        self
    }

    pub fn with_beats(mut self, beats: BeatSource) -> Self {
        self.beats = beats;
        self
    }

    pub fn with_grid(mut self, grid: Grid) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn with_beat_division(mut self, beat_division: usize) -> Self {
        self.beat_division = beat_division;
        self
    }

    pub fn with_onset_filter(mut self, enabled: bool, max_secs: f32, post_fraction: f32) -> Self {
        self.delete_where_no_onset = enabled;
        self.onset_to_start_max_secs = max_secs;
        self.post_onset_fraction = post_fraction;
        self
    }

    pub fn with_split_where_onset(mut self, enabled: bool) -> Self {
        self.split_where_onset = enabled;
        self
    }

    pub fn with_short_track_filter(mut self, enabled: bool, min_frames: usize) -> Self {
        self.delete_short_tracks = enabled;
        self.min_frames_of_track = min_frames;
        self
    }

    pub fn with_snap(mut self, snap_grid: bool, snap_beginning: bool, snap_end: bool) -> Self {
        self.snap_grid = snap_grid;
        self.snap_beginning = snap_beginning;
        self.snap_end = snap_end;
        self
    }

    pub fn with_yin(mut self, yin: YinConfig) -> Self {
        self.yin = yin;
        self
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.pitch.validate()?;
        self.onset.validate()?;
        self.beats.validate()?;
        self.yin.validate()?;
        if self.beat_division == 0 {
            return Err(crate::Error::InvalidSize {
                name: "beat_division",
                value: 0,
                reason: "must be >= 1",
            });
        }
        if !(self.onset_to_start_max_secs >= 0.0) {
            return Err(crate::Error::invalid(
                "onset_to_start_max_secs",
                self.onset_to_start_max_secs,
                "must be >= 0",
            ));
        }
        if !(0.0..=1.0).contains(&self.post_onset_fraction) {
            return Err(crate::Error::invalid(
                "post_onset_fraction",
                self.post_onset_fraction,
                "must be in [0, 1]",
            ));
        }
        Ok(())
    }
}

impl Default for BasslineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Track list after each pipeline stage. Disabled stages repeat their input.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StageTrace {
    pub runs: Vec<Track>,
    pub near_onsets: Vec<Track>,
    pub split: Vec<Track>,
    pub length_filtered: Vec<Track>,
    pub snapped: Vec<Track>,
}

/// Result of [`BasslineTranscriber::transcribe`].
#[derive(Debug, Clone, PartialEq)]
pub struct BasslineAnalysis {
    pub notes: Vec<NoteEvent>,
    pub frame_times: Vec<f32>,
    pub quantized_midi: Vec<f32>,
    pub unquantized_midi: Vec<f32>,
    /// Pitched runs of the quantized contour
    pub runs: Vec<Run>,
    pub onsets: OnsetSet,
    pub beats: BeatSequence,
    pub grid: Grid,
    pub stages: StageTrace,
}

impl BasslineAnalysis {
    /// Unquantized MIDI contour of every pitched run.
    pub fn run_contours(&self) -> Vec<&[f32]> {
        self.runs
            .iter()
            .map(|run| run.slice(&self.unquantized_midi))
            .collect()
    }

    /// Sorted distinct MIDI values among the notes.
    pub fn distinct_pitches(&self) -> Vec<f32> {
        let mut pitches: Vec<f32> = self.notes.iter().map(|n| n.midi).collect();
        sort_dedup(&mut pitches);
        pitches
    }
}

/// Result of [`BasslineTranscriber::onsets_with_pitch`].
#[derive(Debug, Clone, PartialEq)]
pub struct OnsetAnchoredAnalysis {
    pub notes: Vec<NoteEvent>,
    pub frame_times: Vec<f32>,
    pub quantized_midi: Vec<f32>,
    pub onsets: OnsetSet,
    pub beats: BeatSequence,
    pub grid: Grid,
}

/// Transcribes a (harmonic) signal into bassline notes.
pub struct BasslineTranscriber {
    config: BasslineConfig,
    estimator: Box<dyn PitchEstimator + Send + Sync>,
    yin: Yin,
}

impl std::fmt::Debug for BasslineTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasslineTranscriber")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BasslineTranscriber {
    pub fn new(config: BasslineConfig) -> crate::Result<Self> {
        config.validate()?;
        let estimator = config.pitch.build()?;
        let yin = Yin::new(config.yin.clone())?;
        Ok(Self {
            config,
            estimator,
            yin,
        })
    }

    pub fn config(&self) -> &BasslineConfig {
        &self.config
    }

    fn beats_and_grid(&self, signal: &Signal) -> crate::Result<(BeatSequence, Grid)> {
        let beats = self.config.beats.beats(signal)?;
        let grid = match &self.config.grid {
            Some(grid) => grid.clone(),
            None => build_grid(beats.as_slice(), self.config.beat_division),
        };
        if beats.is_empty() {
            log::warn!("bassline: no beats found");
        }
        if grid.is_empty() {
            log::warn!("bassline: grid unavailable, notes keep their raw timing");
        }
        Ok((beats, grid))
    }

    /// Run the full run-segmentation pipeline.
    ///
    /// # Errors
    /// Only configuration errors surface here; an empty or silent signal
    /// yields an analysis without notes.
    pub fn transcribe(&self, signal: &Signal) -> crate::Result<BasslineAnalysis> {
        let cfg = &self.config;
        let track = self.estimator.track(signal)?;
        let frame_times = track.times();
        let quantized_midi = track.to_midi(true);
        let unquantized_midi = track.to_midi(false);
        let runs = pitched_runs(&track.to_midi_numbers(), 1);

        let onsets = detect_onsets(signal, &cfg.onset)?;
        let (beats, grid) = self.beats_and_grid(signal)?;

        let hop = self.estimator.hop_size();
        let sr = signal.sample_rate();
        let mut stages = StageTrace {
            runs: runs.iter().map(|run| Track::from_run(run, hop, sr)).collect(),
            ..StageTrace::default()
        };
        log::debug!(
            "bassline: {} frames, {} runs, {} onsets",
            frame_times.len(),
            runs.len(),
            onsets.len()
        );

        stages.near_onsets = if cfg.delete_where_no_onset {
            filter_tracks_near_onsets(
                &stages.runs,
                &onsets,
                cfg.onset_to_start_max_secs,
                cfg.post_onset_fraction,
            )
        } else {
            stages.runs.clone()
        };
        stages.split = if cfg.split_where_onset {
            split_at_onsets(&stages.near_onsets, &onsets)
        } else {
            stages.near_onsets.clone()
        };
        stages.length_filtered = if cfg.delete_short_tracks {
            remove_short_tracks(&stages.split, cfg.min_frames_of_track, hop, sr)
        } else {
            stages.split.clone()
        };
        stages.snapped = if cfg.snap_grid {
            snap_to_grid(&stages.length_filtered, &grid, cfg.snap_beginning, cfg.snap_end)
        } else {
            stages.length_filtered.clone()
        };
        log::debug!(
            "bassline: tracks {} -> {} near onsets -> {} split -> {} long enough",
            stages.runs.len(),
            stages.near_onsets.len(),
            stages.split.len(),
            stages.length_filtered.len()
        );

        let notes = to_note_events(&stages.snapped);
        Ok(BasslineAnalysis {
            notes,
            frame_times,
            quantized_midi,
            unquantized_midi,
            runs,
            onsets,
            beats,
            grid,
            stages,
        })
    }

    /// Onset-anchored alternative: one note per onset, pitched by the
    /// median quantized YIN MIDI between it and the next onset.
    ///
    /// An onset with no pitch frame before the next one yields no note.
    pub fn onsets_with_pitch(&self, signal: &Signal) -> crate::Result<OnsetAnchoredAnalysis> {
        let track = self.yin.track(signal)?;
        let frame_times = track.times();
        let quantized_midi = track.to_midi(true);
        let onsets = detect_onsets(signal, &self.config.onset)?;
        let (beats, grid) = self.beats_and_grid(signal)?;

        let notes = notes_between_onsets(
            &onsets,
            &quantized_midi,
            self.yin.hop_size(),
            signal.sample_rate(),
        );
        log::debug!(
            "bassline: {} onset-anchored notes from {} onsets",
            notes.len(),
            onsets.len()
        );
        Ok(OnsetAnchoredAnalysis {
            notes,
            frame_times,
            quantized_midi,
            onsets,
            beats,
            grid,
        })
    }
}

/// First frame index at or after `time`.
fn first_frame_at(time: f32, hop_size: usize, sample_rate: u32) -> usize {
    let position = frame_position(time, hop_size, sample_rate) - FRAME_TOLERANCE;
    position.ceil().max(0.0) as usize
}

/// One note per onset over the per-frame `midi` contour, windowed in frame
/// indices. Onsets whose window holds no frame are skipped.
fn notes_between_onsets(
    onsets: &[f32],
    midi: &[f32],
    hop_size: usize,
    sample_rate: u32,
) -> Vec<NoteEvent> {
    let Some(last_frame) = midi.len().checked_sub(1) else {
        return Vec::new();
    };
    let last_time = frame_to_time(last_frame, sample_rate, hop_size);
    let mut sorted = onsets.to_vec();
    sort_dedup(&mut sorted);

    let mut notes = Vec::new();
    for (i, &onset) in sorted.iter().enumerate() {
        let begin = first_frame_at(onset, hop_size, sample_rate);
        if begin > last_frame {
            break;
        }
        let offset = sorted.get(i + 1).copied().unwrap_or(last_time);
        let end = first_frame_at(offset, hop_size, sample_rate).min(last_frame);
        match midi.get(begin..end).and_then(median) {
            Some(pitch) => notes.push(NoteEvent {
                onset,
                offset,
                midi: pitch,
            }),
            None => log::debug!("bassline: onset at {onset:.3}s has no pitch frames, skipped"),
        }
    }
    notes
}

/// Keep tracks that begin close to an onset and mostly sound after it.
///
/// With `n` the onset nearest to a track's start (ties toward the earlier
/// onset), the track survives iff `|n - start| < max_secs` and
/// `|end - n| - |n - start| > post_fraction * (end - start)`.
/// Without onsets no track survives.
///
/// # Example
/// ```
/// use groovescribe::transcribe::bassline::filter_tracks_near_onsets;
/// use groovescribe::transcribe::Track;
///
/// let tracks = [Track::new(1.02, 1.5, 40.0), Track::new(2.0, 2.5, 42.0)];
/// let kept = filter_tracks_near_onsets(&tracks, &[1.0], 0.1, 0.8);
/// assert_eq!(kept, vec![tracks[0]]);
/// ```
pub fn filter_tracks_near_onsets(
    tracks: &[Track],
    onsets: &[f32],
    max_secs: f32,
    post_fraction: f32,
) -> Vec<Track> {
    let mut sorted = onsets.to_vec();
    sort_dedup(&mut sorted);
    tracks
        .iter()
        .filter(|track| {
            let Some(i) = nearest_index(&sorted, track.start) else {
                return false;
            };
            let n = sorted[i];
            let lead = (n - track.start).abs();
            lead < max_secs && (track.end - n).abs() - lead > post_fraction * track.duration()
        })
        .copied()
        .collect()
}

/// Split tracks at the onsets strictly inside them.
///
/// Zero-length tracks pass through unchanged.
pub fn split_at_onsets(tracks: &[Track], onsets: &[f32]) -> Vec<Track> {
    let mut out = Vec::with_capacity(tracks.len());
    for track in tracks {
        if track.start == track.end {
            out.push(*track);
            continue;
        }
        let mut bounds = vec![track.start, track.end];
        bounds.extend(
            onsets
                .iter()
                .copied()
                .filter(|&o| o > track.start && o < track.end),
        );
        sort_dedup(&mut bounds);
        out.extend(
            bounds
                .windows(2)
                .map(|pair| Track::new(pair[0], pair[1], track.midi)),
        );
    }
    out
}

/// Slack, in frames, absorbing rounding of frame times back to positions.
const FRAME_TOLERANCE: f64 = 1e-2;

/// Position of `time` in frames of `hop_size` samples.
fn frame_position(time: f32, hop_size: usize, sample_rate: u32) -> f64 {
    f64::from(time) * f64::from(sample_rate) / hop_size as f64
}

/// Keep tracks spanning more than `min_frames` hops.
///
/// The span is measured in frames, so a track exactly `min_frames` hops
/// long is dropped wherever it starts.
pub fn remove_short_tracks(
    tracks: &[Track],
    min_frames: usize,
    hop_size: usize,
    sample_rate: u32,
) -> Vec<Track> {
    let limit = min_frames as f64 + FRAME_TOLERANCE;
    tracks
        .iter()
        .filter(|track| frame_position(track.duration(), hop_size, sample_rate) > limit)
        .copied()
        .collect()
}

/// Move track boundaries to their nearest grid markers.
///
/// An empty grid leaves the tracks untouched.
pub fn snap_to_grid(
    tracks: &[Track],
    grid: &Grid,
    snap_beginning: bool,
    snap_end: bool,
) -> Vec<Track> {
    if grid.is_empty() {
        log::warn!("bassline: snapping skipped, empty grid");
        return tracks.to_vec();
    }
    tracks
        .iter()
        .map(|track| Track {
            start: if snap_beginning { grid.snap(track.start) } else { track.start },
            end: if snap_end { grid.snap(track.end) } else { track.end },
            midi: track.midi,
        })
        .collect()
}

/// Note events sorted by onset. A track whose snapped start overtook its
/// end becomes a zero-length note.
pub fn to_note_events(tracks: &[Track]) -> Vec<NoteEvent> {
    let mut notes: Vec<NoteEvent> = tracks
        .iter()
        .map(|track| NoteEvent {
            onset: track.start,
            offset: track.end.max(track.start),
            midi: track.midi,
        })
        .collect();
    notes.sort_by(|a, b| a.onset.total_cmp(&b.onset));
    notes
}
