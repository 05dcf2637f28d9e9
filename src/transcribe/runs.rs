//! Run-length segmentation of quantized MIDI sequences.

/// A maximal span of frames sharing one quantized MIDI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    /// First frame of the run
    pub start_index: usize,
    /// Last frame of the run (inclusive)
    pub end_index: usize,
    pub midi: i32,
}

impl Run {
    /// Number of frames in the run.
    pub fn len(&self) -> usize {
        (self.end_index + 1).saturating_sub(self.start_index)
    }

    /// True only for a hand-built run whose end precedes its start.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_pitched(&self) -> bool {
        self.midi > 0
    }

    /// The run's frames of a per-frame sequence, e.g. unquantized MIDI.
    pub fn slice<'a, T>(&self, values: &'a [T]) -> &'a [T] {
        let end = (self.end_index + 1).min(values.len());
        &values[self.start_index.min(end)..end]
    }
}

/// Group consecutive equal values into runs, unvoiced ones included.
///
/// # Example
/// ```
/// use groovescribe::transcribe::{group_runs, Run};
///
/// let runs = group_runs(&[0, 60, 60, 0]);
/// assert_eq!(runs.len(), 3);
/// assert_eq!(runs[1], Run { start_index: 1, end_index: 2, midi: 60 });
/// ```
pub fn group_runs(midi: &[i32]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for (i, &m) in midi.iter().enumerate() {
        match runs.last_mut() {
            Some(run) if run.midi == m => run.end_index = i,
            _ => runs.push(Run {
                start_index: i,
                end_index: i,
                midi: m,
            }),
        }
    }
    runs
}

/// Flatten runs back into the per-frame sequence.
pub fn expand_runs(runs: &[Run]) -> Vec<i32> {
    runs.iter()
        .flat_map(|run| std::iter::repeat(run.midi).take(run.len()))
        .collect()
}

/// Pitched runs (MIDI > 0) at least `min_frames` frames long.
pub fn pitched_runs(midi: &[i32], min_frames: usize) -> Vec<Run> {
    group_runs(midi)
        .into_iter()
        .filter(|run| run.is_pitched() && run.len() >= min_frames)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitched_runs_drop_unvoiced() {
        let runs = pitched_runs(&[0, 0, 60, 60, 60, 0, 62, 62], 1);
        assert_eq!(
            runs,
            vec![
                Run { start_index: 2, end_index: 4, midi: 60 },
                Run { start_index: 6, end_index: 7, midi: 62 },
            ]
        );
    }

    #[test]
    fn test_min_frames() {
        let runs = pitched_runs(&[40, 41, 41, 41, 42, 42], 3);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].midi, 41);
    }

    #[test]
    fn test_expand_inverse() {
        let midi = vec![0, 3, 3, 0, 0, 7];
        assert_eq!(expand_runs(&group_runs(&midi)), midi);
        assert!(group_runs(&[]).is_empty());
    }

    #[test]
    fn test_slice() {
        let run = Run { start_index: 1, end_index: 2, midi: 45 };
        assert_eq!(run.slice(&[44.9, 45.1, 44.8, 50.0]), &[45.1, 44.8]);
        assert!(run.slice::<f32>(&[]).is_empty());
    }

    #[test]
    fn test_len_and_empty() {
        let run = Run { start_index: 4, end_index: 4, midi: 45 };
        assert_eq!(run.len(), 1);
        assert!(!run.is_empty());
        let inverted = Run { start_index: 5, end_index: 3, midi: 45 };
        assert_eq!(inverted.len(), 0);
        assert!(inverted.is_empty());
        assert!(expand_runs(&[inverted]).is_empty());
    }
}
