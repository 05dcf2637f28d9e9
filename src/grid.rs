//! Beat-subdivision grids used to quantize note boundaries and drum hits.

use crate::beat::Segmentation;
use crate::utils::{nearest_index, sort_dedup};

/// Strictly increasing grid marker times in seconds.
///
/// An empty grid means "no grid available"; snapping against it is a no-op.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Grid {
    markers: Vec<f32>,
}

impl Grid {
    /// Wrap explicit marker times (sorted and deduplicated).
    pub fn new(mut markers: Vec<f32>) -> Self {
        sort_dedup(&mut markers);
        Self { markers }
    }

    /// Grid derived from external bar segmentation.
    pub fn from_segmentation(segmentation: &Segmentation, beat_division: usize) -> Self {
        build_grid(segmentation.beats().as_slice(), beat_division)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.markers
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Spacing of the first two markers, if there are two.
    pub fn resolution(&self) -> Option<f32> {
        match self.markers.as_slice() {
            [a, b, ..] => Some(b - a),
            _ => None,
        }
    }

    /// Index of the marker nearest to `time`; ties go to the lower marker.
    pub fn nearest_index(&self, time: f32) -> Option<usize> {
        nearest_index(&self.markers, time)
    }

    /// Nearest marker time, or `time` unchanged on an empty grid.
    pub fn snap(&self, time: f32) -> f32 {
        self.nearest_index(time)
            .map_or(time, |i| self.markers[i])
    }

    /// Drop markers later than `duration`.
    pub fn truncate_to(mut self, duration: f32) -> Self {
        let keep = self.markers.partition_point(|&t| t <= duration);
        self.markers.truncate(keep);
        self
    }
}

/// Subdivide each inter-beat interval into `beat_division` equal steps.
///
/// Markers are also extrapolated backwards from the first beat (up to two
/// beats' worth, never below zero) at the first interval's resolution. The
/// last beat reuses the resolution of the interval before it. Markers past
/// the last beat are dropped.
///
/// A division below 1 is treated as 1, which returns the beats themselves.
/// Fewer than two beats give an empty grid.
///
/// # Example
/// ```
/// use groovescribe::grid::build_grid;
///
/// let grid = build_grid(&[0.0, 1.0, 2.0], 2);
/// assert_eq!(grid.as_slice(), &[0.0, 0.5, 1.0, 1.5, 2.0]);
/// assert!(build_grid(&[1.0], 4).is_empty());
/// ```
pub fn build_grid(beats: &[f32], beat_division: usize) -> Grid {
    let division = beat_division.max(1);
    if beats.len() <= 1 {
        return Grid::default();
    }
    if division == 1 {
        return Grid::new(beats.to_vec());
    }

    let mut markers = Vec::with_capacity((beats.len() + 2) * division + 1);
    markers.push(beats[0]);

    let first_res = (beats[1] - beats[0]) / division as f32;
    for k in 1..=2 * division {
        let t = beats[0] - k as f32 * first_res;
        if t >= 0.0 {
            markers.push(t);
        }
    }

    let mut res = first_res;
    for (i, &beat) in beats.iter().enumerate() {
        if let Some(&next) = beats.get(i + 1) {
            res = (next - beat) / division as f32;
        }
        markers.extend((0..division).map(|k| beat + k as f32 * res));
    }
    markers.push(beats[beats.len() - 1]);

    let last = beats.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut grid = Grid::new(markers);
    grid.markers.retain(|&t| t <= last);
    grid
}
