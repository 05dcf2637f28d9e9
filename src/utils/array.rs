use std::cmp::Ordering;

/// Scale a slice by its maximum so the largest value becomes 1.
///
/// A slice whose maximum is not positive is returned unchanged.
pub fn normalize_max(x: &[f32]) -> Vec<f32> {
    let max = x.iter().copied().fold(0.0f32, f32::max);
    if max > 0.0 {
        x.iter().map(|v| v / max).collect()
    } else {
        x.to_vec()
    }
}

/// Arithmetic mean, 0 for an empty slice.
pub fn mean(x: &[f32]) -> f32 {
    if x.is_empty() {
        0.0
    } else {
        x.iter().sum::<f32>() / x.len() as f32
    }
}

/// Median of a slice; the mean of the two middle values for even lengths.
///
/// Returns `None` for an empty slice.
///
/// # Example
/// ```
/// use groovescribe::utils::median;
///
/// assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
/// assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
/// assert_eq!(median(&[]), None);
/// ```
pub fn median(x: &[f32]) -> Option<f32> {
    if x.is_empty() {
        return None;
    }
    let mut sorted = x.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some(0.5 * (sorted[mid - 1] + sorted[mid]))
    } else {
        Some(sorted[mid])
    }
}

/// Index of the value in `sorted` closest to `value`.
///
/// Ties resolve to the lower index, so on an ascending slice the earlier
/// (smaller) value wins. Returns `None` for an empty slice.
///
/// # Example
/// ```
/// use groovescribe::utils::nearest_index;
///
/// assert_eq!(nearest_index(&[0.0, 1.0, 2.0, 3.0], 1.2), Some(1));
/// assert_eq!(nearest_index(&[0.0, 1.0], 0.5), Some(0));
/// ```
pub fn nearest_index(sorted: &[f32], value: f32) -> Option<usize> {
    if sorted.is_empty() {
        return None;
    }
    let pos = sorted.partition_point(|&v| v < value);
    if pos == 0 {
        return Some(0);
    }
    if pos == sorted.len() {
        return Some(sorted.len() - 1);
    }
    let below = value - sorted[pos - 1];
    let above = sorted[pos] - value;
    if above < below {
        Some(pos)
    } else {
        Some(pos - 1)
    }
}

/// Find local maxima in a signal.
///
/// The edges count as maxima when they strictly exceed their single
/// neighbour; a plateau reports its first sample.
pub fn localmax(x: &[f32]) -> Vec<usize> {
    let n = x.len();
    let mut peaks = Vec::new();
    if n == 0 {
        return peaks;
    }
    if n == 1 {
        peaks.push(0);
        return peaks;
    }
    for i in 0..n {
        let is_peak = if i == 0 {
            x[0] > x[1]
        } else if i + 1 == n {
            x[i] > x[i - 1]
        } else {
            x[i] > x[i - 1] && x[i] >= x[i + 1]
        };
        if is_peak {
            peaks.push(i);
        }
    }
    peaks
}

/// Sort ascending and drop exact duplicates and NaNs.
pub fn sort_dedup(values: &mut Vec<f32>) {
    values.retain(|v| !v.is_nan());
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    values.dedup();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_max() {
        assert_eq!(normalize_max(&[1.0, 2.0, 4.0]), vec![0.25, 0.5, 1.0]);
        assert_eq!(normalize_max(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_nearest_ties_lower() {
        let grid = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(nearest_index(&grid, 1.5), Some(1));
        assert_eq!(nearest_index(&grid, 1.51), Some(2));
        assert_eq!(nearest_index(&grid, -4.0), Some(0));
        assert_eq!(nearest_index(&grid, 10.0), Some(3));
        assert_eq!(nearest_index(&[], 1.0), None);
    }

    #[test]
    fn test_localmax_edges_and_plateau() {
        assert_eq!(localmax(&[3.0, 1.0, 2.0, 2.0, 0.0]), vec![0, 2]);
        assert_eq!(localmax(&[0.0, 0.0, 0.0]), Vec::<usize>::new());
        assert_eq!(localmax(&[1.0]), vec![0]);
    }

    #[test]
    fn test_median_odd_even() {
        assert_eq!(median(&[5.0]), Some(5.0));
        assert_eq!(median(&[60.0, 0.0, 60.0, 62.0]), Some(60.0));
    }

    #[test]
    fn test_sort_dedup() {
        let mut v = vec![2.0, 1.0, f32::NAN, 2.0, 0.5];
        sort_dedup(&mut v);
        assert_eq!(v, vec![0.5, 1.0, 2.0]);
    }
}
