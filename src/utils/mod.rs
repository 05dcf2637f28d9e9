mod array;

// Array operations: normalize, median, localmax, nearest lookup
pub use array::{localmax, mean, median, nearest_index, normalize_max, sort_dedup};
