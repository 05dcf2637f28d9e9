//! Onset detection: per-frame spectral novelty followed by adaptive
//! peak picking.

pub mod detect;
pub mod novelty;

pub use detect::{detect_onsets, select_onsets, OnsetConfig, OnsetDetector, OnsetSet};
pub use novelty::{novelty_curve, OnsetMethod};
