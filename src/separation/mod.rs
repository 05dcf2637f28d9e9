//! Harmonic/percussive source separation.
//!
//! The transcribers consume separated signals rather than separation
//! internals: any [`SourceSeparator`] can feed them. [`MedianFilterSeparator`]
//! is the built-in median-filtering implementation.

mod hpss;

pub use hpss::MedianFilterSeparator;

use crate::Signal;

/// The two signals produced by a separator, both at the input rate and length.
#[derive(Debug, Clone, PartialEq)]
pub struct Separated {
    /// Sustained, pitched content (bassline input)
    pub harmonic: Signal,
    /// Transient content (drum input)
    pub percussive: Signal,
}

/// Splits one signal into harmonic and percussive parts.
pub trait SourceSeparator {
    fn separate(&self, signal: &Signal) -> crate::Result<Separated>;
}
