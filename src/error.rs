/// Crate-level error type for the groovescribe transcription library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid parameter value.
    #[error("invalid parameter `{name}`: got {value}, {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// A required dimension is zero or invalid.
    #[error("invalid size for `{name}`: {value} ({reason})")]
    InvalidSize {
        name: &'static str,
        value: usize,
        reason: &'static str,
    },

    /// Frequency range is invalid.
    #[error("invalid frequency range: fmin={fmin}, fmax={fmax} ({reason})")]
    InvalidFrequencyRange {
        fmin: f32,
        fmax: f32,
        reason: String,
    },

    /// Sample rate must be strictly positive.
    #[error("sample rate must be > 0")]
    InvalidSampleRate,

    /// Audio data contains non-finite values (NaN or Inf).
    #[error("audio data contains non-finite values")]
    NonFiniteAudio,

    /// Input array has incorrect shape for the operation.
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    /// Segmentation metadata could not be parsed.
    #[error("invalid segmentation metadata: {0}")]
    Segmentation(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid(name: &'static str, value: impl ToString, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience Result type for groovescribe operations.
pub type Result<T> = std::result::Result<T, Error>;
