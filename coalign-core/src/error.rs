//! Error types for coalign

use thiserror::Error;

/// Main error type for coalign operations
///
/// Degenerate geometry and numerical underflow never surface here; they
/// resolve to safe defaults inside the engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Source and destination lists of a correspondence set differ in length.
    #[error("correspondence length mismatch: {source_len} source points vs {destination_len} destination points")]
    MismatchedCorrespondences {
        source_len: usize,
        destination_len: usize,
    },

    #[error("point set is empty")]
    EmptyPointSet,

    /// Only raised when strict validation was requested by the caller.
    #[error("at least {required} correspondences required, got {provided}")]
    InsufficientCorrespondences {
        required: usize,
        provided: usize,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type alias for coalign operations
pub type Result<T> = std::result::Result<T, Error>;
