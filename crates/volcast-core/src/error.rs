//! Error types for volcast-rs core data.

use thiserror::Error;

/// The main error type for core data operations.
#[derive(Error, Debug)]
pub enum VolcastError {
    /// Scalar buffer length does not match the declared extents.
    #[error("data size mismatch: expected {expected} elements, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// A scalar range that is not finite or has `lo >= hi`.
    #[error("invalid scalar range [{0}, {1}]")]
    InvalidRange(f64, f64),

    /// Component count outside the supported set (1 or 4).
    #[error("invalid component count {0}: must be 1 or 4")]
    InvalidComponentCount(u32),
}

/// A specialized Result type for core data operations.
pub type Result<T> = std::result::Result<T, VolcastError>;
