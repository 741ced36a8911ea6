//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid chunk id: {0}")]
    InvalidChunkId(String),

    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("invalid chunk size: {size} (must be between 1 and {max})")]
    InvalidChunkSize { size: u64, max: u64 },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
