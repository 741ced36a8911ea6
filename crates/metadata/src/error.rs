//! Metadata store error types.

use thiserror::Error;

/// Metadata store error type.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("manifest has {missing} unpopulated chunk indices")]
    MissingChunks { missing: usize },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for metadata operations.
pub type MetadataResult<T> = std::result::Result<T, MetadataError>;
