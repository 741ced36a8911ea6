//! Node API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Chunk node error type.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("invalid chunk id: {0}")]
    InvalidChunkId(String),

    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("chunk not found")]
    NotFound,

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
}

impl NodeError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidChunkId(_) => StatusCode::BAD_REQUEST,
            Self::HashMismatch { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for NodeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Disk failure detail goes to the log, not to the caller.
        let body = match &self {
            Self::Io(e) => {
                tracing::error!(error = %e, "storage operation failed");
                "storage error\n".to_string()
            }
            other => format!("{other}\n"),
        };
        (status, body).into_response()
    }
}
