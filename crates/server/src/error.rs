//! Coordinator API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use silo_metadata::MetadataError;

/// Coordinator API error type.
///
/// Client-visible bodies are short plain text; internal detail stays in
/// the log.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("not found")]
    NotFound,

    #[error("file is not fully uploaded")]
    Incomplete,

    #[error("upload failed")]
    BadGateway,

    #[error("missing chunk {0}")]
    ChunkUnavailable(u32),

    #[error("{0}")]
    Internal(String),

    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),
}

impl ApiError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Incomplete => StatusCode::BAD_REQUEST,
            Self::BadGateway => StatusCode::BAD_GATEWAY,
            Self::ChunkUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Metadata(MetadataError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Metadata(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            Self::Metadata(MetadataError::NotFound(_)) => "not found\n".to_string(),
            Self::Metadata(e) => {
                tracing::error!(error = %e, "metadata operation failed");
                "metadata failure\n".to_string()
            }
            other => format!("{other}\n"),
        };
        (status, body).into_response()
    }
}

/// Result type for coordinator handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
