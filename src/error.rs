//! Error types for the media cache
//!
//! Provides unified error handling using thiserror. Degraded conditions
//! (missing paths, failed preloads, malformed size tokens) are never errors;
//! these variants cover storage, replay and request validation only.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Media Error Enum ==
/// Unified error type for the media cache.
#[derive(Error, Debug)]
pub enum MediaError {
    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Requested item does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Durable store could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// Persisted data could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote replay of an offline operation failed
    #[error("Sync failed: {0}")]
    Sync(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for MediaError {
    fn from(err: std::io::Error) -> Self {
        MediaError::Storage(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for MediaError {
    fn into_response(self) -> Response {
        let status = match &self {
            MediaError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            MediaError::NotFound(_) => StatusCode::NOT_FOUND,
            MediaError::Sync(_) => StatusCode::BAD_GATEWAY,
            MediaError::Storage(_) | MediaError::Serialization(_) | MediaError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the media cache.
pub type Result<T> = std::result::Result<T, MediaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (MediaError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (MediaError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (MediaError::Sync("x".into()), StatusCode::BAD_GATEWAY),
            (MediaError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_io_error_becomes_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: MediaError = io.into();
        assert!(matches!(err, MediaError::Storage(msg) if msg.contains("denied")));
    }
}
