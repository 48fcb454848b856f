//! Error types for the cache
//!
//! Provides unified error handling using thiserror. The infallible engine
//! surface never returns these; they come out of `lookup`, `try_set` and the
//! HTTP handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Storage Error Enum ==
/// Failures reported by a storage adapter.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The medium rejected a write because it is out of space
    #[error("Quota exceeded writing '{key}': requested {requested} bytes, {available} available")]
    QuotaExceeded {
        key: String,
        requested: u64,
        available: u64,
    },

    /// The backing file could not be read or written
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file holds something that is not a key/value map
    #[error("Storage format error: {0}")]
    Format(#[from] serde_json::Error),
}

impl StorageError {
    /// Returns true for capacity failures, which are worth an eviction and retry.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StorageError::QuotaExceeded { .. })
    }
}

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in cache (absent or expired)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Stored bytes for a key failed to parse
    #[error("Corrupted entry '{key}': {source}")]
    Corrupted {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The storage medium failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A value could not be encoded
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration rejected at startup
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Storage(e) if e.is_quota_exceeded() => StatusCode::INSUFFICIENT_STORAGE,
            CacheError::Corrupted { .. }
            | CacheError::Storage(_)
            | CacheError::Serialization(_)
            | CacheError::Config(_)
            | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_exceeded_is_detected() {
        let err = StorageError::QuotaExceeded {
            key: "k".to_string(),
            requested: 10,
            available: 2,
        };
        assert!(err.is_quota_exceeded());
        assert!(err.to_string().contains("requested 10 bytes"));
    }

    #[test]
    fn test_io_error_is_not_quota() {
        let err = StorageError::Io(std::io::Error::other("disk gone"));
        assert!(!err.is_quota_exceeded());
    }

    #[test]
    fn test_error_status_codes() {
        let test_cases = vec![
            (CacheError::NotFound("key".to_string()), StatusCode::NOT_FOUND),
            (
                CacheError::InvalidRequest("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                CacheError::Internal("error".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CacheError::Storage(StorageError::QuotaExceeded {
                    key: "k".to_string(),
                    requested: 1,
                    available: 0,
                }),
                StatusCode::INSUFFICIENT_STORAGE,
            ),
        ];

        for (error, expected_status) in test_cases {
            let response = error.into_response();
            assert_eq!(response.status(), expected_status);
        }
    }
}
