//! Error types for orthoplus-split
//!
//! Validation, NotFound and Unauthorized are caller-recoverable. Storage
//! errors are passed through unmodified from the repository.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type for split operations
pub type SplitResult<T> = std::result::Result<T, SplitError>;

/// Split-payment error type
#[derive(Debug, Error)]
pub enum SplitError {
    /// Malformed or out-of-policy input (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// No matching configuration or record (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller lacks the role for the operation (403)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Storage rejected a second transaction with the same idempotency key
    #[error("Duplicate transaction for idempotency key {0}")]
    DuplicateTransaction(String),

    /// Storage-layer failure
    #[error(transparent)]
    Storage(#[from] orthoplus_common::Error),
}

impl From<sqlx::Error> for SplitError {
    fn from(err: sqlx::Error) -> Self {
        SplitError::Storage(orthoplus_common::Error::Database(err))
    }
}

impl IntoResponse for SplitError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            SplitError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            SplitError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            SplitError::Unauthorized(_) => (StatusCode::FORBIDDEN, "UNAUTHORIZED"),
            SplitError::DuplicateTransaction(_) => (StatusCode::CONFLICT, "DUPLICATE_TRANSACTION"),
            SplitError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        let cases = [
            (SplitError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (SplitError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (SplitError::Unauthorized("x".into()), StatusCode::FORBIDDEN),
            (
                SplitError::Storage(orthoplus_common::Error::Internal("x".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
