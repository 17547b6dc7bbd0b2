//! API error type shared by all vigil-server handlers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;
use vigil_common::api::ErrorBody;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Missing, invalid, or wrong-role credential (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Resource not found, or outside the caller's roster (404)
    #[error("{0}")]
    NotFound(String),

    /// Duplicate registration (409)
    #[error("{0}")]
    Conflict(String),

    /// Storage failure (500); details stay server-side
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Error bubbled up from the shared library
    #[error(transparent)]
    Common(#[from] vigil_common::Error),

    /// Other internal failure (500); details stay server-side
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Database(ref err) => {
                error!("Database error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
            }
            ApiError::Common(err) => {
                use vigil_common::Error;
                match err {
                    Error::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
                    Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
                    Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
                    Error::Conflict(msg) => (StatusCode::CONFLICT, msg),
                    other => {
                        error!("Internal error: {}", other);
                        (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
                    }
                }
            }
            ApiError::Internal(ref msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
            }
        };

        (status, Json(ErrorBody::new(message))).into_response()
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        ApiError::Internal(format!("token signing failed: {err}"))
    }
}

impl From<argon2::password_hash::Error> for ApiError {
    fn from(err: argon2::password_hash::Error) -> Self {
        ApiError::Internal(format!("password hashing failed: {err}"))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(format!("metrics serialization failed: {err}"))
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
