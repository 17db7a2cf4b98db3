//! HTTP-facing error taxonomy.
//!
//! Every failure inside a handler is converted into one of these variants at
//! the handler boundary and rendered as `{"error": "<message>"}` with the
//! matching status code. Nothing here propagates past the response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

/// Message shared by every failed login, whatever the cause.
pub const INVALID_CREDENTIALS: &str = "Invalid username or password";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed input. No side effects were performed.
    #[error("{0}")]
    BadRequest(String),

    /// Uniqueness violation.
    #[error("{0}")]
    Conflict(String),

    /// Unknown identity or credential mismatch.
    #[error("{0}")]
    Unauthorized(String),

    /// Store, hashing or signing failure.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The single rejection returned for any failed login.
    pub fn invalid_credentials() -> Self {
        Self::Unauthorized(INVALID_CREDENTIALS.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
