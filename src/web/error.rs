//! HTTP error responses.
//!
//! Every failure is rendered as `{"error": "<message>"}` with a matching
//! status. Database and hashing failures are logged and reported as a
//! generic internal error.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::cloud::StorageError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    /// 404
    #[error("{0}")]
    NotFound(String),

    /// 400
    #[error("{0}")]
    BadRequest(String),

    /// 401
    #[error("{0}")]
    Unauthorized(String),

    /// 409
    #[error("{0}")]
    Conflict(String),

    /// 413
    #[error("{0}")]
    PayloadTooLarge(String),

    /// 502. The storage provider failed; details are logged only.
    #[error("upstream storage error: {0}")]
    Upstream(String),

    /// 503
    #[error("{0}")]
    ServiceUnavailable(String),

    /// 500. Message is logged but not returned to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn unauthorized() -> Self {
        Self::Unauthorized("unauthorized".into())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            Self::Internal(_) => {
                tracing::error!(error = %self, "internal server error");
                "An internal error occurred".to_string()
            }
            Self::Upstream(_) => {
                tracing::error!(error = %self, "storage provider error");
                "An upstream storage error occurred".to_string()
            }
            Self::ServiceUnavailable(_) => {
                tracing::warn!(error = %self, "service unavailable");
                self.to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<crate::Error> for AppError {
    fn from(err: crate::Error) -> Self {
        use crate::Error;

        match err {
            Error::NotFound(_) => Self::NotFound(err.to_string()),
            Error::Validation(msg) => Self::BadRequest(msg),
            Error::Conflict(msg) => Self::Conflict(msg),
            Error::CloudNotConfigured => Self::ServiceUnavailable(err.to_string()),
            Error::CloudNotConnected => Self::Conflict(err.to_string()),
            Error::TooLarge { .. } => Self::PayloadTooLarge(err.to_string()),
            Error::Storage(StorageError::NotFound(path)) => {
                Self::NotFound(format!("remote file {path} not found"))
            }
            Error::Storage(e) => Self::Upstream(e.to_string()),
            Error::Database(_) | Error::PasswordHash(_) => Self::Internal(err.to_string()),
        }
    }
}
