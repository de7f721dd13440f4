//! Identity Error Types
//!
//! This module provides identity-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::cache::CacheError;
use thiserror::Error;

/// Identity-specific result type alias
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Identity-specific error variants
///
/// These map to appropriate HTTP status codes and can be converted to
/// `AppError` for unified error handling. Cache faults are recoverable on
/// the identification path and only surface here when a caller chooses to
/// propagate them (startup checks).
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Signal bundle failed validation
    #[error("invalid signal {field}: {reason}")]
    InvalidSignal {
        field: &'static str,
        reason: &'static str,
    },

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    /// Cache backend unreachable or returned garbage
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(#[from] CacheError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Caller went away before the request completed
    #[error("Request cancelled")]
    Cancelled,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IdentityError {
    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            IdentityError::InvalidSignal { .. } => ErrorKind::BadRequest,
            IdentityError::RateLimited { .. } => ErrorKind::TooManyRequests,
            IdentityError::CacheUnavailable(_) => ErrorKind::ServiceUnavailable,
            IdentityError::Database(_) => ErrorKind::InternalServerError,
            IdentityError::Cancelled => ErrorKind::ClientClosedRequest,
            IdentityError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            IdentityError::Database(e) => {
                tracing::error!(error = %e, "Identity database error");
            }
            IdentityError::Internal(msg) => {
                tracing::error!(message = %msg, "Identity internal error");
            }
            IdentityError::CacheUnavailable(e) => {
                tracing::warn!(error = %e, "Cache unavailable");
            }
            IdentityError::RateLimited { .. } => {
                tracing::warn!("Rate limit exceeded");
            }
            _ => {
                tracing::debug!(error = %self, "Identity error");
            }
        }
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        let kind = err.kind();
        let message = err.to_string();
        AppError::new(kind, message)
    }
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status_code();

        let body = match &self {
            IdentityError::RateLimited { retry_after_secs } => serde_json::json!({
                "error": self.to_string(),
                "retry_after": retry_after_secs,
            }),
            // Server faults get generic text, details stay in the logs
            e if status.is_server_error() => serde_json::json!({
                "error": match e {
                    IdentityError::Database(_) => "Failed to identify visitor",
                    _ => "Internal server error",
                },
            }),
            _ => serde_json::json!({
                "error": self.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}
