//! Auth Error Types
//!
//! Auth-specific error variants that integrate with the unified
//! `kernel::error::AppError` system. Messages sent to the client are
//! generic; the detail stays in the logs.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Message shown for any credential mismatch
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password";

/// Message shown for any dependency-side failure
pub const SERVICE_UNAVAILABLE_MESSAGE: &str =
    "Authentication service temporarily unavailable. Please try again later.";

#[derive(Debug, Error)]
pub enum AuthError {
    /// Username or password missing from the request
    #[error("Username and password are required")]
    MissingCredentials,

    /// The credential-store breaker is open
    #[error("Circuit breaker open (retry after {retry_after:?})")]
    CircuitOpen { retry_after: Duration },

    /// Login queue is at capacity
    #[error("Login queue full ({queue_length} waiting)")]
    Overloaded { queue_length: usize },

    /// Credential check exceeded the operation timeout
    #[error("Credential check timed out after {0:?}")]
    Timeout(Duration),

    /// Login gate closed during shutdown
    #[error("Login service is shutting down")]
    ShuttingDown,

    /// Session cookie missing, forged or expired
    #[error("Session not found or expired")]
    SessionInvalid,

    /// Credential or session store failure
    #[error("Store error: {0}")]
    Store(#[source] AppError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::MissingCredentials => ErrorKind::BadRequest,
            AuthError::SessionInvalid => ErrorKind::Unauthorized,
            AuthError::CircuitOpen { .. }
            | AuthError::Overloaded { .. }
            | AuthError::Timeout(_)
            | AuthError::ShuttingDown
            | AuthError::Store(_)
            | AuthError::Database(_) => ErrorKind::ServiceUnavailable,
            AuthError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Client-facing message
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "Username and password are required",
            AuthError::SessionInvalid => "Not authenticated",
            AuthError::Overloaded { .. } => "Too many pending login requests. Please try again shortly.",
            AuthError::CircuitOpen { .. }
            | AuthError::Timeout(_)
            | AuthError::ShuttingDown
            | AuthError::Store(_)
            | AuthError::Database(_) => SERVICE_UNAVAILABLE_MESSAGE,
            AuthError::Internal(_) => "Internal server error",
        }
    }

    /// Suggested wait before retrying, for 503 responses
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AuthError::CircuitOpen { retry_after } => Some(*retry_after),
            AuthError::Overloaded { .. } | AuthError::Timeout(_) => Some(Duration::from_secs(1)),
            AuthError::ShuttingDown | AuthError::Store(_) | AuthError::Database(_) => {
                Some(Duration::from_secs(5))
            }
            _ => None,
        }
    }

    pub fn to_app_error(&self) -> AppError {
        let err = AppError::new(self.kind(), self.public_message());
        match self.retry_after() {
            Some(retry_after) => err.with_retry_after(retry_after),
            None => err,
        }
    }

    /// Log the error with appropriate level
    pub(crate) fn log(&self) {
        match self {
            AuthError::Store(e) => {
                tracing::error!(error = %e, "Auth store error");
            }
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::CircuitOpen { retry_after } => {
                tracing::warn!(retry_after_ms = retry_after.as_millis() as u64, "Login rejected: circuit open");
            }
            AuthError::Overloaded { queue_length } => {
                tracing::warn!(queue_length, "Login rejected: queue full");
            }
            AuthError::Timeout(after) => {
                tracing::warn!(timeout_ms = after.as_millis() as u64, "Credential check timed out");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for AuthError {
    fn from(err: AppError) -> Self {
        AuthError::Store(err)
    }
}
