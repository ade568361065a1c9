//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use platform::resilience::{BreakerMetrics, CircuitState, QueueStatus};
use serde::{Deserialize, Serialize};

use crate::domain::entity::{PreferredLanguage, User};

// ============================================================================
// Login
// ============================================================================

/// Login request
///
/// Both fields are optional at the JSON level so a missing field becomes a
/// 400 from the login use case instead of an extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default, alias = "userName")]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Public profile of the logged-in user
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub preferred_language: PreferredLanguage,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.user_id.to_string(),
            username: user.user_name.original().to_string(),
            display_name: user.display_name.clone(),
            preferred_language: user.preferred_language,
            last_login_at: user.last_login_at,
        }
    }
}

/// 200 response of `POST /api/login`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginSuccessResponse {
    pub success: bool,
    pub user: UserResponse,
    /// Milliseconds from request receipt to response
    pub login_duration: u64,
    pub queue_status: QueueStatus,
}

/// 400 / 401 / 5xx response of `POST /api/login`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginFailureResponse {
    pub success: bool,
    pub message: &'static str,
    /// Seconds; present on 503
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    pub queue_status: QueueStatus,
}

// ============================================================================
// Status
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerStatus {
    pub state: CircuitState,
    pub metrics: BreakerMetrics,
}

/// `GET /api/auth/status`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatusResponse {
    pub circuit_breaker: CircuitBreakerStatus,
    pub queue: QueueStatus,
    /// RFC 3339
    pub timestamp: String,
}

// ============================================================================
// Session
// ============================================================================

/// `GET /api/auth/session`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub authenticated: bool,
    pub username: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionStatusResponse {
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            username: None,
            expires_at: None,
        }
    }
}
