//! HTTP Handlers

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::{ConnectInfo, State};
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::{SecondsFormat, Utc};
use kernel::error::app_error::ceil_secs;
use platform::client::{client_label, extract_client_ip};
use platform::cookie::{delete_cookie_header, extract_cookie, set_cookie_header};
use platform::resilience::QueueStatus;

use crate::application::config::AuthConfig;
use crate::application::{LoginInput, LoginOutcome, LoginService, SessionService};
use crate::domain::repository::{SessionRepository, UserRepository};
use crate::error::{AuthError, AuthResult, INVALID_CREDENTIALS_MESSAGE};
use crate::presentation::dto::{
    AuthStatusResponse, CircuitBreakerStatus, LoginFailureResponse, LoginRequest,
    LoginSuccessResponse, SessionStatusResponse, UserResponse,
};

/// Shared state for auth handlers
pub struct AuthAppState<U, S> {
    pub login: LoginService<U>,
    pub sessions: SessionService<S>,
    pub config: Arc<AuthConfig>,
}

impl<U, S> Clone for AuthAppState<U, S> {
    fn clone(&self) -> Self {
        Self {
            login: self.login.clone(),
            sessions: self.sessions.clone(),
            config: self.config.clone(),
        }
    }
}

// ============================================================================
// Login
// ============================================================================

/// POST /api/login
pub async fn login<U, S>(
    State(state): State<AuthAppState<U, S>>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response
where
    U: UserRepository + Send + Sync + 'static,
    S: SessionRepository + Send + Sync + 'static,
{
    let started = Instant::now();
    let client_ip = extract_client_ip(&headers, Some(addr.ip()));

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "Malformed login body");
            return login_failure(
                StatusCode::BAD_REQUEST,
                "Malformed request body",
                None,
                state.login.queue_status(),
            );
        }
    };

    let input = LoginInput {
        user_name: request.username.unwrap_or_default(),
        password: request.password.unwrap_or_default(),
    };

    let user = match state.login.authenticate(input).await {
        Ok(LoginOutcome::Authenticated(user)) => user,
        Ok(LoginOutcome::Rejected) => {
            tracing::info!(client = %client_label(client_ip), "Login failed: invalid credentials");
            return login_failure(
                StatusCode::UNAUTHORIZED,
                INVALID_CREDENTIALS_MESSAGE,
                None,
                state.login.queue_status(),
            );
        }
        Err(e) => return login_error(e, state.login.queue_status()),
    };

    let issued = match state.sessions.issue(&user, client_ip).await {
        Ok(issued) => issued,
        Err(e) => return login_error(e, state.login.queue_status()),
    };

    let login_duration = started.elapsed().as_millis() as u64;
    tracing::info!(
        user_id = %user.user_id,
        client = %client_label(client_ip),
        login_duration_ms = login_duration,
        "Login succeeded"
    );

    let body = LoginSuccessResponse {
        success: true,
        user: UserResponse::from(&user),
        login_duration,
        queue_status: state.login.queue_status(),
    };

    let mut response = (StatusCode::OK, Json(body)).into_response();
    if let Some(cookie) = set_cookie_header(&state.config.cookie(), &issued.token) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

fn login_failure(
    status: StatusCode,
    message: &'static str,
    retry_after: Option<u64>,
    queue_status: QueueStatus,
) -> Response {
    let body = LoginFailureResponse {
        success: false,
        message,
        retry_after,
        queue_status,
    };
    let mut response = (status, Json(body)).into_response();
    if let Some(secs) = retry_after {
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(secs));
    }
    response
}

fn login_error(err: AuthError, queue_status: QueueStatus) -> Response {
    err.log();
    login_failure(
        err.status_code(),
        err.public_message(),
        err.retry_after().map(ceil_secs),
        queue_status,
    )
}

// ============================================================================
// Logout
// ============================================================================

/// POST /api/logout
///
/// Always 204 and always clears the cookie.
pub async fn logout<U, S>(State(state): State<AuthAppState<U, S>>, headers: HeaderMap) -> Response
where
    U: UserRepository + Send + Sync + 'static,
    S: SessionRepository + Send + Sync + 'static,
{
    let cookie_config = state.config.cookie();
    let token = extract_cookie(&headers, &cookie_config.name);

    if let Err(e) = state.sessions.sign_out(token.as_deref()).await {
        tracing::warn!(error = %e, "Session revocation failed, clearing cookie anyway");
    }

    let mut response = StatusCode::NO_CONTENT.into_response();
    if let Some(cookie) = delete_cookie_header(&cookie_config) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

// ============================================================================
// Status
// ============================================================================

/// GET /api/auth/status
pub async fn auth_status<U, S>(State(state): State<AuthAppState<U, S>>) -> Json<AuthStatusResponse>
where
    U: UserRepository + Send + Sync + 'static,
    S: SessionRepository + Send + Sync + 'static,
{
    Json(AuthStatusResponse {
        circuit_breaker: CircuitBreakerStatus {
            state: state.login.breaker_state(),
            metrics: state.login.breaker_metrics(),
        },
        queue: state.login.queue_status(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

// ============================================================================
// Session
// ============================================================================

/// GET /api/auth/session
pub async fn session_status<U, S>(
    State(state): State<AuthAppState<U, S>>,
    headers: HeaderMap,
) -> AuthResult<Json<SessionStatusResponse>>
where
    U: UserRepository + Send + Sync + 'static,
    S: SessionRepository + Send + Sync + 'static,
{
    let Some(token) = extract_cookie(&headers, &state.config.session_cookie_name) else {
        return Ok(Json(SessionStatusResponse::anonymous()));
    };

    match state.sessions.check(&token).await {
        Ok(session) => Ok(Json(SessionStatusResponse {
            authenticated: true,
            username: Some(session.user_name.original().to_string()),
            expires_at: Some(session.expires_at),
        })),
        Err(AuthError::SessionInvalid) => Ok(Json(SessionStatusResponse::anonymous())),
        Err(e) => Err(e),
    }
}
