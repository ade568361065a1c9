//! Auth Router

use axum::{
    Router,
    routing::{get, post},
};

use crate::domain::repository::{SessionRepository, UserRepository};
use crate::presentation::handlers::{self, AuthAppState};

/// Create the auth router. Mount it under `/api` and serve it with
/// `into_make_service_with_connect_info::<SocketAddr>()`; login reads the peer address.
pub fn auth_router<U, S>(state: AuthAppState<U, S>) -> Router
where
    U: UserRepository + Send + Sync + 'static,
    S: SessionRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/login", post(handlers::login::<U, S>))
        .route("/logout", post(handlers::logout::<U, S>))
        .route("/auth/status", get(handlers::auth_status::<U, S>))
        .route("/auth/session", get(handlers::session_status::<U, S>))
        .with_state(state)
}
