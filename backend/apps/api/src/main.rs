//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use auth::domain::repository::SessionRepository;
use auth::{
    AuthAppState, AuthConfig, InMemorySessionRepository, InMemoryUserRepository, LoginService,
    PgUserRepository, SessionService, auth_router,
};
use axum::{
    Json, Router, http,
    http::{Method, header},
    routing::get,
};
use platform::config::{env_list, env_opt, env_parse};
use platform::resilience::{CircuitBreaker, ConcurrencyGate, RetryPolicy, retry_with_backoff};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

const DEFAULT_FRONTEND_ORIGINS: &str = "http://localhost:5173,http://127.0.0.1:5173";
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,auth=info,platform=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Auth configuration; release builds must provide SESSION_SECRET
    let release = !cfg!(debug_assertions);
    let base = if release {
        AuthConfig::default()
    } else {
        AuthConfig::development()
    };
    let config = Arc::new(AuthConfig::from_env(base, release)?);
    let bind_addr: SocketAddr = env_parse("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 31113)))?;

    tracing::info!(
        concurrent_limit = config.gate.concurrent_limit,
        max_queue_depth = ?config.gate.max_queue_depth,
        operation_timeout_ms = ?config.gate.operation_timeout.map(|d| d.as_millis() as u64),
        failure_threshold = config.breaker.failure_threshold,
        reset_timeout_ms = config.breaker.reset_timeout.as_millis() as u64,
        "Login resilience configured"
    );

    // One gate and one breaker for the whole process
    let gate = Arc::new(ConcurrencyGate::new(config.gate.clone()));
    let breaker = Arc::new(CircuitBreaker::new(
        "credential-store",
        config.breaker.clone(),
    ));

    let sessions = SessionService::new(Arc::new(InMemorySessionRepository::new()), config.clone());
    spawn_session_cleanup(sessions.clone(), SESSION_CLEANUP_INTERVAL);

    let auth_routes = match env_opt("DATABASE_URL") {
        Some(database_url) => {
            let pool = retry_with_backoff(&RetryPolicy::default(), "postgres connect", || {
                PgPoolOptions::new()
                    .max_connections(5)
                    .acquire_timeout(Duration::from_secs(5))
                    .connect(&database_url)
            })
            .await?;
            tracing::info!("Connected to database");

            // Run migrations
            sqlx::migrate!("../../../database/migrations")
                .run(&pool)
                .await?;
            tracing::info!("Migrations completed");

            let users = Arc::new(PgUserRepository::new(pool));
            if let Some(demo_users) = env_opt("DEMO_USERS") {
                let seeded = users
                    .seed(&demo_users, config.pepper(), config.hash_cost)
                    .await?;
                tracing::warn!(demo_users = seeded, "Demo users upserted into database");
            }
            auth_router(AuthAppState {
                login: LoginService::new(users, gate.clone(), breaker, config.clone()),
                sessions,
                config: config.clone(),
            })
        }
        None => {
            let users = InMemoryUserRepository::new();
            let demo_users = env_opt("DEMO_USERS").unwrap_or_default();
            let seeded = users.seed(&demo_users, config.pepper(), config.hash_cost)?;
            tracing::warn!(
                demo_users = seeded,
                "DATABASE_URL not set, using in-memory user store"
            );

            auth_router(AuthAppState {
                login: LoginService::new(Arc::new(users), gate.clone(), breaker, config.clone()),
                sessions,
                config: config.clone(),
            })
        }
    };

    // CORS configuration
    let mut frontend_origins = env_list("FRONTEND_ORIGINS");
    if frontend_origins.is_empty() {
        frontend_origins = platform::config::split_list(DEFAULT_FRONTEND_ORIGINS);
    }
    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true);

    // Build router
    let app = Router::new()
        .route("/api/health", get(health))
        .nest("/api", auth_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        );

    // Start server
    tracing::info!("Listening on {}", bind_addr);

    let listener = TcpListener::bind(bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(gate))
    .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// GET /api/health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Purge expired sessions periodically. Errors are logged and retried on
/// the next tick.
fn spawn_session_cleanup<S>(sessions: SessionService<S>, every: Duration)
where
    S: SessionRepository + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match sessions.cleanup_expired().await {
                Ok(0) => {}
                Ok(deleted) => {
                    tracing::info!(sessions_deleted = deleted, "Expired sessions purged");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Session cleanup failed, will retry");
                }
            }
        }
    });
}

/// Wait for Ctrl+C / SIGTERM, then stop admitting logins.
async fn shutdown_signal(gate: Arc<ConcurrencyGate>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    gate.close();
}
