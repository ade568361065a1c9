//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository traits
//! - `application/` - Login and session use cases, configuration
//! - `infra/` - In-memory and PostgreSQL stores
//! - `presentation/` - HTTP handlers, DTOs, router
//!
//! ## Login path
//! Every credential check is admitted through a process-wide
//! [`ConcurrencyGate`](platform::resilience::ConcurrencyGate) and then run
//! through a [`CircuitBreaker`](platform::resilience::CircuitBreaker) guarding
//! the credential store. Both are built once by the binary and injected.
//!
//! ## Security Model
//! - Passwords hashed with Argon2id (optional pepper)
//! - Generic failure messages; no user enumeration
//! - Server-side sessions referenced by an HMAC-signed, HttpOnly cookie

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;


// Re-exports for convenience
pub use application::{AuthConfig, LoginInput, LoginOutcome, LoginService, SessionService};
pub use error::{AuthError, AuthResult};
pub use infra::{InMemorySessionRepository, InMemoryUserRepository, PgUserRepository};
pub use presentation::{AuthAppState, auth_router};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
