//! Application Layer
//!
//! Use cases and application services.

pub mod config;
pub mod login;
pub mod session;

pub use config::AuthConfig;
pub use login::{LoginInput, LoginOutcome, LoginService};
pub use session::{IssuedSession, SessionService};
