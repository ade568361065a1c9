//! Entity Module

pub mod auth_session;
pub mod credential;
pub mod user;

pub use auth_session::AuthSession;
pub use credential::UserCredential;
pub use user::{PreferredLanguage, User};
