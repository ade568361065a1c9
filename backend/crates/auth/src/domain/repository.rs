//! Repository Traits
//!
//! Interfaces for data persistence. Implementations are in the infra layer.
//!
//! Returning `Err` means the store itself failed (connection lost, query
//! error). An unknown user is `Ok(None)`.

use chrono::{DateTime, Utc};

use crate::domain::entity::{AuthSession, UserCredential};
use crate::domain::value_object::{SessionId, UserId, UserName};
use crate::error::AuthResult;

/// Credential store consulted by login
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Find a user and their password hash by canonical user name
    async fn find_credential(&self, user_name: &UserName) -> AuthResult<Option<UserCredential>>;

    /// Stamp a successful login
    async fn record_login(&self, user_id: &UserId, at: DateTime<Utc>) -> AuthResult<()>;
}

/// Server-side session store
#[trait_variant::make(SessionRepository: Send)]
pub trait LocalSessionRepository {
    async fn create(&self, session: &AuthSession) -> AuthResult<()>;

    async fn find_by_id(&self, session_id: &SessionId) -> AuthResult<Option<AuthSession>>;

    /// Returns whether a session was removed
    async fn delete(&self, session_id: &SessionId) -> AuthResult<bool>;

    /// Remove every session that expired before `now`
    async fn cleanup_expired(&self, now: DateTime<Utc>) -> AuthResult<u64>;
}
