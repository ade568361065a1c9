//! In-Memory Repository Implementations
//!
//! Single-process stores used for development, tests and as the session
//! store. Nothing here survives a restart.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use platform::password::HashCost;

use crate::domain::entity::{AuthSession, UserCredential};
use crate::domain::repository::{SessionRepository, UserRepository};
use crate::domain::value_object::{SessionId, UserId, UserName};
use crate::error::AuthResult;
use crate::infra::seed::parse_demo_users;

// ============================================================================
// Users
// ============================================================================

/// User store keyed by canonical user name
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, UserCredential>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a credential
    pub fn insert(&self, credential: UserCredential) {
        let key = credential.user.user_name.canonical().to_string();
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, credential);
    }

    pub fn len(&self) -> usize {
        self.users.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Seed accounts from `DEMO_USERS` entries; see [`parse_demo_users`].
    /// Returns the number of accounts added.
    pub fn seed(&self, entries: &str, pepper: Option<&[u8]>, cost: HashCost) -> AuthResult<usize> {
        let credentials = parse_demo_users(entries, pepper, cost)?;
        let added = credentials.len();
        for credential in credentials {
            self.insert(credential);
        }
        Ok(added)
    }
}

impl UserRepository for InMemoryUserRepository {
    async fn find_credential(&self, user_name: &UserName) -> AuthResult<Option<UserCredential>> {
        Ok(self
            .users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_name.canonical())
            .cloned())
    }

    async fn record_login(&self, user_id: &UserId, at: DateTime<Utc>) -> AuthResult<()> {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(credential) = users.values_mut().find(|c| c.user.user_id == *user_id) {
            credential.user.record_login(at);
        }
        Ok(())
    }
}

// ============================================================================
// Sessions
// ============================================================================

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: Mutex<HashMap<SessionId, AuthSession>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, AuthSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionRepository for InMemorySessionRepository {
    async fn create(&self, session: &AuthSession) -> AuthResult<()> {
        self.lock().insert(session.session_id, session.clone());
        Ok(())
    }

    async fn find_by_id(&self, session_id: &SessionId) -> AuthResult<Option<AuthSession>> {
        Ok(self.lock().get(session_id).cloned())
    }

    async fn delete(&self, session_id: &SessionId) -> AuthResult<bool> {
        Ok(self.lock().remove(session_id).is_some())
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(now));
        Ok((before - sessions.len()) as u64)
    }
}
