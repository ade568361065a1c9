//! Auth Session Entity
//!
//! Server-side record of a logged-in browser. The cookie carries only the
//! signed session id.

use std::net::IpAddr;

use chrono::{DateTime, Duration, Utc};

use crate::domain::value_object::{SessionId, UserId, UserName};

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub user_name: UserName,
    /// Client IP at login, for logging only
    pub client_ip: Option<IpAddr>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    /// TTL is provided by the application layer (config), not hard-coded here.
    pub fn new(
        user_id: UserId,
        user_name: UserName,
        client_ip: Option<IpAddr>,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: SessionId::new(),
            user_id,
            user_name,
            client_ip,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}
