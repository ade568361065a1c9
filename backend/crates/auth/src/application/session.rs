//! Session Use Case
//!
//! Issues, checks and revokes server-side sessions. The cookie value is the
//! session id signed with HMAC-SHA256 (`<uuid>.<mac>`).

use std::net::IpAddr;
use std::sync::Arc;

use chrono::Utc;
use platform::crypto::TokenSigner;

use crate::application::config::AuthConfig;
use crate::domain::entity::{AuthSession, User};
use crate::domain::repository::SessionRepository;
use crate::domain::value_object::SessionId;
use crate::error::{AuthError, AuthResult};

pub struct IssuedSession {
    /// Cookie value
    pub token: String,
    pub session: AuthSession,
}

pub struct SessionService<S> {
    sessions: Arc<S>,
    signer: TokenSigner,
    config: Arc<AuthConfig>,
}

impl<S> Clone for SessionService<S> {
    fn clone(&self) -> Self {
        Self {
            sessions: self.sessions.clone(),
            signer: self.signer.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S> SessionService<S>
where
    S: SessionRepository + Send + Sync + 'static,
{
    pub fn new(sessions: Arc<S>, config: Arc<AuthConfig>) -> Self {
        Self {
            sessions,
            signer: config.token_signer(),
            config,
        }
    }

    pub async fn issue(&self, user: &User, client_ip: Option<IpAddr>) -> AuthResult<IssuedSession> {
        let session = AuthSession::new(
            user.user_id,
            user.user_name.clone(),
            client_ip,
            self.config.session_ttl_chrono(),
        );
        self.sessions.create(&session).await?;

        let token = self.signer.sign(&session.session_id.to_string());
        tracing::info!(
            user_id = %user.user_id,
            session_id = %session.session_id,
            "Session issued"
        );

        Ok(IssuedSession { token, session })
    }

    /// Resolve a cookie value to a live session
    pub async fn check(&self, token: &str) -> AuthResult<AuthSession> {
        let session_id = self.parse_token(token)?;
        let session = self
            .sessions
            .find_by_id(&session_id)
            .await?
            .ok_or(AuthError::SessionInvalid)?;

        if session.is_expired() {
            self.sessions.delete(&session_id).await?;
            return Err(AuthError::SessionInvalid);
        }
        Ok(session)
    }

    /// Revoke the session behind `token`, if any.
    ///
    /// Succeeds for missing, forged and already-revoked tokens alike.
    pub async fn sign_out(&self, token: Option<&str>) -> AuthResult<()> {
        let Some(session_id) = token.and_then(|t| self.parse_token(t).ok()) else {
            return Ok(());
        };

        if self.sessions.delete(&session_id).await? {
            tracing::info!(session_id = %session_id, "User signed out");
        }
        Ok(())
    }

    pub async fn cleanup_expired(&self) -> AuthResult<u64> {
        self.sessions.cleanup_expired(Utc::now()).await
    }

    fn parse_token(&self, token: &str) -> AuthResult<SessionId> {
        let payload = self.signer.verify(token).ok_or(AuthError::SessionInvalid)?;
        SessionId::parse_str(payload).map_err(|_| AuthError::SessionInvalid)
    }
}
