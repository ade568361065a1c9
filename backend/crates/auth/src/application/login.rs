//! Login Use Case
//!
//! Credential checks run inside the login gate (bounded concurrency, FIFO)
//! and, once admitted, through the credential-store circuit breaker:
//!
//! ```text
//! request ─▶ ConcurrencyGate::enqueue ─▶ CircuitBreaker::execute ─▶ verify
//! ```
//!
//! A wrong password or unknown user is a *successful* store call that yields
//! `Ok(None)`; only store failures count toward the breaker.

use std::sync::Arc;

use chrono::Utc;
use platform::password::ClearTextPassword;
use platform::resilience::{
    BreakerError, BreakerMetrics, CircuitBreaker, CircuitState, ConcurrencyGate, GateError,
    QueueStatus,
};

use crate::application::config::AuthConfig;
use crate::domain::entity::{User, UserCredential};
use crate::domain::repository::UserRepository;
use crate::domain::value_object::UserName;
use crate::error::{AuthError, AuthResult};

/// Raw login form
pub struct LoginInput {
    pub user_name: String,
    pub password: String,
}

#[derive(Debug)]
pub enum LoginOutcome {
    Authenticated(User),
    /// Unknown user, wrong password, inactive account or malformed user name
    Rejected,
}

pub struct LoginService<U> {
    users: Arc<U>,
    gate: Arc<ConcurrencyGate>,
    breaker: Arc<CircuitBreaker>,
    config: Arc<AuthConfig>,
}

impl<U> Clone for LoginService<U> {
    fn clone(&self) -> Self {
        Self {
            users: self.users.clone(),
            gate: self.gate.clone(),
            breaker: self.breaker.clone(),
            config: self.config.clone(),
        }
    }
}

impl<U> LoginService<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    pub fn new(
        users: Arc<U>,
        gate: Arc<ConcurrencyGate>,
        breaker: Arc<CircuitBreaker>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            users,
            gate,
            breaker,
            config,
        }
    }

    pub async fn authenticate(&self, input: LoginInput) -> AuthResult<LoginOutcome> {
        if input.user_name.trim().is_empty() || input.password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let user_name = match UserName::new(&input.user_name) {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(reason = %e, "Login rejected: malformed user name");
                return Ok(LoginOutcome::Rejected);
            }
        };
        let password = ClearTextPassword::for_verification(input.password);

        let result = self
            .gate
            .enqueue(|| self.breaker.execute(|| self.verify(&user_name, password)))
            .await;

        match result {
            Ok(Some(user)) => Ok(LoginOutcome::Authenticated(user)),
            Ok(None) => Ok(LoginOutcome::Rejected),
            Err(GateError::Operation(BreakerError::Operation(e))) => Err(e),
            Err(GateError::Operation(BreakerError::Open { retry_after })) => {
                Err(AuthError::CircuitOpen { retry_after })
            }
            Err(GateError::Overloaded { queue_length, .. }) => {
                Err(AuthError::Overloaded { queue_length })
            }
            Err(GateError::TimedOut(after)) => {
                // The breaker only sees its call dropped; a stalled store is
                // still a store failure.
                self.breaker.record_failure();
                Err(AuthError::Timeout(after))
            }
            Err(GateError::Closed) => Err(AuthError::ShuttingDown),
        }
    }

    pub fn queue_status(&self) -> QueueStatus {
        self.gate.status()
    }

    pub fn breaker_state(&self) -> CircuitState {
        self.breaker.state()
    }

    pub fn breaker_metrics(&self) -> BreakerMetrics {
        self.breaker.metrics()
    }

    /// Store lookup + password check. `Err` only for store failures.
    async fn verify(
        &self,
        user_name: &UserName,
        password: ClearTextPassword,
    ) -> AuthResult<Option<User>> {
        let Some(UserCredential {
            mut user,
            password_hash,
        }) = self.users.find_credential(user_name).await?
        else {
            tracing::warn!(user_name = %user_name.canonical(), "Login rejected: unknown user");
            return Ok(None);
        };

        let config = self.config.clone();
        let matches = tokio::task::spawn_blocking(move || {
            password_hash.verify(&password, config.pepper())
        })
        .await
        .map_err(|e| AuthError::Internal(format!("password verification task failed: {e}")))?;

        if !matches {
            tracing::warn!(user_id = %user.user_id, "Login rejected: wrong password");
            return Ok(None);
        }
        if !user.can_login() {
            tracing::warn!(user_id = %user.user_id, "Login rejected: account inactive");
            return Ok(None);
        }

        let now = Utc::now();
        self.users.record_login(&user.user_id, now).await?;
        user.record_login(now);

        Ok(Some(user))
    }
}
