//! Application Configuration
//!
//! Configuration for the login gate, the credential-store breaker, sessions
//! and cookies.

use std::time::Duration;

use platform::config::{
    ConfigError, env_bool, env_duration_ms, env_opt, env_opt_duration_ms, env_parse,
};
use platform::cookie::CookieConfig;
use platform::crypto::{TokenSigner, from_base64};
use platform::password::HashCost;
use platform::resilience::{BreakerConfig, GateConfig};

/// Re-export SameSite from platform
pub use platform::cookie::SameSite;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Bounded concurrency for credential checks
    pub gate: GateConfig,
    /// Breaker around the credential store
    pub breaker: BreakerConfig,
    pub session_cookie_name: String,
    /// HMAC key for session tokens
    pub session_secret: [u8; 32],
    pub session_ttl: Duration,
    pub cookie_secure: bool,
    pub cookie_same_site: SameSite,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
    /// Argon2 cost for passwords hashed by this process (seeded accounts)
    pub hash_cost: HashCost,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            gate: GateConfig::default(),
            breaker: BreakerConfig::auth(),
            session_cookie_name: "auth_session".to_string(),
            session_secret: [0u8; 32],
            session_ttl: Duration::from_secs(12 * 3600),
            cookie_secure: true,
            cookie_same_site: SameSite::Lax,
            password_pepper: None,
            hash_cost: HashCost::Interactive,
        }
    }
}

impl AuthConfig {
    /// Create config with a random session secret
    pub fn with_random_secret() -> Self {
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&platform::crypto::random_bytes(32));
        Self {
            session_secret: secret,
            ..Default::default()
        }
    }

    /// Create config for development (insecure cookie, cheap hashing)
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            hash_cost: HashCost::Minimal,
            ..Self::with_random_secret()
        }
    }

    /// Overlay environment variables on `base`.
    ///
    /// `SESSION_SECRET` must be base64 of exactly 32 bytes. When
    /// `require_secret` is set and it is absent, this fails.
    pub fn from_env(base: Self, require_secret: bool) -> Result<Self, ConfigError> {
        let gate = GateConfig {
            concurrent_limit: env_parse("LOGIN_CONCURRENT_LIMIT", base.gate.concurrent_limit)?,
            max_queue_depth: match env_opt("LOGIN_MAX_QUEUE_DEPTH") {
                Some(_) => {
                    let depth: usize = env_parse("LOGIN_MAX_QUEUE_DEPTH", 0)?;
                    (depth > 0).then_some(depth)
                }
                None => base.gate.max_queue_depth,
            },
            operation_timeout: env_opt_duration_ms(
                "LOGIN_OPERATION_TIMEOUT_MS",
                base.gate.operation_timeout,
            )?,
        };

        let breaker = BreakerConfig {
            failure_threshold: env_parse("BREAKER_FAILURE_THRESHOLD", base.breaker.failure_threshold)?,
            reset_timeout: env_duration_ms("BREAKER_RESET_TIMEOUT_MS", base.breaker.reset_timeout)?,
            monitoring_period: env_duration_ms(
                "BREAKER_MONITORING_PERIOD_MS",
                base.breaker.monitoring_period,
            )?,
            success_threshold: env_parse("BREAKER_SUCCESS_THRESHOLD", base.breaker.success_threshold)?,
        };
        if breaker.failure_threshold == 0 || breaker.success_threshold == 0 {
            return Err(ConfigError::invalid(
                "BREAKER_FAILURE_THRESHOLD/BREAKER_SUCCESS_THRESHOLD",
                "0",
                "thresholds must be at least 1",
            ));
        }

        let session_secret = match env_opt("SESSION_SECRET") {
            Some(raw) => decode_secret(&raw)?,
            None if require_secret => return Err(ConfigError::Missing("SESSION_SECRET".into())),
            None => base.session_secret,
        };

        let session_ttl = match env_opt("SESSION_TTL_SECS") {
            Some(_) => Duration::from_secs(env_parse("SESSION_TTL_SECS", 0u64)?),
            None => base.session_ttl,
        };

        let cookie_same_site = match env_opt("COOKIE_SAME_SITE") {
            Some(raw) => raw
                .parse()
                .map_err(|e: String| ConfigError::invalid("COOKIE_SAME_SITE", raw, e))?,
            None => base.cookie_same_site,
        };

        Ok(Self {
            gate,
            breaker,
            session_secret,
            session_ttl,
            cookie_secure: env_bool("COOKIE_SECURE", base.cookie_secure)?,
            cookie_same_site,
            password_pepper: env_opt("PASSWORD_PEPPER")
                .map(String::into_bytes)
                .or(base.password_pepper),
            ..base
        })
    }

    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }

    pub fn token_signer(&self) -> TokenSigner {
        TokenSigner::new(self.session_secret)
    }

    pub fn session_ttl_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.session_ttl).unwrap_or(chrono::Duration::hours(12))
    }

    pub fn cookie(&self) -> CookieConfig {
        CookieConfig {
            name: self.session_cookie_name.clone(),
            secure: self.cookie_secure,
            http_only: true,
            same_site: self.cookie_same_site,
            path: "/".to_string(),
            max_age_secs: Some(self.session_ttl.as_secs() as i64),
        }
    }
}

fn decode_secret(raw: &str) -> Result<[u8; 32], ConfigError> {
    let bytes = from_base64(raw).map_err(|e| ConfigError::invalid("SESSION_SECRET", "<redacted>", e))?;
    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| {
        ConfigError::invalid(
            "SESSION_SECRET",
            "<redacted>",
            format!("expected 32 bytes, got {}", bytes.len()),
        )
    })
}
