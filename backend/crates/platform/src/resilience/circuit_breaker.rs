//! Failure-Aware Circuit Breaker
//!
//! State machine: Closed → Open → HalfOpen → Closed
//!
//! - **Closed**: every call runs. A success resets the consecutive-failure
//!   count; reaching `failure_threshold` opens the circuit.
//! - **Open**: calls fail fast with [`BreakerError::Open`] without running.
//!   Once `reset_timeout` has passed since the last failure, the next call
//!   moves the breaker to HalfOpen and runs.
//! - **HalfOpen**: calls run. `success_threshold` consecutive successes close
//!   the circuit; any failure reopens it immediately.
//!
//! `monitoring_period` bounds how far apart two failures may be and still
//! count as consecutive: a failure arriving later than that after the
//! previous one starts a fresh count.
//!
//! A call that panics is recorded as a failure. A call whose future is
//! simply dropped (the caller went away) records nothing; a caller that
//! abandons the call because of its own deadline reports that with
//! [`CircuitBreaker::record_failure`].

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Breaker configuration
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// Cooldown after the last failure before a probe is allowed
    pub reset_timeout: Duration,
    /// Maximum gap between failures for them to count as consecutive
    pub monitoring_period: Duration,
    /// Consecutive HalfOpen successes that close the circuit
    pub success_threshold: u32,
}

impl BreakerConfig {
    /// Credential store protection
    pub fn auth() -> Self {
        Self {
            failure_threshold: 10,
            reset_timeout: Duration::from_secs(30),
            monitoring_period: Duration::from_secs(60),
            success_threshold: 3,
        }
    }

    /// Outbound AI chat service protection
    pub fn ai_service() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(60),
            monitoring_period: Duration::from_secs(60),
            success_threshold: 3,
        }
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self::auth()
    }
}

/// Errors returned by [`CircuitBreaker::execute`]
#[derive(Debug, thiserror::Error)]
pub enum BreakerError<E> {
    /// The circuit is open; the operation was not run
    #[error("circuit open, retry after {retry_after:?}")]
    Open { retry_after: Duration },

    /// The operation ran and failed
    #[error("{0}")]
    Operation(E),
}

/// Read-only snapshot for health endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerMetrics {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    /// Unix epoch milliseconds of the last recorded failure
    pub last_failure_time: Option<i64>,
}

struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure_at: Option<Instant>,
    last_failure_time: Option<DateTime<Utc>>,
}

/// Circuit breaker guarding one kind of operation.
///
/// Construct once at startup and share it behind an `Arc`.
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_at: None,
                last_failure_time: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Run `operation` unless the circuit is open.
    ///
    /// While open, returns [`BreakerError::Open`] before awaiting anything.
    /// Any `Err` from the operation counts as a failure and is passed back
    /// unchanged inside [`BreakerError::Operation`].
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.before_call()
            .map_err(|retry_after| BreakerError::Open { retry_after })?;

        let mut call = PanicGuard {
            breaker: self,
            armed: true,
        };
        let outcome = operation().await;
        call.armed = false;

        match &outcome {
            Ok(_) => self.on_success(),
            Err(_) => self.on_failure(),
        }
        outcome.map_err(BreakerError::Operation)
    }

    /// Record a failure observed outside [`execute`](Self::execute), such as
    /// an outer deadline expiring while the guarded call was still running.
    pub fn record_failure(&self) {
        self.on_failure();
    }

    /// Current state. Never transitions; an expired Open stays Open until
    /// the next `execute`.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn metrics(&self) -> BreakerMetrics {
        let inner = self.lock();
        BreakerMetrics {
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            last_failure_time: inner.last_failure_time.map(|t| t.timestamp_millis()),
        }
    }

    /// Decide whether a call may run. `Err` carries the remaining cooldown.
    fn before_call(&self) -> Result<(), Duration> {
        let mut inner = self.lock();
        if inner.state != CircuitState::Open {
            return Ok(());
        }

        let elapsed = inner
            .last_failure_at
            .map(|at| at.elapsed())
            .unwrap_or(Duration::MAX);
        if elapsed > self.config.reset_timeout {
            inner.state = CircuitState::HalfOpen;
            inner.success_count = 0;
            tracing::info!(breaker = %self.name, "circuit breaker: OPEN → HALF_OPEN (probing)");
            return Ok(());
        }

        Err(self.config.reset_timeout.saturating_sub(elapsed))
    }

    fn on_success(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    inner.state = CircuitState::Closed;
                    inner.failure_count = 0;
                    inner.success_count = 0;
                    tracing::info!(breaker = %self.name, "circuit breaker: HALF_OPEN → CLOSED (recovered)");
                }
            }
            // Late result from a call admitted before the circuit opened.
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self) {
        let mut inner = self.lock();
        let now = Instant::now();

        match inner.state {
            CircuitState::Closed => {
                let stale = inner
                    .last_failure_at
                    .is_some_and(|at| now.duration_since(at) > self.config.monitoring_period);
                inner.failure_count = if stale { 1 } else { inner.failure_count + 1 };
                if inner.failure_count >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    tracing::warn!(
                        breaker = %self.name,
                        failure_count = inner.failure_count,
                        reset_timeout_ms = self.config.reset_timeout.as_millis() as u64,
                        "circuit breaker: CLOSED → OPEN"
                    );
                }
            }
            CircuitState::HalfOpen => {
                inner.failure_count += 1;
                inner.success_count = 0;
                inner.state = CircuitState::Open;
                tracing::warn!(breaker = %self.name, "circuit breaker: HALF_OPEN → OPEN (probe failed)");
            }
            CircuitState::Open => {
                inner.failure_count += 1;
            }
        }

        inner.last_failure_at = Some(now);
        inner.last_failure_time = Some(Utc::now());
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        // Counters stay consistent even if a holder panicked; no guard is
        // ever held across an await.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Records a failure if the operation panics. Cancellation is not a failure.
struct PanicGuard<'a> {
    breaker: &'a CircuitBreaker,
    armed: bool,
}

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if self.armed && std::thread::panicking() {
            tracing::error!(breaker = %self.breaker.name, "Guarded call panicked");
            self.breaker.on_failure();
        }
    }
}
