//! Resilience primitives for calls into a fragile dependency.
//!
//! ```text
//! caller
//!     → gate.rs            (FIFO admission, bounded concurrency, per-operation timeout)
//!     → circuit_breaker.rs (fail fast while the dependency is unhealthy)
//!     → operation          (e.g. credential lookup + hash compare)
//! ```
//!
//! `backoff.rs` is a caller-side concern: neither the gate nor the breaker
//! retries on its own.

pub mod backoff;
pub mod circuit_breaker;
pub mod gate;

pub use backoff::{RetryPolicy, calculate_backoff, retry_with_backoff};
pub use circuit_breaker::{BreakerConfig, BreakerError, BreakerMetrics, CircuitBreaker, CircuitState};
pub use gate::{ConcurrencyGate, GateConfig, GateError, QueueStatus};
