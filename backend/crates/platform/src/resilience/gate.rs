//! Bounded Concurrency Gate
//!
//! Limits how many operations run at once and queues the rest in arrival
//! order. Admission is handed out by a fair [`tokio::sync::Semaphore`]:
//! permits are granted strictly in the order they were requested, and a
//! released permit goes straight to the oldest waiter. That hand-off is the
//! gate's drain step, so two drains can never interleave and an empty queue
//! costs nothing.
//!
//! The gate never retries and never swallows an error: whatever the
//! operation returns is what the caller gets back, wrapped in
//! [`GateError::Operation`].

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::Instant;

/// Gate configuration
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Maximum number of operations running at the same time
    pub concurrent_limit: usize,
    /// Maximum number of callers waiting for a slot (`None` = unbounded)
    pub max_queue_depth: Option<usize>,
    /// Per-operation deadline, measured from admission (`None` = no deadline)
    pub operation_timeout: Option<Duration>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            concurrent_limit: 5,
            max_queue_depth: Some(100),
            operation_timeout: Some(Duration::from_secs(5)),
        }
    }
}

/// Errors returned by [`ConcurrencyGate::enqueue`]
#[derive(Debug, thiserror::Error)]
pub enum GateError<E> {
    /// The waiting queue is full
    #[error("too many pending requests ({queue_length} queued, max {max_queue_depth})")]
    Overloaded {
        queue_length: usize,
        max_queue_depth: usize,
    },

    /// The admitted operation did not settle before the deadline
    #[error("operation timed out after {0:?}")]
    TimedOut(Duration),

    /// The gate was closed while the caller was waiting
    #[error("gate is closed")]
    Closed,

    /// The operation itself failed
    #[error("{0}")]
    Operation(E),
}

/// Point-in-time view of the gate, for health endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub queue_length: usize,
    pub active_operations: usize,
    pub concurrent_limit: usize,
}

/// Process-wide admission gate.
///
/// Construct once at startup and share it behind an `Arc`.
pub struct ConcurrencyGate {
    config: GateConfig,
    semaphore: Semaphore,
    queued: AtomicUsize,
    active: AtomicUsize,
}

impl ConcurrencyGate {
    /// Create a gate. A zero `concurrent_limit` would never admit anything,
    /// so it is raised to 1.
    pub fn new(config: GateConfig) -> Self {
        let limit = config.concurrent_limit.max(1);
        if config.concurrent_limit == 0 {
            tracing::warn!("concurrent_limit of 0 would block forever, using 1");
        }

        Self {
            semaphore: Semaphore::new(limit),
            config: GateConfig {
                concurrent_limit: limit,
                ..config
            },
            queued: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Run `operation` once a slot is free.
    ///
    /// Resolves with exactly the operation's own outcome. The only errors
    /// the gate adds are [`GateError::Overloaded`] (rejected before
    /// queueing), [`GateError::TimedOut`] and [`GateError::Closed`].
    pub async fn enqueue<F, Fut, T, E>(&self, operation: F) -> Result<T, GateError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let _permit = self.admit().await?;
        let _active = SlotCounter::enter(&self.active);

        let outcome = match self.config.operation_timeout {
            Some(deadline) => match tokio::time::timeout(deadline, operation()).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::warn!(
                        timeout_ms = deadline.as_millis() as u64,
                        "Gated operation timed out"
                    );
                    return Err(GateError::TimedOut(deadline));
                }
            },
            None => operation().await,
        };

        outcome.map_err(GateError::Operation)
    }

    /// Snapshot of queue length, running operations and the configured limit
    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            queue_length: self.queued.load(Ordering::Acquire),
            active_operations: self.active.load(Ordering::Acquire),
            concurrent_limit: self.config.concurrent_limit,
        }
    }

    /// Reject every waiting and future caller with [`GateError::Closed`].
    /// Operations already running are left to finish.
    pub fn close(&self) {
        self.semaphore.close();
        tracing::info!(
            queue_length = self.queued.load(Ordering::Acquire),
            "Concurrency gate closed"
        );
    }

    async fn admit<E>(&self) -> Result<SemaphorePermit<'_>, GateError<E>> {
        // Free permits only exist when nobody is waiting, so this never
        // overtakes a queued caller.
        if let Ok(permit) = self.semaphore.try_acquire() {
            return Ok(permit);
        }
        if self.semaphore.is_closed() {
            return Err(GateError::Closed);
        }

        let ahead = self.queued.fetch_add(1, Ordering::AcqRel);
        let _queued = SlotCounter(&self.queued);

        if let Some(max_queue_depth) = self.config.max_queue_depth {
            if ahead >= max_queue_depth {
                tracing::warn!(
                    queue_length = ahead,
                    max_queue_depth,
                    "Gate queue full, rejecting operation"
                );
                return Err(GateError::Overloaded {
                    queue_length: ahead,
                    max_queue_depth,
                });
            }
        }

        let queued_at = Instant::now();
        tracing::debug!(position = ahead + 1, "Operation queued");

        let permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| GateError::Closed)?;

        tracing::debug!(
            waited_ms = queued_at.elapsed().as_millis() as u64,
            "Operation admitted"
        );
        Ok(permit)
    }
}

impl Default for ConcurrencyGate {
    fn default() -> Self {
        Self::new(GateConfig::default())
    }
}

/// Decrements its counter on drop, including when the caller's future is
/// cancelled mid-wait or mid-run.
struct SlotCounter<'a>(&'a AtomicUsize);

impl<'a> SlotCounter<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for SlotCounter<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::sync::oneshot;
    use tokio::task::JoinSet;

    fn gate(limit: usize, max_queue_depth: Option<usize>, timeout: Option<Duration>) -> Arc<ConcurrencyGate> {
        Arc::new(ConcurrencyGate::new(GateConfig {
            concurrent_limit: limit,
            max_queue_depth,
            operation_timeout: timeout,
        }))
    }

    /// Yield until `cond` holds; the test runtime is single threaded.
    async fn settle(mut cond: impl FnMut() -> bool) {
        for _ in 0..1_000 {
            if cond() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition never became true");
    }

    #[tokio::test(start_paused = true)]
    async fn test_active_count_never_exceeds_limit() {
        let gate = gate(2, None, None);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = JoinSet::new();
        for _ in 0..7 {
            let gate = gate.clone();
            let running = running.clone();
            let peak = peak.clone();
            tasks.spawn(async move {
                gate.enqueue(|| async {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, String>(())
                })
                .await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            assert!(joined.unwrap().is_ok());
        }
        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(gate.status().active_operations, 0);
        assert_eq!(gate.status().queue_length, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_operations_start_in_arrival_order() {
        let gate = gate(1, None, None);
        let started = Arc::new(Mutex::new(Vec::new()));

        // Occupy the only slot so everything after it has to queue.
        let (release, hold) = oneshot::channel::<()>();
        let blocker = {
            let gate = gate.clone();
            tokio::spawn(async move {
                gate.enqueue(|| async {
                    let _ = hold.await;
                    Ok::<_, String>(())
                })
                .await
            })
        };
        settle(|| gate.status().active_operations == 1).await;

        let mut tasks = JoinSet::new();
        for i in 0..5 {
            let gate_for_task = gate.clone();
            let started = started.clone();
            tasks.spawn(async move {
                gate_for_task
                    .enqueue(|| async move {
                        started.lock().unwrap().push(i);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Ok::<_, String>(i)
                    })
                    .await
            });
            settle(|| gate.status().queue_length == i + 1).await;
        }

        release.send(()).unwrap();
        blocker.await.unwrap().unwrap();
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }

        assert_eq!(*started.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_five_operations_limit_two_take_three_batches() {
        let gate = gate(2, None, None);
        let begin = Instant::now();

        let mut tasks = JoinSet::new();
        for _ in 0..5 {
            let gate = gate.clone();
            tasks.spawn(async move {
                gate.enqueue(|| async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok::<_, String>(())
                })
                .await
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }

        let elapsed = begin.elapsed();
        assert!(elapsed >= Duration::from_millis(150), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(200), "elapsed {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_operation_error_is_returned_and_slot_freed() {
        let gate = gate(1, None, None);

        let result = gate
            .enqueue(|| async { Err::<(), _>("store unavailable".to_string()) })
            .await;
        match result {
            Err(GateError::Operation(msg)) => assert_eq!(msg, "store unavailable"),
            other => panic!("unexpected result: {:?}", other),
        }

        assert_eq!(gate.status().active_operations, 0);
        let next = gate.enqueue(|| async { Ok::<_, String>(7) }).await.unwrap();
        assert_eq!(next, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_queue_rejects_immediately() {
        let gate = gate(1, Some(1), None);
        let (release, hold) = oneshot::channel::<()>();

        let blocker = {
            let gate = gate.clone();
            tokio::spawn(async move {
                gate.enqueue(|| async {
                    let _ = hold.await;
                    Ok::<_, String>(())
                })
                .await
            })
        };
        settle(|| gate.status().active_operations == 1).await;

        let waiter = {
            let gate_for_task = gate.clone();
            tokio::spawn(async move { gate_for_task.enqueue(|| async { Ok::<_, String>(()) }).await })
        };
        settle(|| gate.status().queue_length == 1).await;

        let rejected = gate.enqueue(|| async { Ok::<_, String>(()) }).await;
        assert!(matches!(
            rejected,
            Err(GateError::Overloaded {
                queue_length: 1,
                max_queue_depth: 1
            })
        ));
        assert_eq!(gate.status().queue_length, 1);

        release.send(()).unwrap();
        blocker.await.unwrap().unwrap();
        waiter.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_frees_slot() {
        let gate = gate(1, None, Some(Duration::from_millis(100)));

        let result = gate
            .enqueue(|| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, String>(())
            })
            .await;

        assert!(matches!(result, Err(GateError::TimedOut(d)) if d == Duration::from_millis(100)));
        assert_eq!(gate.status().active_operations, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_waiter_leaves_queue() {
        let gate = gate(1, None, None);
        let (release, hold) = oneshot::channel::<()>();

        let blocker = {
            let gate = gate.clone();
            tokio::spawn(async move {
                gate.enqueue(|| async {
                    let _ = hold.await;
                    Ok::<_, String>(())
                })
                .await
            })
        };
        settle(|| gate.status().active_operations == 1).await;

        let waiter = {
            let gate_for_task = gate.clone();
            tokio::spawn(async move { gate_for_task.enqueue(|| async { Ok::<_, String>(()) }).await })
        };
        settle(|| gate.status().queue_length == 1).await;

        waiter.abort();
        let _ = waiter.await;
        assert_eq!(gate.status().queue_length, 0);

        release.send(()).unwrap();
        blocker.await.unwrap().unwrap();
        assert_eq!(gate.status().active_operations, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_rejects_waiters() {
        let gate = gate(1, None, None);
        let (release, hold) = oneshot::channel::<()>();

        let blocker = {
            let gate = gate.clone();
            tokio::spawn(async move {
                gate.enqueue(|| async {
                    let _ = hold.await;
                    Ok::<_, String>(())
                })
                .await
            })
        };
        settle(|| gate.status().active_operations == 1).await;

        let waiter = {
            let gate_for_task = gate.clone();
            tokio::spawn(async move { gate_for_task.enqueue(|| async { Ok::<_, String>(()) }).await })
        };
        settle(|| gate.status().queue_length == 1).await;

        gate.close();
        assert!(matches!(waiter.await.unwrap(), Err(GateError::Closed)));
        assert!(matches!(
            gate.enqueue(|| async { Ok::<_, String>(()) }).await,
            Err(GateError::Closed)
        ));

        // The running operation is unaffected.
        release.send(()).unwrap();
        assert!(blocker.await.unwrap().is_ok());
    }

    #[test]
    fn test_zero_limit_is_raised_to_one() {
        let gate = ConcurrencyGate::new(GateConfig {
            concurrent_limit: 0,
            ..GateConfig::default()
        });
        assert_eq!(gate.status().concurrent_limit, 1);
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let gate = ConcurrencyGate::default();
        let json = serde_json::to_value(gate.status()).unwrap();
        assert_eq!(json["queueLength"], 0);
        assert_eq!(json["activeOperations"], 0);
        assert_eq!(json["concurrentLimit"], 5);
    }
}
