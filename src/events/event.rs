//! # Runtime events emitted by controllers, queues, pools and the orchestrator.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Control events**: pause/resume/exit transitions of a [`Controller`](crate::Controller)
//! - **Queue events**: shutdown drains of a [`BoundedQueue`](crate::BoundedQueue)
//! - **Worker events**: replica lifecycle (starting, stopped, failed, panicked)
//! - **Orchestration events**: pool start/join and the shutdown sequence
//!
//! The [`Event`] struct carries additional metadata such as timestamps, worker name,
//! replica index, queue name and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use workvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::WorkerFailed)
//!     .with_worker("squarer")
//!     .with_replica(1)
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::WorkerFailed);
//! assert_eq!(ev.worker.as_deref(), Some("squarer"));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `worker`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `worker`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Control events ===
    /// Exit was requested on a controller.
    ExitRequested,

    /// Exit flag was reset for a new orchestration cycle.
    ExitCleared,

    /// Controller entered the paused state.
    Paused,

    /// Controller left the paused state; every waiter in `check_pause` is woken.
    Resumed,

    // === Queue events ===
    /// Queue was drained to release blocked producers and consumers.
    ///
    /// Sets:
    /// - `queue`: queue name
    /// - `count`: number of discarded items
    QueueDrained,

    // === Worker events ===
    /// Replica is about to run its worker body.
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `replica`: replica index (0-based)
    WorkerStarting,

    /// Replica returned `Ok(())` or `Err(TaskError::Canceled)`.
    ///
    /// Sets:
    /// - `worker`, `replica`
    WorkerStopped,

    /// Replica returned an error other than `Canceled`.
    ///
    /// Sets:
    /// - `worker`, `replica`
    /// - `reason`: error message
    WorkerFailed,

    /// Replica panicked or was aborted.
    ///
    /// Sets:
    /// - `worker`, `replica`
    /// - `reason`: panic info or `"aborted"`
    WorkerPanicked,

    // === Orchestration events ===
    /// Pool spawned all its replicas.
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `count`: replica count
    PoolStarted,

    /// Every replica of the pool has terminated.
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `count`: replica count
    PoolJoined,

    /// Orchestrator started the shutdown sequence.
    ShutdownRequested,

    /// All pools joined after request-exit and drain.
    ShutdownComplete,

    /// Join grace period exceeded; stuck replicas were aborted.
    ///
    /// Sets:
    /// - `reason`: stuck replica labels
    GraceExceeded,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the worker (or subscriber), if applicable.
    pub worker: Option<Arc<str>>,
    /// Replica index within its pool.
    pub replica: Option<u32>,
    /// Name of the queue, if applicable.
    pub queue: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Kind-specific counter (discarded items, replica count).
    pub count: Option<u64>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            replica: None,
            queue: None,
            reason: None,
            count: None,
        }
    }

    /// Attaches a worker name.
    #[inline]
    pub fn with_worker(mut self, worker: impl Into<Arc<str>>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    /// Attaches a replica index.
    #[inline]
    pub fn with_replica(mut self, replica: usize) -> Self {
        self.replica = Some(u32::try_from(replica).unwrap_or(u32::MAX));
        self
    }

    /// Attaches a queue name.
    #[inline]
    pub fn with_queue(mut self, queue: impl Into<Arc<str>>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a counter.
    #[inline]
    pub fn with_count(mut self, n: usize) -> Self {
        self.count = Some(n as u64);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_worker(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_worker(subscriber)
            .with_reason(info)
    }

    /// Label `name#replica` used in logs and stuck lists.
    pub fn replica_label(&self) -> Option<String> {
        match (&self.worker, self.replica) {
            (Some(w), Some(r)) => Some(format!("{w}#{r}")),
            (Some(w), None) => Some(w.to_string()),
            _ => None,
        }
    }
}
