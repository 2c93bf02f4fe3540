//! # LogWriter: structured event logger
//!
//! A subscriber that renders incoming [`Event`]s as `tracing` records, one field per
//! populated event attribute. Install any `tracing` subscriber to collect them.
//!
//! ## Example output (with `tracing_subscriber::fmt`)
//! ```text
//! INFO workvisor: worker starting worker="squarer" replica=0
//! WARN workvisor: worker failed worker="squarer" replica=1 reason="execution failed: boom"
//! INFO workvisor: queue drained queue="telemetry" discarded=3
//! INFO workvisor: exit requested
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let worker = e.worker.as_deref().unwrap_or("-");
        let queue = e.queue.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::ExitRequested => tracing::info!(target: "workvisor", seq = e.seq, "exit requested"),
            EventKind::ExitCleared => tracing::info!(target: "workvisor", seq = e.seq, "exit cleared"),
            EventKind::Paused => tracing::info!(target: "workvisor", seq = e.seq, "paused"),
            EventKind::Resumed => tracing::info!(target: "workvisor", seq = e.seq, "resumed"),
            EventKind::QueueDrained => tracing::info!(
                target: "workvisor",
                seq = e.seq,
                queue,
                discarded = e.count.unwrap_or(0),
                "queue drained"
            ),
            EventKind::WorkerStarting => tracing::info!(
                target: "workvisor",
                seq = e.seq,
                worker,
                replica = e.replica,
                "worker starting"
            ),
            EventKind::WorkerStopped => tracing::info!(
                target: "workvisor",
                seq = e.seq,
                worker,
                replica = e.replica,
                "worker stopped"
            ),
            EventKind::WorkerFailed => tracing::warn!(
                target: "workvisor",
                seq = e.seq,
                worker,
                replica = e.replica,
                reason,
                "worker failed"
            ),
            EventKind::WorkerPanicked => tracing::error!(
                target: "workvisor",
                seq = e.seq,
                worker,
                replica = e.replica,
                reason,
                "worker panicked"
            ),
            EventKind::PoolStarted => tracing::info!(
                target: "workvisor",
                seq = e.seq,
                worker,
                replicas = e.count.unwrap_or(0),
                "pool started"
            ),
            EventKind::PoolJoined => tracing::info!(
                target: "workvisor",
                seq = e.seq,
                worker,
                replicas = e.count.unwrap_or(0),
                "pool joined"
            ),
            EventKind::ShutdownRequested => {
                tracing::info!(target: "workvisor", seq = e.seq, "shutdown requested")
            }
            EventKind::ShutdownComplete => {
                tracing::info!(target: "workvisor", seq = e.seq, "shutdown complete")
            }
            EventKind::GraceExceeded => {
                tracing::error!(target: "workvisor", seq = e.seq, stuck = reason, "grace exceeded")
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: "workvisor", subscriber = worker, reason, "subscriber overflow")
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(target: "workvisor", subscriber = worker, reason, "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
