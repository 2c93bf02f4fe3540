//! # Run one replica of a worker.
//!
//! Every replica gets a dedicated OS thread from the runtime's blocking pool and drives its
//! body there with [`Handle::block_on`]. A body that blocks synchronously (polling an
//! external resource with a short timeout, sleeping) therefore stalls only its own replica,
//! never its siblings or the runtime workers.
//!
//! ## Event flow
//! ```text
//! WorkerStarting → target.spawn(ctx)
//!                    ├─ Ok(())            → WorkerStopped
//!                    ├─ Err(Canceled)     → WorkerStopped (graceful unwind)
//!                    ├─ Err(Fail/Fatal)   → WorkerFailed
//!                    └─ panic             → WorkerPanicked
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** terminal event per replica that was not aborted.
//! - The runtime never restarts a replica; the exit is only reported.
//! - Abort takes effect at the body's next await point; a body stuck in synchronous
//!   code keeps its thread until it returns.

use std::sync::Arc;

use futures::FutureExt;
use tokio::{runtime::Handle, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    error::TaskError,
    events::{Bus, Event, EventKind},
    subscribers::panic_message,
    workers::{WorkerContext, WorkerRef},
};

/// How a replica terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicaExit {
    /// Body returned `Ok(())` or `Err(TaskError::Canceled)`.
    Stopped,
    /// Body returned another error.
    Failed(TaskError),
    /// Body panicked.
    Panicked(String),
    /// Replica was stopped from outside (join grace exceeded or pool dropped).
    Aborted,
}

impl ReplicaExit {
    /// True for [`ReplicaExit::Stopped`].
    pub fn is_clean(&self) -> bool {
        matches!(self, ReplicaExit::Stopped)
    }
}

/// One running replica: its index, the thread's join handle and an abort switch.
pub(crate) struct ReplicaHandle {
    index: usize,
    abort: CancellationToken,
    join: JoinHandle<ReplicaExit>,
}

impl ReplicaHandle {
    /// Starts replica `ctx.replica()` on its own blocking-pool thread.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn spawn<A, I, O>(
        target: WorkerRef<A, I, O>,
        ctx: WorkerContext<A, I, O>,
        bus: Option<Bus>,
    ) -> Self
    where
        A: Send + Sync + 'static,
        I: Send + 'static,
        O: Send + 'static,
    {
        let index = ctx.replica();
        let abort = CancellationToken::new();
        let stop = abort.clone();
        let runtime = Handle::current();

        let join = tokio::task::spawn_blocking(move || {
            runtime.block_on(async move {
                tokio::select! {
                    biased;
                    _ = stop.cancelled() => ReplicaExit::Aborted,
                    exit = run_replica(target, ctx, bus) => exit,
                }
            })
        });
        Self { index, abort, join }
    }

    /// Replica index within its pool.
    pub(crate) fn index(&self) -> usize {
        self.index
    }

    /// Asks the replica to stop at its next await point.
    pub(crate) fn abort(&self) {
        self.abort.cancel();
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub(crate) fn join_mut(&mut self) -> &mut JoinHandle<ReplicaExit> {
        &mut self.join
    }
}

/// Runs the body of replica `ctx.replica()` to completion.
async fn run_replica<A: 'static, I: 'static, O: 'static>(
    target: WorkerRef<A, I, O>,
    ctx: WorkerContext<A, I, O>,
    bus: Option<Bus>,
) -> ReplicaExit {
    let name: Arc<str> = Arc::from(ctx.name());
    let replica = ctx.replica();
    let event = |kind| Event::new(kind).with_worker(Arc::clone(&name)).with_replica(replica);

    publish(&bus, || event(EventKind::WorkerStarting));

    let fut = target.spawn(ctx);
    match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(())) | Ok(Err(TaskError::Canceled)) => {
            publish(&bus, || event(EventKind::WorkerStopped));
            ReplicaExit::Stopped
        }
        Ok(Err(e)) => {
            publish(&bus, || event(EventKind::WorkerFailed).with_reason(e.to_string()));
            ReplicaExit::Failed(e)
        }
        Err(panic_err) => {
            let info = panic_message(&*panic_err);
            publish(&bus, || event(EventKind::WorkerPanicked).with_reason(info.clone()));
            ReplicaExit::Panicked(info)
        }
    }
}

#[inline]
pub(crate) fn publish(bus: &Option<Bus>, make: impl FnOnce() -> Event) {
    if let Some(bus) = bus {
        bus.publish_with(make);
    }
}
