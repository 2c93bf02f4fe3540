//! # Worker pool: spawn and join the replicas of one worker spec.
//!
//! A [`WorkerPool`] owns a validated [`WorkerSpec`] and the join handles of the replicas it
//! spawned. Each replica runs on its own OS thread and receives only shared handles: the
//! fixed arguments, the queues and the controller.
//!
//! ## Lifecycle
//! ```text
//! new(spec) ──► start_workers() ──► join_workers() / join_workers_within(grace)
//!                  │                     │
//!                  │ AlreadyStarted      │ NotStarted (join before start)
//!                  ▼                     ▼
//!            N × run_replica      ReplicaExit per replica, in spawn order
//! ```
//!
//! ## Rules
//! - Replicas are spawned once; a second `start_workers` is rejected.
//! - `join_workers` has no timeout. It returns only after every replica has exited, so a
//!   replica blocked on a queue keeps it waiting until that queue is drained.
//! - `join_workers_within` aborts the replicas still running at the deadline.
//! - Dropping a pool aborts every replica it has not joined.

use std::time::Duration;

use super::replica::{ReplicaExit, ReplicaHandle, publish};
use crate::{
    error::{PoolError, RuntimeError},
    events::{Bus, Event, EventKind},
    subscribers::panic_message,
    workers::WorkerSpec,
};

/// Spawns and joins the replicas described by one [`WorkerSpec`].
///
/// ## Example
/// ```rust
/// use workvisor::{BoundedQueue, Controller, TaskError, WorkerContext, WorkerFn, WorkerPool, WorkerSpec};
///
/// #[tokio::main(flavor = "multi_thread")]
/// async fn main() {
///     let controller = Controller::new();
///     let out = BoundedQueue::<usize>::named("ids", 0);
///     let emit = WorkerFn::new("emit", |ctx: WorkerContext<(), (), usize>| async move {
///         let _ = ctx.outputs()[0].put(ctx.replica()).await;
///         Ok::<_, TaskError>(())
///     })
///     .into_ref();
///
///     let spec = WorkerSpec::create(3, emit, (), vec![], vec![out.clone()], controller).unwrap();
///     let mut pool = WorkerPool::new(spec);
///     pool.start_workers().unwrap();
///     pool.join_workers().await.unwrap();
///     assert_eq!(out.len(), 3);
/// }
/// ```
pub struct WorkerPool<A, I, O> {
    spec: WorkerSpec<A, I, O>,
    bus: Option<Bus>,
    handles: Vec<ReplicaHandle>,
    started: bool,
}

impl<A, I, O> WorkerPool<A, I, O>
where
    A: Send + Sync + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    /// Creates a pool; no replica runs until [`start_workers`](Self::start_workers).
    ///
    /// The spec was validated when it was built, so creation cannot fail.
    pub fn new(spec: WorkerSpec<A, I, O>) -> Self {
        Self {
            spec,
            bus: None,
            handles: Vec::new(),
            started: false,
        }
    }

    /// Creates a pool that publishes replica lifecycle events to `bus`.
    pub fn with_bus(spec: WorkerSpec<A, I, O>, bus: Bus) -> Self {
        Self {
            spec,
            bus: Some(bus),
            handles: Vec::new(),
            started: false,
        }
    }

    /// Spawns `replica_count` replicas, indexed `0..replica_count`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_workers(&mut self) -> Result<(), PoolError> {
        if self.started {
            return Err(PoolError::AlreadyStarted);
        }
        self.started = true;

        let count = self.spec.replica_count();
        self.handles.reserve(count);
        for replica in 0..count {
            let ctx = self.spec.context(replica);
            let target = self.spec.target().clone();
            let bus = self.bus.clone();
            self.handles.push(ReplicaHandle::spawn(target, ctx, bus));
        }

        publish(
            &self.bus,
            || Event::new(EventKind::PoolStarted)
                .with_worker(self.spec.name())
                .with_count(count),
        );
        Ok(())
    }

    /// Waits for every replica to exit. No timeout.
    ///
    /// Returns one [`ReplicaExit`] per replica in index order. Cancel-safe: if this future
    /// is dropped, replicas not yet joined stay in the pool and a later call joins them.
    pub async fn join_workers(&mut self) -> Result<Vec<ReplicaExit>, PoolError> {
        if !self.started {
            return Err(PoolError::NotStarted);
        }

        let mut exits = Vec::with_capacity(self.handles.len());
        while let Some(handle) = self.handles.first_mut() {
            let res = handle.join_mut().await;
            self.handles.remove(0);
            exits.push(self.settle(res));
        }
        self.joined(exits.len());
        Ok(exits)
    }

    /// Like [`join_workers`](Self::join_workers) but bounded by `grace`.
    ///
    /// Replicas still running at the deadline are aborted, [`EventKind::GraceExceeded`] is
    /// published and their `name#replica` labels are returned in
    /// [`RuntimeError::GraceExceeded`].
    pub async fn join_workers_within(
        &mut self,
        grace: Duration,
    ) -> Result<Vec<ReplicaExit>, RuntimeError> {
        if !self.started {
            return Err(PoolError::NotStarted.into());
        }

        let deadline = tokio::time::Instant::now() + grace;
        let mut exits = Vec::with_capacity(self.handles.len());
        let mut stuck = Vec::new();

        while let Some(handle) = self.handles.first_mut() {
            let res = tokio::time::timeout_at(deadline, handle.join_mut()).await;
            let handle = self.handles.remove(0);
            match res {
                Ok(res) => exits.push(self.settle(res)),
                Err(_) => {
                    handle.abort();
                    stuck.push(format!("{}#{}", self.spec.name(), handle.index()));
                }
            }
        }

        if stuck.is_empty() {
            self.joined(exits.len());
            return Ok(exits);
        }

        publish(
            &self.bus,
            || Event::new(EventKind::GraceExceeded)
                .with_worker(self.spec.name())
                .with_count(stuck.len())
                .with_reason(stuck.join(",")),
        );
        Err(RuntimeError::GraceExceeded { grace, stuck })
    }

    /// Number of replicas spawned and not yet finished.
    pub fn running(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// True once [`start_workers`](Self::start_workers) succeeded.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// The spec this pool runs.
    pub fn spec(&self) -> &WorkerSpec<A, I, O> {
        &self.spec
    }

    /// Maps a join result; a join error means the replica thread panicked outside its body
    /// or was cancelled by runtime shutdown.
    fn settle(&self, res: Result<ReplicaExit, tokio::task::JoinError>) -> ReplicaExit {
        match res {
            Ok(exit) => exit,
            Err(err) => {
                let info = if err.is_panic() {
                    panic_message(&*err.into_panic())
                } else {
                    "replica cancelled".to_string()
                };
                publish(
                    &self.bus,
                    || Event::new(EventKind::WorkerPanicked)
                        .with_worker(self.spec.name())
                        .with_reason(info.clone()),
                );
                ReplicaExit::Panicked(info)
            }
        }
    }

    fn joined(&self, count: usize) {
        publish(
            &self.bus,
            || Event::new(EventKind::PoolJoined)
                .with_worker(self.spec.name())
                .with_count(count),
        );
    }
}

impl<A, I, O> Drop for WorkerPool<A, I, O> {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

impl<A: 'static, I: 'static, O: 'static> std::fmt::Debug for WorkerPool<A, I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("spec", &self.spec)
            .field("started", &self.started)
            .field("handles", &self.handles.len())
            .finish()
    }
}
