//! # Orchestrator: owns the queues and pools of one pipeline and shuts them down in order.
//!
//! The [`Orchestrator`] owns the event bus, the shared [`Controller`], every registered
//! queue and every worker pool. It forwards bus events to the configured subscribers and
//! runs the shutdown sequence that avoids the join-while-blocked deadlock.
//!
//! ## Registration order
//! Queues are registered in pipeline order, upstream first. Shutdown drains them in the
//! reverse order: downstream queues are released first, so an upstream producer is never
//! left feeding a full queue whose consumer already left.
//!
//! ## Shutdown path
//! ```text
//! shutdown()
//!   ├─► Bus.publish(ShutdownRequested)
//!   ├─► controller.request_exit()          (replicas see exit; exit-aware waits wake)
//!   ├─► for q in queues.rev(): q.drain_and_unblock()
//!   ├─► for pool in pools: join (bounded by Config::grace when non-zero)
//!   │        └─ deadline exceeded → abort stuck replicas → RuntimeError::GraceExceeded
//!   └─► Bus.publish(ShutdownComplete) → flush subscribers
//! ```
//!
//! ## Creation is all-or-nothing
//! If [`Orchestrator::add_workers`] rejects a spec, the orchestrator is poisoned and
//! [`Orchestrator::start`] refuses to start any pool.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::{sync::broadcast, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use super::{
    builder::OrchestratorBuilder,
    config::Config,
    pool::WorkerPool,
    replica::ReplicaExit,
};
use crate::{
    control::Controller,
    error::{CreationError, PoolError, RuntimeError},
    events::{Bus, Event, EventKind},
    queue::{BoundedQueue, Drain},
    subscribers::{Subscribe, SubscriberSet},
    workers::{WorkerRef, WorkerSpec},
};

/// Type-erased pool so pools of different `(A, I, O)` live in one list.
#[async_trait]
trait ManagedPool: Send {
    fn start(&mut self) -> Result<(), PoolError>;
    async fn join(&mut self) -> Result<Vec<ReplicaExit>, PoolError>;
    async fn join_within(&mut self, grace: Duration) -> Result<Vec<ReplicaExit>, RuntimeError>;
}

#[async_trait]
impl<A, I, O> ManagedPool for WorkerPool<A, I, O>
where
    A: Send + Sync + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    fn start(&mut self) -> Result<(), PoolError> {
        self.start_workers()
    }

    async fn join(&mut self) -> Result<Vec<ReplicaExit>, PoolError> {
        self.join_workers().await
    }

    async fn join_within(&mut self, grace: Duration) -> Result<Vec<ReplicaExit>, RuntimeError> {
        self.join_workers_within(grace).await
    }
}

/// Owns the queues and pools of a pipeline and coordinates its shutdown.
///
/// ## Example
/// ```rust
/// use workvisor::{Config, Orchestrator, TaskError, WorkerContext, WorkerFn};
///
/// #[tokio::main(flavor = "multi_thread", worker_threads = 2)]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut orch = Orchestrator::new(Config::default());
///     let numbers = orch.queue::<i64>("numbers", 2);
///     let squares = orch.queue::<i64>("squares", 2);
///
///     let squarer = WorkerFn::new("squarer", |ctx: WorkerContext<(), i64, i64>| async move {
///         while ctx.proceed().await {
///             let Ok(n) = ctx.inputs()[0].get_or_exit(ctx.controller()).await else { break };
///             if ctx.outputs()[0].put_or_exit(n * n, ctx.controller()).await.is_err() {
///                 break;
///             }
///         }
///         Ok::<_, TaskError>(())
///     })
///     .into_ref();
///
///     orch.add_workers(2, squarer, (), vec![numbers.clone()], vec![squares.clone()])?;
///     orch.start()?;
///
///     numbers.put(3).await?;
///     numbers.put(4).await?;
///     let mut got = vec![squares.get().await?, squares.get().await?];
///     got.sort();
///     assert_eq!(got, vec![9, 16]);
///
///     orch.shutdown().await?;
///     Ok(())
/// }
/// ```
pub struct Orchestrator {
    cfg: Config,
    bus: Bus,
    controller: Controller,
    queues: Vec<Arc<dyn Drain>>,
    pools: Vec<Box<dyn ManagedPool>>,
    poisoned: Option<CreationError>,
    started: bool,
    listener: Option<(CancellationToken, JoinHandle<()>)>,
}

impl Orchestrator {
    /// Creates an orchestrator without subscribers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(cfg: Config) -> Self {
        OrchestratorBuilder::new(cfg).build()
    }

    /// Returns a builder for configuring subscribers.
    pub fn builder(cfg: Config) -> OrchestratorBuilder {
        OrchestratorBuilder::new(cfg)
    }

    pub(super) fn new_internal(cfg: Config, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let controller = Controller::with_bus(bus.clone());

        let listener = if subscribers.is_empty() {
            None
        } else {
            let set = SubscriberSet::new(subscribers, bus.clone());
            let token = CancellationToken::new();
            let handle = subscriber_listener(bus.subscribe(), set, token.clone());
            Some((token, handle))
        };

        Self {
            cfg,
            bus,
            controller,
            queues: Vec::new(),
            pools: Vec::new(),
            poisoned: None,
            started: false,
            listener,
        }
    }

    /// The shared controller. Specs added through [`add_pool`](Self::add_pool) must use it.
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// The event bus.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// The configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Creates and registers a queue. `capacity == 0` means unbounded.
    ///
    /// Register queues upstream first; shutdown drains them in reverse.
    pub fn queue<T: Send + 'static>(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        capacity: usize,
    ) -> BoundedQueue<T> {
        let queue = BoundedQueue::with_bus(name, capacity, self.bus.clone());
        self.register_queue(&queue);
        queue
    }

    /// Creates and registers a queue with [`Config::queue_capacity`].
    pub fn queue_default<T: Send + 'static>(
        &mut self,
        name: impl Into<Cow<'static, str>>,
    ) -> BoundedQueue<T> {
        self.queue(name, self.cfg.queue_capacity)
    }

    /// Registers a queue created elsewhere so shutdown drains it.
    pub fn register_queue<T: Send + 'static>(&mut self, queue: &BoundedQueue<T>) {
        self.queues.push(Arc::new(queue.clone()));
    }

    /// Builds a spec on the shared controller and adds its pool.
    ///
    /// On failure the orchestrator is poisoned: the error is returned here and
    /// [`start`](Self::start) will refuse to start anything.
    pub fn add_workers<A, I, O>(
        &mut self,
        replica_count: usize,
        target: WorkerRef<A, I, O>,
        fixed_args: A,
        input_queues: Vec<BoundedQueue<I>>,
        output_queues: Vec<BoundedQueue<O>>,
    ) -> Result<(), CreationError>
    where
        A: Send + Sync + 'static,
        I: Send + 'static,
        O: Send + 'static,
    {
        let spec = WorkerSpec::create(
            replica_count,
            target,
            fixed_args,
            input_queues,
            output_queues,
            self.controller.clone(),
        );
        match spec {
            Ok(spec) => self.add_pool(spec),
            Err(err) => Err(self.poison(err)),
        }
    }

    /// Adds a pool for an already validated spec.
    ///
    /// The spec must have been built on [`controller`](Self::controller); a spec bound to
    /// another controller is rejected with [`CreationError::ForeignController`] and poisons
    /// the orchestrator, since shutdown could never make its replicas exit.
    pub fn add_pool<A, I, O>(&mut self, spec: WorkerSpec<A, I, O>) -> Result<(), CreationError>
    where
        A: Send + Sync + 'static,
        I: Send + 'static,
        O: Send + 'static,
    {
        if !spec.controller().same_as(&self.controller) {
            return Err(self.poison(CreationError::ForeignController {
                name: spec.name().to_string(),
            }));
        }
        self.pools
            .push(Box::new(WorkerPool::with_bus(spec, self.bus.clone())));
        Ok(())
    }

    fn poison(&mut self, err: CreationError) -> CreationError {
        self.poisoned.get_or_insert_with(|| err.clone());
        err
    }

    /// The first creation error, if any spec was rejected.
    pub fn poisoned(&self) -> Option<&CreationError> {
        self.poisoned.as_ref()
    }

    /// Starts every pool in registration order.
    pub fn start(&mut self) -> Result<(), PoolError> {
        if self.poisoned.is_some() {
            return Err(PoolError::Poisoned);
        }
        if self.started {
            return Err(PoolError::AlreadyStarted);
        }
        self.started = true;
        for pool in &mut self.pools {
            pool.start()?;
        }
        Ok(())
    }

    /// Requests exit, drains every queue downstream-first and joins every pool.
    ///
    /// With `Config::grace == 0` the join waits without a deadline. Otherwise all pools
    /// share one deadline; replicas still running at it are aborted and listed in
    /// [`RuntimeError::GraceExceeded`].
    pub async fn shutdown(&mut self) -> Result<(), RuntimeError> {
        if !self.started {
            return Err(PoolError::NotStarted.into());
        }

        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.controller.request_exit();
        for queue in self.queues.iter().rev() {
            queue.drain_and_unblock();
        }

        let deadline = self
            .cfg
            .join_grace()
            .map(|grace| tokio::time::Instant::now() + grace);
        let mut stuck = Vec::new();
        for pool in &mut self.pools {
            match deadline {
                None => {
                    pool.join().await?;
                }
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(tokio::time::Instant::now());
                    match pool.join_within(left).await {
                        Ok(_) => {}
                        Err(RuntimeError::GraceExceeded { stuck: s, .. }) => stuck.extend(s),
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        let result = if stuck.is_empty() {
            self.bus.publish(Event::new(EventKind::ShutdownComplete));
            Ok(())
        } else {
            Err(RuntimeError::GraceExceeded {
                grace: self.cfg.grace,
                stuck,
            })
        };
        self.flush_subscribers().await;
        result
    }

    /// Stops the subscriber listener after delivering every event already published.
    async fn flush_subscribers(&mut self) {
        if let Some((token, handle)) = self.listener.take() {
            token.cancel();
            let _ = handle.await;
        }
    }
}

// Stops the subscriber listener. The pools drop right after and abort any replica still
// running, so a dropped orchestrator leaves no replica behind.
impl Drop for Orchestrator {
    fn drop(&mut self) {
        if let Some((token, _)) = &self.listener {
            token.cancel();
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("cfg", &self.cfg)
            .field("controller", &self.controller)
            .field("queues", &self.queues.len())
            .field("pools", &self.pools.len())
            .field("poisoned", &self.poisoned)
            .field("started", &self.started)
            .finish()
    }
}

/// Subscribes to the bus and forwards events to the subscriber set (fire-and-forget).
///
/// On cancellation, events already buffered are still forwarded before the set shuts down.
fn subscriber_listener(
    mut rx: broadcast::Receiver<Event>,
    set: SubscriberSet,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                res = rx.recv() => match res {
                    Ok(ev) => set.emit(&ev),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = token.cancelled() => {
                    while let Ok(ev) = rx.try_recv() {
                        set.emit(&ev);
                    }
                    break;
                }
            }
        }
        set.shutdown().await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::TaskError, workers::{WorkerContext, WorkerFn}};

    fn idle() -> WorkerRef<(), u8, u8> {
        WorkerFn::new("idle", |ctx: WorkerContext<(), u8, u8>| async move {
            ctx.controller().exit_requested().await;
            Ok::<_, TaskError>(())
        })
        .into_ref()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn rejected_spec_poisons_start() {
        let mut orch = Orchestrator::new(Config::default());
        orch.add_workers(1, idle(), (), vec![], vec![]).unwrap();
        let err = orch.add_workers(0, idle(), (), vec![], vec![]).unwrap_err();
        assert_eq!(err, CreationError::InvalidReplicaCount { count: 0 });
        assert_eq!(orch.poisoned(), Some(&err));
        assert_eq!(orch.start().unwrap_err(), PoolError::Poisoned);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shutdown_before_start_is_rejected() {
        let mut orch = Orchestrator::new(Config::default());
        let err = orch.shutdown().await.unwrap_err();
        assert_eq!(err.as_label(), "pool_not_started");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn queue_default_uses_configured_capacity() {
        let mut orch = Orchestrator::new(Config {
            queue_capacity: 3,
            ..Config::default()
        });
        let q = orch.queue_default::<u8>("q");
        assert_eq!(q.capacity(), 3);
        assert_eq!(q.name(), "q");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn start_then_shutdown_requests_exit() {
        let mut orch = Orchestrator::new(Config::default());
        orch.add_workers(2, idle(), (), vec![], vec![]).unwrap();
        orch.start().unwrap();
        assert_eq!(orch.start().unwrap_err(), PoolError::AlreadyStarted);
        orch.shutdown().await.unwrap();
        assert!(orch.controller().is_exit_requested());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn spec_on_foreign_controller_is_rejected() {
        let mut orch = Orchestrator::new(Config::default());
        let own = WorkerSpec::create(1, idle(), (), vec![], vec![], orch.controller().clone())
            .unwrap();
        orch.add_pool(own).unwrap();

        let foreign = WorkerSpec::create(1, idle(), (), vec![], vec![], Controller::new()).unwrap();
        let err = orch.add_pool(foreign).unwrap_err();
        assert_eq!(
            err,
            CreationError::ForeignController {
                name: "idle".to_string()
            }
        );
        assert_eq!(err.as_label(), "creation_foreign_controller");
        assert_eq!(orch.start().unwrap_err(), PoolError::Poisoned);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn dropping_a_started_orchestrator_stops_its_replicas() {
        let consumed = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen = consumed.clone();
        let consumer = WorkerFn::new("consumer", move |ctx: WorkerContext<(), u8, ()>| {
            let seen = seen.clone();
            async move {
                while ctx.inputs()[0].get().await.is_ok() {
                    seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                }
                Ok::<_, TaskError>(())
            }
        })
        .into_ref();

        let mut orch = Orchestrator::new(Config::default());
        let input = orch.queue::<u8>("input", 4);
        orch.add_workers(2, consumer, (), vec![input.clone()], vec![])
            .unwrap();
        orch.start().unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;

        drop(orch);
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        input.try_put(7).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert_eq!(consumed.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(input.len(), 1);
    }
}
