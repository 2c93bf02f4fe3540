//! # workvisor
//!
//! **Workvisor** runs pools of worker replicas connected by bounded queues, coordinates
//! them through a shared pause/exit switch, and shuts the pipeline down without the
//! classic "join while a replica is blocked on a full queue" deadlock.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐        ┌──────────────┐        ┌──────────────┐
//!     │  WorkerSpec  │        │  WorkerSpec  │        │  WorkerSpec  │
//!     │  (producer)  │        │  (squarer)   │        │  (consumer)  │
//!     └──────┬───────┘        └──────┬───────┘        └──────┬───────┘
//!            ▼                       ▼                       ▼
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │  Orchestrator                                                         │
//! │  - Controller (RUNNING / PAUSED / EXIT_REQUESTED + exit token)        │
//! │  - queues, in registration order (upstream first)                     │
//! │  - WorkerPool per spec                                                │
//! │  - Bus ──► subscriber_listener ──► SubscriberSet                      │
//! └──────┬───────────────────────┬───────────────────────┬────────────────┘
//!        ▼                       ▼                       ▼
//!   replica 0..N            replica 0..M            replica 0..K
//!        │                       │                       │
//!        └──► queue "numbers" ──►┴──► queue "squares" ──►┘
//! ```
//!
//! ### Replica loop
//! ```text
//! while ctx.proceed().await {             // exit? stop. paused? wait.
//!     item = input.get_or_exit(ctrl)      // Err(Drained | Exit) → leave loop
//!     output.put_or_exit(f(item), ctrl)   // Err(Drained | Exit) → leave loop
//! }
//! ```
//!
//! ### Shutdown
//! ```text
//! controller.request_exit()
//!   └─► drain_and_unblock() every queue, downstream first
//!         └─► join every pool (optionally bounded by Config::grace)
//! ```
//!
//! ## Features
//! | Area              | Description                                                 | Key types / traits                          |
//! |-------------------|-------------------------------------------------------------|---------------------------------------------|
//! | **Queues**        | Bounded FIFO with drain-and-unblock and exit-aware waits.   | [`BoundedQueue`], [`Drain`]                 |
//! | **Control**       | Shared pause/resume/exit switch.                            | [`Controller`], [`ControllerState`]         |
//! | **Workers**       | Worker bodies as traits or closures, validated specs.       | [`Worker`], [`WorkerFn`], [`WorkerSpec`]    |
//! | **Pools**         | Spawn and join the replicas of one spec.                    | [`WorkerPool`], [`ReplicaExit`]             |
//! | **Orchestration** | Ordered shutdown of a whole pipeline.                       | [`Orchestrator`], [`Config`]                |
//! | **Subscriber API**| Hook into runtime events (logging, metrics, custom).        | [`Subscribe`], [`Interest`], [`Event`]      |
//! | **Errors**        | Typed errors for creation, lifecycle, queues, workers.      | [`CreationError`], [`PoolError`], ...       |
//!
//! ## Optional features
//! - `logging`: exports the built-in [`LogWriter`] subscriber (structured `tracing` output).
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use workvisor::{BoundedQueue, Controller, TaskError, WorkerContext, WorkerFn, WorkerPool, WorkerSpec};
//!
//! #[tokio::main(flavor = "multi_thread", worker_threads = 2)]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let controller = Controller::new();
//!     let input = BoundedQueue::<i64>::named("numbers", 2);
//!     let output = BoundedQueue::<i64>::named("squares", 2);
//!
//!     let squarer = WorkerFn::new("squarer", |ctx: WorkerContext<(), i64, i64>| async move {
//!         while ctx.proceed().await {
//!             let Ok(n) = ctx.inputs()[0].get_or_exit(ctx.controller()).await else { break };
//!             if ctx.outputs()[0].put_or_exit(n * n, ctx.controller()).await.is_err() {
//!                 break;
//!             }
//!         }
//!         Ok::<_, TaskError>(())
//!     })
//!     .into_ref();
//!
//!     let spec = WorkerSpec::create(
//!         2, squarer, (), vec![input.clone()], vec![output.clone()], controller.clone(),
//!     )?;
//!     let mut pool = WorkerPool::new(spec);
//!     pool.start_workers()?;
//!
//!     input.put(3).await?;
//!     input.put(4).await?;
//!     let mut squares = vec![output.get().await?, output.get().await?];
//!     squares.sort();
//!     assert_eq!(squares, vec![9, 16]);
//!
//!     // exit, then drain downstream → upstream, then join
//!     controller.request_exit();
//!     output.drain_and_unblock();
//!     input.drain_and_unblock();
//!     pool.join_workers().await?;
//!     Ok(())
//! }
//! ```
mod control;
mod core;
mod error;
mod events;
mod queue;
mod subscribers;
mod workers;

// ---- Public re-exports ----

pub use control::{Controller, ControllerState};
pub use core::{Config, Orchestrator, OrchestratorBuilder, ReplicaExit, WorkerPool};
pub use error::{CreationError, PoolError, RuntimeError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use queue::{BoundedQueue, Drain, GetError, PutError};
pub use subscribers::{Interest, Subscribe, SubscriberSet};
pub use workers::{
    Arity, BoxWorkerFuture, Worker, WorkerContext, WorkerFn, WorkerRef, WorkerSpec,
    WorkerSpecBuilder,
};

// Optional: expose the built-in structured logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
