//! # Worker abstractions and specifications.
//!
//! This module provides the worker-related types:
//! - [`Worker`] - trait for implementing a worker body
//! - [`WorkerFn`] - closure-backed worker implementation
//! - [`WorkerRef`] - shared reference to a worker (`Arc<dyn Worker>`)
//! - [`WorkerContext`] - per-replica handles: queues, controller, fixed arguments
//! - [`WorkerSpec`] - validated descriptor consumed by a [`WorkerPool`](crate::WorkerPool)

mod context;
mod spec;
mod worker;
mod worker_fn;

pub use context::WorkerContext;
pub use spec::{WorkerSpec, WorkerSpecBuilder};
pub use worker::{Arity, BoxWorkerFuture, Worker, WorkerRef};
pub use worker_fn::WorkerFn;
