//! # Worker abstraction.
//!
//! A [`Worker`] is the body every replica of a pool runs. It receives a
//! [`WorkerContext`] holding handles to exactly the queues named in its spec and to the
//! shared [`Controller`](crate::Controller), and follows the cooperative loop contract:
//!
//! ```text
//! while ctx.proceed().await {      // false once exit is requested; waits out pauses
//!     one bounded unit of work     // receive / process / send
//! }
//! ```
//!
//! The body must never wait on anything the controller cannot interrupt: use the
//! `*_or_exit` queue operations or poll external resources with short timeouts.
//!
//! ## Queues carrying different kinds of items
//! Every input queue of a worker carries `I` and every output queue carries `O`. A worker
//! fed from streams of different shapes wraps them in one enum and lets each queue carry
//! the variant its producer writes:
//!
//! ```
//! use workvisor::{BoundedQueue, Controller, TaskError, WorkerContext, WorkerFn, WorkerSpec};
//!
//! #[derive(Debug)]
//! enum Inbound {
//!     Telemetry(f64),
//!     Command(String),
//! }
//!
//! let telemetry = BoundedQueue::<Inbound>::named("telemetry", 16);
//! let commands = BoundedQueue::<Inbound>::named("commands", 4);
//!
//! let router = WorkerFn::new("router", |ctx: WorkerContext<(), Inbound, String>| async move {
//!     while ctx.proceed().await {
//!         for input in ctx.inputs() {
//!             let line = match input.try_get() {
//!                 Ok(Inbound::Telemetry(v)) => format!("reading {v}"),
//!                 Ok(Inbound::Command(c)) => format!("command {c}"),
//!                 Err(_) => continue,
//!             };
//!             if ctx.outputs()[0].put_or_exit(line, ctx.controller()).await.is_err() {
//!                 return Ok(());
//!             }
//!         }
//!         tokio::time::sleep(std::time::Duration::from_millis(5)).await;
//!     }
//!     Ok::<_, TaskError>(())
//! })
//! .into_ref();
//!
//! let spec = WorkerSpec::create(
//!     1,
//!     router,
//!     (),
//!     vec![telemetry, commands],
//!     vec![BoundedQueue::named("log", 0)],
//!     Controller::new(),
//! );
//! assert!(spec.is_ok());
//! ```

use std::{future::Future, pin::Pin, sync::Arc};

use super::context::WorkerContext;
use crate::error::TaskError;

/// Boxed future returned by [`Worker::spawn`].
pub type BoxWorkerFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send + 'static>>;

/// Shared handle to a worker object.
pub type WorkerRef<A, I, O> = Arc<dyn Worker<A, I, O>>;

/// Number of input and output queues a worker binds positionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    /// Expected input queue count.
    pub inputs: usize,
    /// Expected output queue count.
    pub outputs: usize,
}

impl Arity {
    /// Creates an arity.
    pub const fn new(inputs: usize, outputs: usize) -> Self {
        Self { inputs, outputs }
    }
}

/// # Replica body.
///
/// `A` is the fixed-argument type, `I` the input item type, `O` the output item type.
///
/// # Example
/// ```
/// use workvisor::{BoxWorkerFuture, TaskError, Worker, WorkerContext};
///
/// struct Doubler;
///
/// impl Worker<(), i64, i64> for Doubler {
///     fn name(&self) -> &str { "doubler" }
///
///     fn spawn(&self, ctx: WorkerContext<(), i64, i64>) -> BoxWorkerFuture {
///         Box::pin(async move {
///             while ctx.proceed().await {
///                 let Ok(v) = ctx.inputs()[0].get_or_exit(ctx.controller()).await else { break };
///                 if ctx.outputs()[0].put_or_exit(v * 2, ctx.controller()).await.is_err() {
///                     break;
///                 }
///             }
///             Ok::<_, TaskError>(())
///         })
///     }
/// }
/// ```
pub trait Worker<A, I, O>: Send + Sync + 'static {
    /// Returns a stable, human-readable worker name.
    fn name(&self) -> &str;

    /// Queue counts the body expects, if it binds queues positionally.
    ///
    /// `None` accepts any number of queues.
    fn arity(&self) -> Option<Arity> {
        None
    }

    /// Creates the future of one replica.
    fn spawn(&self, ctx: WorkerContext<A, I, O>) -> BoxWorkerFuture;
}
