//! # Function-backed worker (`WorkerFn`)
//!
//! [`WorkerFn`] wraps a closure `F: Fn(WorkerContext<A, I, O>) -> Fut`, producing a fresh
//! future per replica. Replicas share nothing but what the closure captures and the
//! handles inside their context; wrap shared state in `Arc<...>` explicitly.
//!
//! ## Example
//! ```rust
//! use workvisor::{Arity, WorkerContext, WorkerFn, WorkerRef, TaskError, Worker};
//!
//! let w: WorkerRef<(), u32, u32> = WorkerFn::new("echo", |ctx: WorkerContext<(), u32, u32>| async move {
//!     while ctx.proceed().await {
//!         match ctx.inputs()[0].get_or_exit(ctx.controller()).await {
//!             Ok(v) => { let _ = ctx.outputs()[0].put_or_exit(v, ctx.controller()).await; }
//!             Err(_) => break,
//!         }
//!     }
//!     Ok::<_, TaskError>(())
//! })
//! .expecting(Arity::new(1, 1))
//! .into_ref();
//!
//! assert_eq!(w.name(), "echo");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use super::context::WorkerContext;
use super::worker::{Arity, BoxWorkerFuture, Worker, WorkerRef};
use crate::error::TaskError;

/// Function-backed worker implementation.
pub struct WorkerFn<F, A, I, O> {
    name: Cow<'static, str>,
    arity: Option<Arity>,
    f: F,
    _marker: PhantomData<fn(A, I, O)>,
}

impl<F, A, I, O> WorkerFn<F, A, I, O> {
    /// Creates a new function-backed worker.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            arity: None,
            f,
            _marker: PhantomData,
        }
    }

    /// Declares the queue counts this body binds positionally.
    pub fn expecting(mut self, arity: Arity) -> Self {
        self.arity = Some(arity);
        self
    }
}

impl<F, Fut, A, I, O> WorkerFn<F, A, I, O>
where
    F: Fn(WorkerContext<A, I, O>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    A: Send + Sync + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    /// Wraps the worker into a shared [`WorkerRef`].
    pub fn into_ref(self) -> WorkerRef<A, I, O> {
        Arc::new(self)
    }
}

impl<F, Fut, A, I, O> Worker<A, I, O> for WorkerFn<F, A, I, O>
where
    F: Fn(WorkerContext<A, I, O>) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    A: Send + Sync + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> Option<Arity> {
        self.arity
    }

    fn spawn(&self, ctx: WorkerContext<A, I, O>) -> BoxWorkerFuture {
        Box::pin((self.f)(ctx))
    }
}

impl<F, A, I, O> fmt::Debug for WorkerFn<F, A, I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerFn")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}
