//! # Worker specification.
//!
//! [`WorkerSpec`] is the immutable descriptor of one worker type: the body to run,
//! how many replicas to spawn, the fixed arguments, the ordered input/output queues and
//! the shared controller. It is validated on construction and consumed by exactly one
//! [`WorkerPool`](crate::WorkerPool).
//!
//! A spec can be created:
//! - **Directly** with [`WorkerSpec::create`]
//! - **Fluently** with [`WorkerSpec::builder`]
//!
//! ## Rules
//! - `replica_count == 0` → [`CreationError::InvalidReplicaCount`]
//! - empty worker name, or queue counts differing from the worker's declared
//!   [`Arity`](crate::Arity) → [`CreationError::InvalidTarget`]
//! - nothing escapes on failure: arguments are dropped, nothing is spawned

use std::fmt;
use std::sync::Arc;

use super::context::WorkerContext;
use super::worker::WorkerRef;
use crate::control::Controller;
use crate::error::CreationError;
use crate::queue::BoundedQueue;

/// Validated descriptor of one worker type.
///
/// ## Example
/// ```rust
/// use workvisor::{BoundedQueue, Controller, CreationError, TaskError, WorkerContext, WorkerFn, WorkerSpec};
///
/// let controller = Controller::new();
/// let input = BoundedQueue::<i64>::named("numbers", 2);
/// let output = BoundedQueue::<i64>::named("squares", 2);
/// let squarer = WorkerFn::new("squarer", |_ctx: WorkerContext<(), i64, i64>| async {
///     Ok::<_, TaskError>(())
/// })
/// .into_ref();
///
/// let spec = WorkerSpec::create(2, squarer.clone(), (), vec![input.clone()], vec![output.clone()], controller.clone())
///     .expect("valid");
/// assert_eq!(spec.replica_count(), 2);
///
/// let err = WorkerSpec::create(0, squarer, (), vec![input], vec![output], controller).unwrap_err();
/// assert_eq!(err, CreationError::InvalidReplicaCount { count: 0 });
/// ```
pub struct WorkerSpec<A, I, O> {
    replica_count: usize,
    target: WorkerRef<A, I, O>,
    fixed_args: Arc<A>,
    inputs: Arc<[BoundedQueue<I>]>,
    outputs: Arc<[BoundedQueue<O>]>,
    controller: Controller,
}

impl<A: 'static, I: 'static, O: 'static> WorkerSpec<A, I, O> {
    /// Validates and builds a spec.
    pub fn create(
        replica_count: usize,
        target: WorkerRef<A, I, O>,
        fixed_args: A,
        input_queues: Vec<BoundedQueue<I>>,
        output_queues: Vec<BoundedQueue<O>>,
        controller: Controller,
    ) -> Result<Self, CreationError> {
        if replica_count == 0 {
            return Err(CreationError::InvalidReplicaCount {
                count: replica_count,
            });
        }
        validate_target(&target, input_queues.len(), output_queues.len())?;

        Ok(Self {
            replica_count,
            target,
            fixed_args: Arc::new(fixed_args),
            inputs: input_queues.into(),
            outputs: output_queues.into(),
            controller,
        })
    }

    /// Starts a fluent builder with one replica and no queues.
    pub fn builder(
        target: WorkerRef<A, I, O>,
        fixed_args: A,
        controller: Controller,
    ) -> WorkerSpecBuilder<A, I, O> {
        WorkerSpecBuilder {
            replica_count: 1,
            target,
            fixed_args,
            inputs: Vec::new(),
            outputs: Vec::new(),
            controller,
        }
    }

    /// Worker name.
    pub fn name(&self) -> &str {
        self.target.name()
    }

    /// Number of replicas a pool spawns for this spec.
    pub fn replica_count(&self) -> usize {
        self.replica_count
    }

    /// Worker body.
    pub fn target(&self) -> &WorkerRef<A, I, O> {
        &self.target
    }

    /// Fixed arguments shared by every replica.
    pub fn fixed_args(&self) -> &A {
        &self.fixed_args
    }

    /// Input queues, in binding order.
    pub fn input_queues(&self) -> &[BoundedQueue<I>] {
        &self.inputs
    }

    /// Output queues, in binding order.
    pub fn output_queues(&self) -> &[BoundedQueue<O>] {
        &self.outputs
    }

    /// Shared controller.
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Context handed to replica `replica`.
    pub(crate) fn context(&self, replica: usize) -> WorkerContext<A, I, O> {
        WorkerContext::new(
            Arc::from(self.name()),
            replica,
            Arc::clone(&self.fixed_args),
            Arc::clone(&self.inputs),
            Arc::clone(&self.outputs),
            self.controller.clone(),
        )
    }
}

impl<A: 'static, I: 'static, O: 'static> fmt::Debug for WorkerSpec<A, I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerSpec")
            .field("name", &self.name())
            .field("replica_count", &self.replica_count)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish()
    }
}

/// Fluent builder for [`WorkerSpec`]; validation happens in [`build`](Self::build).
pub struct WorkerSpecBuilder<A, I, O> {
    replica_count: usize,
    target: WorkerRef<A, I, O>,
    fixed_args: A,
    inputs: Vec<BoundedQueue<I>>,
    outputs: Vec<BoundedQueue<O>>,
    controller: Controller,
}

impl<A: 'static, I: 'static, O: 'static> WorkerSpecBuilder<A, I, O> {
    /// Sets the replica count.
    pub fn replicas(mut self, count: usize) -> Self {
        self.replica_count = count;
        self
    }

    /// Appends an input queue.
    pub fn input(mut self, queue: BoundedQueue<I>) -> Self {
        self.inputs.push(queue);
        self
    }

    /// Appends an output queue.
    pub fn output(mut self, queue: BoundedQueue<O>) -> Self {
        self.outputs.push(queue);
        self
    }

    /// Validates and builds the [`WorkerSpec`].
    pub fn build(self) -> Result<WorkerSpec<A, I, O>, CreationError> {
        WorkerSpec::create(
            self.replica_count,
            self.target,
            self.fixed_args,
            self.inputs,
            self.outputs,
            self.controller,
        )
    }
}

fn validate_target<A: 'static, I: 'static, O: 'static>(
    target: &WorkerRef<A, I, O>,
    inputs: usize,
    outputs: usize,
) -> Result<(), CreationError> {
    let name = target.name();
    if name.trim().is_empty() {
        return Err(CreationError::InvalidTarget {
            name: name.to_owned(),
            reason: "worker name must not be empty".into(),
        });
    }
    match target.arity() {
        Some(arity) if arity.inputs != inputs || arity.outputs != outputs => {
            Err(CreationError::InvalidTarget {
                name: name.to_owned(),
                reason: format!(
                    "expects {} input and {} output queues, got {inputs} and {outputs}",
                    arity.inputs, arity.outputs
                ),
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::workers::{Arity, WorkerFn};

    fn noop(name: &'static str, arity: Option<Arity>) -> WorkerRef<(), u8, u8> {
        let w = WorkerFn::new(name, |_ctx: WorkerContext<(), u8, u8>| {
            std::future::ready(Ok::<_, TaskError>(()))
        });
        match arity {
            Some(a) => w.expecting(a).into_ref(),
            None => w.into_ref(),
        }
    }

    #[test]
    fn zero_replicas_rejected() {
        let err = WorkerSpec::create(
            0,
            noop("w", None),
            (),
            vec![],
            vec![],
            Controller::new(),
        )
        .unwrap_err();
        assert_eq!(err, CreationError::InvalidReplicaCount { count: 0 });
    }

    #[test]
    fn empty_name_rejected() {
        let err = WorkerSpec::create(1, noop(" ", None), (), vec![], vec![], Controller::new())
            .unwrap_err();
        assert_eq!(err.as_label(), "creation_invalid_target");
    }

    #[test]
    fn arity_mismatch_rejected() {
        let target = noop("squarer", Some(Arity::new(1, 1)));
        let err = WorkerSpec::builder(target, (), Controller::new())
            .replicas(2)
            .input(BoundedQueue::new(1))
            .build()
            .unwrap_err();
        match err {
            CreationError::InvalidTarget { name, reason } => {
                assert_eq!(name, "squarer");
                assert!(reason.contains("got 1 and 0"), "{reason}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn builder_keeps_queue_order() {
        let target = noop("router", Some(Arity::new(2, 1)));
        let spec = WorkerSpec::builder(target, (), Controller::new())
            .replicas(3)
            .input(BoundedQueue::named("a", 1))
            .input(BoundedQueue::named("b", 1))
            .output(BoundedQueue::named("out", 1))
            .build()
            .unwrap();

        assert_eq!(spec.name(), "router");
        assert_eq!(spec.replica_count(), 3);
        let names: Vec<_> = spec.input_queues().iter().map(|q| q.name()).collect();
        assert_eq!(names, ["a", "b"]);

        let ctx = spec.context(2);
        assert_eq!(ctx.label(), "router#2");
        assert_eq!(ctx.outputs().len(), 1);
    }
}
