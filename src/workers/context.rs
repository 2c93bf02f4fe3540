//! # Per-replica execution context.
//!
//! [`WorkerContext`] is the cancellation context every replica receives. It only
//! holds handles: the queues listed in its [`WorkerSpec`](crate::WorkerSpec), the shared
//! controller, the fixed arguments and the exit token of the current orchestration cycle.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::control::Controller;
use crate::queue::BoundedQueue;

/// Handles given to one replica of a pool.
pub struct WorkerContext<A, I, O> {
    name: Arc<str>,
    replica: usize,
    args: Arc<A>,
    inputs: Arc<[BoundedQueue<I>]>,
    outputs: Arc<[BoundedQueue<O>]>,
    controller: Controller,
    exit: CancellationToken,
}

impl<A, I, O> WorkerContext<A, I, O> {
    pub(crate) fn new(
        name: Arc<str>,
        replica: usize,
        args: Arc<A>,
        inputs: Arc<[BoundedQueue<I>]>,
        outputs: Arc<[BoundedQueue<O>]>,
        controller: Controller,
    ) -> Self {
        let exit = controller.exit_token();
        Self {
            name,
            replica,
            args,
            inputs,
            outputs,
            controller,
            exit,
        }
    }

    /// Worker name shared by all replicas of the pool.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replica index in `0..replica_count`.
    pub fn replica(&self) -> usize {
        self.replica
    }

    /// Fixed arguments of the worker spec (shared by all replicas).
    pub fn args(&self) -> &A {
        &self.args
    }

    /// Input queues, in spec order.
    pub fn inputs(&self) -> &[BoundedQueue<I>] {
        &self.inputs
    }

    /// Output queues, in spec order.
    pub fn outputs(&self) -> &[BoundedQueue<O>] {
        &self.outputs
    }

    /// Input queue at `idx`.
    pub fn input(&self, idx: usize) -> Option<&BoundedQueue<I>> {
        self.inputs.get(idx)
    }

    /// Output queue at `idx`.
    pub fn output(&self, idx: usize) -> Option<&BoundedQueue<O>> {
        self.outputs.get(idx)
    }

    /// Shared controller.
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Exit token of the cycle this replica was spawned in.
    pub fn exit_token(&self) -> &CancellationToken {
        &self.exit
    }

    /// Non-blocking read of the exit flag.
    pub fn is_exit_requested(&self) -> bool {
        self.controller.is_exit_requested()
    }

    /// Waits while the controller is paused.
    pub async fn check_pause(&self) {
        self.controller.check_pause().await
    }

    /// Top-of-iteration check of the worker loop contract.
    ///
    /// Returns `false` once exit is requested; otherwise waits out a pause and returns
    /// whether the loop may run another iteration.
    pub async fn proceed(&self) -> bool {
        if self.controller.is_exit_requested() {
            return false;
        }
        self.controller.check_pause().await;
        !self.controller.is_exit_requested()
    }

    /// `name#replica`.
    pub fn label(&self) -> String {
        format!("{}#{}", self.name, self.replica)
    }
}

impl<A, I, O> Clone for WorkerContext<A, I, O> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            replica: self.replica,
            args: Arc::clone(&self.args),
            inputs: Arc::clone(&self.inputs),
            outputs: Arc::clone(&self.outputs),
            controller: self.controller.clone(),
            exit: self.exit.clone(),
        }
    }
}

impl<A, I, O> fmt::Debug for WorkerContext<A, I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerContext")
            .field("name", &self.name)
            .field("replica", &self.replica)
            .field("inputs", &self.inputs.len())
            .field("outputs", &self.outputs.len())
            .field("controller", &self.controller)
            .finish()
    }
}
