//! Error types used by the workvisor runtime and by worker bodies.
//!
//! This module defines the orchestration-level error enums:
//!
//! - [`CreationError`]: invalid worker specifications, reported before anything is spawned.
//! - [`PoolError`]: misuse of a [`WorkerPool`](crate::WorkerPool) lifecycle.
//! - [`RuntimeError`]: failures of the shutdown sequence itself.
//! - [`TaskError`]: errors returned by individual worker bodies.
//!
//! Queue operations have their own error types, see [`PutError`](crate::PutError) and
//! [`GetError`](crate::GetError).
//!
//! All types provide `as_label` for logs/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced while building a worker specification.
///
/// Creation is all-or-nothing: when one of these is returned no spec, pool or
/// replica exists for the rejected input.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CreationError {
    /// Replica count must be strictly positive.
    #[error("invalid replica count {count}; at least one replica is required")]
    InvalidReplicaCount {
        /// The rejected count.
        count: usize,
    },

    /// The target cannot be invoked with the supplied queues.
    #[error("invalid target {name:?}: {reason}")]
    InvalidTarget {
        /// Target name as reported by [`Worker::name`](crate::Worker::name).
        name: String,
        /// Why the target was rejected.
        reason: String,
    },

    /// The spec was built on a controller the orchestrator does not own, so its
    /// replicas would never observe the orchestrator's exit request.
    #[error("worker {name:?} uses a controller not owned by this orchestrator")]
    ForeignController {
        /// Target name of the rejected spec.
        name: String,
    },
}

impl CreationError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use workvisor::CreationError;
    ///
    /// let err = CreationError::InvalidReplicaCount { count: 0 };
    /// assert_eq!(err.as_label(), "creation_invalid_replica_count");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            CreationError::InvalidReplicaCount { .. } => "creation_invalid_replica_count",
            CreationError::InvalidTarget { .. } => "creation_invalid_target",
            CreationError::ForeignController { .. } => "creation_foreign_controller",
        }
    }
}

/// # Errors produced by pool lifecycle misuse.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// `start_workers` was called on a pool that already spawned its replicas.
    #[error("workers already started")]
    AlreadyStarted,

    /// `join_workers` was called before `start_workers`.
    #[error("workers not started")]
    NotStarted,

    /// A pool failed to build earlier; no pool may be started.
    #[error("orchestration poisoned by an earlier creation failure")]
    Poisoned,
}

impl PoolError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            PoolError::AlreadyStarted => "pool_already_started",
            PoolError::NotStarted => "pool_not_started",
            PoolError::Poisoned => "pool_poisoned",
        }
    }
}

/// # Errors produced by the shutdown sequence.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Join grace period was exceeded; the listed replicas were aborted.
    #[error("join timeout {grace:?} exceeded; stuck: {stuck:?}; forcing termination")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Labels (`name#replica`) of replicas that did not finish in time.
        stuck: Vec<String>,
    },

    /// A pool was driven out of its lifecycle order.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use workvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Pool(e) => e.as_label(),
        }
    }
}

/// # Errors returned by worker bodies.
///
/// The runtime never retries a worker; the variant only changes how the exit is reported.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Unrecoverable failure (e.g. the external resource the worker drives is gone).
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Ordinary failure of the worker body.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Worker unwound because exit was requested.
    #[error("exit requested")]
    Canceled,
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fatal { .. } => "task_fatal",
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// True for [`TaskError::Fatal`].
    pub fn is_fatal(&self) -> bool {
        matches!(self, TaskError::Fatal { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(
            CreationError::InvalidTarget {
                name: "x".into(),
                reason: "y".into()
            }
            .as_label(),
            "creation_invalid_target"
        );
        assert_eq!(PoolError::AlreadyStarted.as_label(), "pool_already_started");
        assert_eq!(
            RuntimeError::from(PoolError::NotStarted).as_label(),
            "pool_not_started"
        );
        assert_eq!(TaskError::Canceled.as_label(), "task_canceled");
    }

    #[test]
    fn only_fatal_is_fatal() {
        assert!(TaskError::Fatal { error: "gone".into() }.is_fatal());
        assert!(!TaskError::Fail { error: "boom".into() }.is_fatal());
        assert!(!TaskError::Canceled.is_fatal());
    }

    #[test]
    fn display_mentions_count() {
        let err = CreationError::InvalidReplicaCount { count: 0 };
        assert!(err.to_string().contains("invalid replica count 0"));
    }
}
