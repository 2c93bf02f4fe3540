use std::fmt;

use thiserror::Error;

/// Error returned by the `put` family on [`BoundedQueue`](crate::BoundedQueue).
///
/// Every variant hands the rejected item back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutError<T> {
    /// Queue was at capacity (`try_put` only).
    Full(T),

    /// Producer was released by `drain_and_unblock` while waiting for capacity.
    Drained(T),

    /// Exit was requested while waiting for capacity (`put_or_exit` only).
    Exit(T),
}

impl<T> fmt::Display for PutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PutError::Full(_) => "queue full",
            PutError::Drained(_) => "released by drain while waiting for capacity",
            PutError::Exit(_) => "exit requested while waiting for capacity",
        })
    }
}

impl<T: fmt::Debug> std::error::Error for PutError<T> {}

impl<T> PutError<T> {
    /// Recovers the item that was not enqueued.
    pub fn into_inner(self) -> T {
        match self {
            PutError::Full(t) | PutError::Drained(t) | PutError::Exit(t) => t,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            PutError::Full(_) => "queue_full",
            PutError::Drained(_) => "queue_drained",
            PutError::Exit(_) => "queue_exit",
        }
    }
}

/// Error returned by the `get` family on [`BoundedQueue`](crate::BoundedQueue).
///
/// `Drained` is the sentinel a blocked consumer receives when the queue is drained
/// for shutdown.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GetError {
    /// Queue was empty (`try_get` only).
    #[error("queue empty")]
    Empty,

    /// Consumer was released by `drain_and_unblock` while waiting for an item.
    #[error("released by drain while waiting for an item")]
    Drained,

    /// Exit was requested while waiting for an item (`get_or_exit` only).
    #[error("exit requested while waiting for an item")]
    Exit,
}

impl GetError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            GetError::Empty => "queue_empty",
            GetError::Drained => "queue_drained",
            GetError::Exit => "queue_exit",
        }
    }
}
