use super::BoundedQueue;

/// Type-erased view of a queue used by the shutdown sequence.
///
/// Lets the [`Orchestrator`](crate::Orchestrator) drain queues of different item types
/// in one ordered list.
pub trait Drain: Send + Sync + 'static {
    /// Queue name.
    fn name(&self) -> &str;

    /// Releases every blocked producer/consumer and empties the queue.
    /// Returns the number of discarded items.
    fn drain_and_unblock(&self) -> usize;

    /// Advisory emptiness check.
    fn is_empty(&self) -> bool;
}

impl<T: Send + 'static> Drain for BoundedQueue<T> {
    fn name(&self) -> &str {
        BoundedQueue::name(self)
    }

    fn drain_and_unblock(&self) -> usize {
        BoundedQueue::drain_and_unblock(self)
    }

    fn is_empty(&self) -> bool {
        BoundedQueue::is_empty(self)
    }
}
