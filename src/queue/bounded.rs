//! # BoundedQueue: shared FIFO with an optional capacity bound.
//!
//! All handles share one `Mutex<VecDeque<T>>` plus two [`Notify`] wake-lists
//! (`not_empty` for consumers, `not_full` for producers).
//!
//! ## Waiting protocol
//! ```text
//! loop {
//!   ├─► register on the wake-list (Notify::enable)
//!   ├─► lock
//!   │     ├─ drain epoch moved since first look ─► Err(Drained)
//!   │     ├─ operation possible                 ─► do it, wake the other side, Ok
//!   │     └─ exit token cancelled (…_or_exit)   ─► Err(Exit)
//!   └─► unlock, await wake-up (or exit)
//! }
//! ```
//!
//! ## Rules
//! - Registering before checking means no wake-up is lost between check and wait.
//! - Wake-ups use `notify_waiters`; every waiter re-checks under the lock.
//! - A waiter remembers the drain epoch it first observed; `drain_and_unblock` bumps
//!   the epoch under the same lock that empties the queue, so every operation that was
//!   waiting before the drain is released and nothing enqueued before it survives.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use super::error::{GetError, PutError};
use crate::control::Controller;
use crate::events::{Bus, Event, EventKind};

struct State<T> {
    items: VecDeque<T>,
    epoch: u64,
}

struct Inner<T> {
    name: Cow<'static, str>,
    /// `0` = unbounded.
    capacity: usize,
    state: Mutex<State<T>>,
    not_empty: Notify,
    not_full: Notify,
    bus: Option<Bus>,
}

/// Cross-replica FIFO channel with an optional capacity bound.
///
/// Cloning yields another handle to the same queue. Many producers and many
/// consumers may use it concurrently; each item is delivered exactly once.
///
/// ## Example
/// ```rust
/// use workvisor::{BoundedQueue, GetError};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let q = BoundedQueue::named("readings", 2);
/// q.put(3).await.unwrap();
/// q.put(4).await.unwrap();
/// assert!(q.is_full());
///
/// assert_eq!(q.get().await, Ok(3));
/// assert_eq!(q.drain_and_unblock(), 1);
/// assert_eq!(q.try_get(), Err(GetError::Empty));
/// # }
/// ```
pub struct BoundedQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for BoundedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> BoundedQueue<T> {
    /// Creates an anonymous queue; `capacity == 0` means unbounded.
    pub fn new(capacity: usize) -> Self {
        Self::build("queue".into(), capacity, None)
    }

    /// Creates a named queue; `capacity == 0` means unbounded.
    pub fn named(name: impl Into<Cow<'static, str>>, capacity: usize) -> Self {
        Self::build(name.into(), capacity, None)
    }

    /// Creates a queue without a capacity bound.
    pub fn unbounded() -> Self {
        Self::build("queue".into(), 0, None)
    }

    /// Creates a named queue that reports drains on `bus`.
    pub fn with_bus(name: impl Into<Cow<'static, str>>, capacity: usize, bus: Bus) -> Self {
        Self::build(name.into(), capacity, Some(bus))
    }

    fn build(name: Cow<'static, str>, capacity: usize, bus: Option<Bus>) -> Self {
        let items = if capacity > 0 {
            VecDeque::with_capacity(capacity)
        } else {
            VecDeque::new()
        };
        Self {
            inner: Arc::new(Inner {
                name,
                capacity,
                state: Mutex::new(State { items, epoch: 0 }),
                not_empty: Notify::new(),
                not_full: Notify::new(),
                bus,
            }),
        }
    }

    /// Queue name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Capacity bound; `0` means unbounded.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// True when the queue has a capacity bound.
    pub fn is_bounded(&self) -> bool {
        self.inner.capacity > 0
    }

    /// Number of queued items (advisory).
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Advisory emptiness check; may be stale by the time the caller acts on it.
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Advisory fullness check; always `false` for unbounded queues.
    pub fn is_full(&self) -> bool {
        self.full(&self.lock())
    }

    /// Enqueues `item`, waiting while the queue is at capacity.
    ///
    /// Returns `Err(PutError::Drained(item))` if `drain_and_unblock` runs while waiting.
    pub async fn put(&self, item: T) -> Result<(), PutError<T>> {
        self.put_until(item, None).await
    }

    /// Like [`put`](Self::put), but also gives up with `PutError::Exit(item)` once exit is
    /// requested on `controller` while waiting for capacity.
    pub async fn put_or_exit(&self, item: T, controller: &Controller) -> Result<(), PutError<T>> {
        let token = controller.exit_token();
        self.put_until(item, Some(&token)).await
    }

    /// Enqueues `item` only if there is room right now.
    pub fn try_put(&self, item: T) -> Result<(), PutError<T>> {
        {
            let mut state = self.lock();
            if self.full(&state) {
                return Err(PutError::Full(item));
            }
            state.items.push_back(item);
        }
        self.inner.not_empty.notify_waiters();
        Ok(())
    }

    /// Dequeues the oldest item, waiting while the queue is empty.
    ///
    /// Returns `Err(GetError::Drained)` if `drain_and_unblock` runs while waiting.
    pub async fn get(&self) -> Result<T, GetError> {
        self.get_until(None).await
    }

    /// Like [`get`](Self::get), but also gives up with `GetError::Exit` once exit is
    /// requested on `controller` while waiting for an item.
    pub async fn get_or_exit(&self, controller: &Controller) -> Result<T, GetError> {
        let token = controller.exit_token();
        self.get_until(Some(&token)).await
    }

    /// Dequeues the oldest item only if one is available right now.
    pub fn try_get(&self) -> Result<T, GetError> {
        let item = self.lock().items.pop_front().ok_or(GetError::Empty)?;
        self.inner.not_full.notify_waiters();
        Ok(item)
    }

    /// Shutdown-safety operation: releases every producer blocked in `put` and every
    /// consumer blocked in `get`, and leaves the queue empty.
    ///
    /// Queued items are discarded; released producers get their item back in
    /// `PutError::Drained`, released consumers get `GetError::Drained`.
    /// Returns the number of discarded items.
    ///
    /// Call only after exit has been requested, so that producers do not refill the
    /// queue once they are released.
    pub fn drain_and_unblock(&self) -> usize {
        let discarded: Vec<T> = {
            let mut state = self.lock();
            state.epoch = state.epoch.wrapping_add(1);
            state.items.drain(..).collect()
        };
        let count = discarded.len();
        drop(discarded);

        self.inner.not_full.notify_waiters();
        self.inner.not_empty.notify_waiters();

        if let Some(bus) = &self.inner.bus {
            bus.publish_with(|| {
                Event::new(EventKind::QueueDrained)
                    .with_queue(self.name().to_owned())
                    .with_count(count)
            });
        }
        count
    }

    async fn put_until(
        &self,
        item: T,
        exit: Option<&CancellationToken>,
    ) -> Result<(), PutError<T>> {
        let mut epoch = None;
        loop {
            let notified = self.inner.not_full.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                let seen = *epoch.get_or_insert(state.epoch);
                if state.epoch != seen {
                    return Err(PutError::Drained(item));
                }
                if !self.full(&state) {
                    state.items.push_back(item);
                    drop(state);
                    self.inner.not_empty.notify_waiters();
                    return Ok(());
                }
                if exit.is_some_and(CancellationToken::is_cancelled) {
                    return Err(PutError::Exit(item));
                }
            }

            match exit {
                Some(token) => {
                    tokio::select! {
                        _ = &mut notified => {}
                        _ = token.cancelled() => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    async fn get_until(&self, exit: Option<&CancellationToken>) -> Result<T, GetError> {
        let mut epoch = None;
        loop {
            let notified = self.inner.not_empty.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                let seen = *epoch.get_or_insert(state.epoch);
                if state.epoch != seen {
                    return Err(GetError::Drained);
                }
                if let Some(item) = state.items.pop_front() {
                    drop(state);
                    self.inner.not_full.notify_waiters();
                    return Ok(item);
                }
                if exit.is_some_and(CancellationToken::is_cancelled) {
                    return Err(GetError::Exit);
                }
            }

            match exit {
                Some(token) => {
                    tokio::select! {
                        _ = &mut notified => {}
                        _ = token.cancelled() => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    fn full(&self, state: &State<T>) -> bool {
        self.inner.capacity > 0 && state.items.len() >= self.inner.capacity
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("name", &self.name())
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    const BOUND: Duration = Duration::from_secs(2);
    const SHORT: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn fifo_round_trip() {
        let q = BoundedQueue::new(0);
        for i in 0..10 {
            q.put(i).await.unwrap();
        }
        for i in 0..10 {
            assert_eq!(q.get().await, Ok(i));
        }
        assert!(q.is_empty());
    }

    #[tokio::test]
    async fn fills_to_capacity_then_put_waits_for_get() {
        for n in 1..=4usize {
            let q = BoundedQueue::new(n);
            for i in 0..n {
                q.put(i).await.unwrap();
            }
            assert!(q.is_full());
            assert_eq!(q.try_put(99), Err(PutError::Full(99)));

            let producer = {
                let q = q.clone();
                tokio::spawn(async move { q.put(n).await })
            };
            tokio::time::sleep(SHORT).await;
            assert!(!producer.is_finished(), "put must wait while full");

            assert_eq!(q.get().await, Ok(0));
            timeout(BOUND, producer).await.unwrap().unwrap().unwrap();
            assert_eq!(q.len(), n);
        }
    }

    #[tokio::test]
    async fn unbounded_never_fills() {
        let q = BoundedQueue::unbounded();
        assert!(!q.is_bounded());
        for i in 0..1_000 {
            q.try_put(i).unwrap();
        }
        assert!(!q.is_full());
        assert_eq!(q.len(), 1_000);
    }

    #[test]
    fn try_get_on_empty() {
        let q: BoundedQueue<u8> = BoundedQueue::new(3);
        assert_eq!(q.try_get(), Err(GetError::Empty));
    }

    #[tokio::test]
    async fn drain_releases_blocked_producer_and_empties() {
        let q = BoundedQueue::new(2);
        q.put(1).await.unwrap();
        q.put(2).await.unwrap();

        let producer = {
            let q = q.clone();
            tokio::spawn(async move { q.put(3).await })
        };
        tokio::time::sleep(SHORT).await;

        assert_eq!(q.drain_and_unblock(), 2);
        let res = timeout(BOUND, producer).await.unwrap().unwrap();
        assert_eq!(res, Err(PutError::Drained(3)));
        assert!(q.is_empty());
    }

    #[tokio::test]
    async fn drain_releases_blocked_consumer() {
        let q: BoundedQueue<u32> = BoundedQueue::new(4);
        let consumer = {
            let q = q.clone();
            tokio::spawn(async move { q.get().await })
        };
        tokio::time::sleep(SHORT).await;

        assert_eq!(q.drain_and_unblock(), 0);
        let res = timeout(BOUND, consumer).await.unwrap().unwrap();
        assert_eq!(res, Err(GetError::Drained));
    }

    #[tokio::test]
    async fn drain_releases_consumer_on_unbounded_queue() {
        let q: BoundedQueue<u32> = BoundedQueue::unbounded();
        let consumer = {
            let q = q.clone();
            tokio::spawn(async move { q.get().await })
        };
        tokio::time::sleep(SHORT).await;
        q.drain_and_unblock();
        assert_eq!(
            timeout(BOUND, consumer).await.unwrap().unwrap(),
            Err(GetError::Drained)
        );
    }

    #[tokio::test]
    async fn queue_is_usable_after_drain() {
        let q = BoundedQueue::new(1);
        q.put("a").await.unwrap();
        q.drain_and_unblock();
        q.put("b").await.unwrap();
        assert_eq!(q.get().await, Ok("b"));
    }

    #[tokio::test]
    async fn exit_wakes_waiting_get_or_exit() {
        let c = Controller::new();
        let q: BoundedQueue<u8> = BoundedQueue::new(1);
        let consumer = {
            let (q, c) = (q.clone(), c.clone());
            tokio::spawn(async move { q.get_or_exit(&c).await })
        };
        tokio::time::sleep(SHORT).await;
        c.request_exit();
        assert_eq!(
            timeout(BOUND, consumer).await.unwrap().unwrap(),
            Err(GetError::Exit)
        );
    }

    #[tokio::test]
    async fn exit_wakes_waiting_put_or_exit_and_returns_item() {
        let c = Controller::new();
        let q = BoundedQueue::new(1);
        q.put(1).await.unwrap();
        let producer = {
            let (q, c) = (q.clone(), c.clone());
            tokio::spawn(async move { q.put_or_exit(2, &c).await })
        };
        tokio::time::sleep(SHORT).await;
        c.request_exit();
        let err = timeout(BOUND, producer).await.unwrap().unwrap().unwrap_err();
        assert_eq!(err.as_label(), "queue_exit");
        assert_eq!(err.into_inner(), 2);
        assert_eq!(q.len(), 1);
    }

    #[tokio::test]
    async fn or_exit_variants_still_move_items_when_possible() {
        let c = Controller::new();
        c.request_exit();
        let q = BoundedQueue::new(2);
        q.put_or_exit(7, &c).await.unwrap();
        assert_eq!(q.get_or_exit(&c).await, Ok(7));
        assert_eq!(q.get_or_exit(&c).await, Err(GetError::Exit));
    }

    #[tokio::test]
    async fn drain_is_published_on_bus() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let q = BoundedQueue::with_bus("telemetry", 3, bus);
        q.put(1).await.unwrap();
        q.drain_and_unblock();

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::QueueDrained);
        assert_eq!(ev.queue.as_deref(), Some("telemetry"));
        assert_eq!(ev.count, Some(1));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    fn block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(fut)
    }

    proptest! {
        #[test]
        fn items_come_out_in_put_order(items in prop::collection::vec(any::<i32>(), 0..200)) {
            let got = block_on(async {
                let q = BoundedQueue::unbounded();
                for &i in &items {
                    q.put(i).await.unwrap();
                }
                let mut got = Vec::with_capacity(items.len());
                while let Ok(i) = q.try_get() {
                    got.push(i);
                }
                got
            });
            prop_assert_eq!(got, items);
        }

        #[test]
        fn bounded_queue_admits_exactly_capacity(n in 1usize..64, extra in 1usize..8) {
            let q = BoundedQueue::new(n);
            for i in 0..n {
                prop_assert!(q.try_put(i).is_ok());
            }
            prop_assert!(q.is_full());
            for j in 0..extra {
                prop_assert_eq!(q.try_put(n + j), Err(PutError::Full(n + j)));
            }
            prop_assert_eq!(q.len(), n);

            // a waiting put completes once one slot frees up
            let (first, last) = block_on(async {
                let waiting = q.put(n);
                tokio::pin!(waiting);
                let stalled = tokio::time::timeout(Duration::from_millis(5), &mut waiting).await;
                assert!(stalled.is_err());
                let first = q.get().await.unwrap();
                waiting.await.unwrap();
                let mut last = 0;
                while let Ok(i) = q.try_get() {
                    last = i;
                }
                (first, last)
            });
            prop_assert_eq!(first, 0);
            prop_assert_eq!(last, n);
        }

        #[test]
        fn drain_empties_any_fill_level(n in 1usize..64, fill in 0usize..64) {
            let q = BoundedQueue::new(n);
            let stored = fill.min(n);
            for i in 0..stored {
                q.try_put(i).unwrap();
            }
            prop_assert_eq!(q.drain_and_unblock(), stored);
            prop_assert!(q.is_empty());
            prop_assert_eq!(q.try_get(), Err(GetError::Empty));
        }
    }
}
