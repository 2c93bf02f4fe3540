//! # Routing events to subscribers.
//!
//! [`SubscriberSet`] owns one delivery task per [`Subscribe`] implementation and routes
//! each event only to the subscribers whose [`Interest`] matches it.
//!
//! ```text
//!   emit(&Event) ──► interest? ──► [mpsc S1] ──► task S1 ──► on_event
//!                ──► interest? ──► [mpsc S2] ──► task S2 ──► on_event
//! ```
//!
//! - `emit` never waits. A full queue drops the event for that subscriber, bumps its
//!   dropped counter and publishes `SubscriberOverflow` with the running total in `count`.
//! - Per subscriber, events arrive in emit order.
//! - [`SubscriberSet::shutdown`] returns only after every accepted event was handled. The
//!   orchestrator relies on this to hand `ShutdownComplete` to every interested subscriber
//!   before `shutdown()` returns.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinSet};

use super::{Interest, Subscribe};
use crate::events::{Bus, Event, EventKind};

struct Route {
    name: &'static str,
    interest: Interest,
    tx: mpsc::Sender<Arc<Event>>,
    dropped: AtomicU64,
}

/// Interest-filtered fan-out with per-subscriber bounded queues.
pub struct SubscriberSet {
    routes: Vec<Route>,
    tasks: JoinSet<()>,
    bus: Bus,
}

impl SubscriberSet {
    /// Spawns one delivery task per subscriber. Needs a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut routes = Vec::with_capacity(subs.len());
        let mut tasks = JoinSet::new();

        for sub in subs {
            let (tx, rx) = mpsc::channel(sub.queue_capacity().max(1));
            routes.push(Route {
                name: sub.name(),
                interest: sub.interest(),
                tx,
                dropped: AtomicU64::new(0),
            });
            tasks.spawn(deliver(sub, rx, bus.clone()));
        }

        Self { routes, tasks, bus }
    }

    /// Hands `event` to every interested subscriber without waiting.
    pub fn emit(&self, event: &Event) {
        let mut shared: Option<Arc<Event>> = None;
        for route in &self.routes {
            if !route.interest.matches(event) {
                continue;
            }
            let ev = shared.get_or_insert_with(|| Arc::new(event.clone()));
            let reason = match route.tx.try_send(Arc::clone(ev)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            let total = route.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            // overflow reports are not themselves reported
            if event.kind != EventKind::SubscriberOverflow {
                self.bus.publish(
                    Event::subscriber_overflow(route.name, reason).with_count(total as usize),
                );
            }
        }
    }

    /// Events dropped so far for the subscriber called `name`.
    pub fn dropped(&self, name: &str) -> Option<u64> {
        self.routes
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.dropped.load(Ordering::Relaxed))
    }

    /// Closes every queue and waits until the delivery tasks have handled what they hold.
    pub async fn shutdown(self) {
        let Self {
            routes, mut tasks, ..
        } = self;
        drop(routes);
        while tasks.join_next().await.is_some() {}
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }
}

async fn deliver(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>, bus: Bus) {
    while let Some(ev) = rx.recv().await {
        let handled = std::panic::AssertUnwindSafe(sub.on_event(&ev))
            .catch_unwind()
            .await;
        if let Err(payload) = handled {
            bus.publish(Event::subscriber_panicked(
                sub.name(),
                panic_message(&*payload),
            ));
        }
    }
}

/// Extracts a printable message from a panic payload.
pub(crate) fn panic_message(any: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Recorder {
        seen: Arc<Mutex<Vec<EventKind>>>,
        interest: Interest,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.seen.lock().unwrap().push(event.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }

        fn interest(&self) -> Interest {
            self.interest.clone()
        }
    }

    struct Panicker;

    #[async_trait]
    impl Subscribe for Panicker {
        async fn on_event(&self, _event: &Event) {
            panic!("subscriber blew up");
        }

        fn name(&self) -> &'static str {
            "panicker"
        }
    }

    /// Holds its only queue slot until the gate opens.
    struct Stuck(Arc<tokio::sync::Notify>);

    #[async_trait]
    impl Subscribe for Stuck {
        async fn on_event(&self, _event: &Event) {
            self.0.notified().await;
        }

        fn name(&self) -> &'static str {
            "stuck"
        }

        fn queue_capacity(&self) -> usize {
            1
        }
    }

    fn recorder(interest: Interest) -> (Arc<Mutex<Vec<EventKind>>>, Arc<dyn Subscribe>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sub = Arc::new(Recorder {
            seen: seen.clone(),
            interest,
        });
        (seen, sub)
    }

    #[tokio::test]
    async fn delivers_in_emit_order() {
        let (seen, sub) = recorder(Interest::All);
        let set = SubscriberSet::new(vec![sub], Bus::new(16));
        assert_eq!(set.len(), 1);

        set.emit(&Event::new(EventKind::Paused));
        set.emit(&Event::new(EventKind::Resumed));
        set.shutdown().await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![EventKind::Paused, EventKind::Resumed]
        );
    }

    #[tokio::test]
    async fn queue_scoped_subscriber_sees_only_its_queue() {
        let (seen, sub) = recorder(Interest::queue("telemetry"));
        let set = SubscriberSet::new(vec![sub], Bus::new(16));

        set.emit(&Event::new(EventKind::ShutdownRequested));
        set.emit(&Event::new(EventKind::QueueDrained).with_queue("commands"));
        set.emit(&Event::new(EventKind::QueueDrained).with_queue("telemetry"));
        set.emit(&Event::new(EventKind::WorkerStopped).with_worker("sensor"));
        set.emit(&Event::new(EventKind::ShutdownComplete));
        set.shutdown().await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                EventKind::ShutdownRequested,
                EventKind::QueueDrained,
                EventKind::ShutdownComplete,
            ]
        );
    }

    #[tokio::test]
    async fn overflow_counts_drops_per_subscriber() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let (seen, recorder) = recorder(Interest::All);
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Stuck(gate.clone())), recorder], bus);

        // first event is taken by the stuck task, second fills its slot
        set.emit(&Event::new(EventKind::Paused));
        tokio::time::sleep(Duration::from_millis(20)).await;
        set.emit(&Event::new(EventKind::Resumed));
        set.emit(&Event::new(EventKind::ExitRequested));
        set.emit(&Event::new(EventKind::ExitCleared));

        assert_eq!(set.dropped("stuck"), Some(2));
        assert_eq!(set.dropped("recorder"), Some(0));
        assert_eq!(set.dropped("missing"), None);

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.kind, EventKind::SubscriberOverflow);
        assert_eq!(first.worker.as_deref(), Some("stuck"));
        assert_eq!((first.count, second.count), (Some(1), Some(2)));

        gate.notify_waiters();
        gate.notify_one();
        set.shutdown().await;
        assert_eq!(seen.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn panics_are_reported_on_the_bus() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Panicker)], bus.clone());

        set.emit(&Event::new(EventKind::ExitRequested));
        let ev = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timely")
            .expect("event");
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.worker.as_deref(), Some("panicker"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber blew up"));
    }
}
