//! # Event bus.
//!
//! One [`Bus`] per orchestrator carries every runtime [`Event`]: controller transitions,
//! queue drains, replica and pool lifecycle, shutdown progress. It is a
//! [`tokio::sync::broadcast`] ring, so publishing never waits on a reader.
//!
//! ```text
//!   Controller ─┐
//!   queues     ─┤ publish / publish_with
//!   replicas   ─┼──────────────────────► Bus ──► Orchestrator listener ──► SubscriberSet
//!   pools      ─┘
//! ```
//!
//! Replicas run on their own threads and publish from there; `publish` is a plain
//! synchronous send. When nobody listens, [`Bus::publish_with`] skips building the event.
//! A reader that falls more than the capacity behind loses the oldest events.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events. Clones publish into the same ring.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus holding up to `capacity` undelivered events (at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Sends `ev` to every current receiver; dropped if there are none.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Builds and sends an event only when someone is listening.
    ///
    /// Used on hot paths (replica start/stop, drains) so an unobserved pipeline does
    /// not pay for sequence numbers, timestamps and label strings.
    pub fn publish_with(&self, make: impl FnOnce() -> Event) {
        if self.is_observed() {
            self.publish(make());
        }
    }

    /// True while at least one receiver exists.
    pub fn is_observed(&self) -> bool {
        self.tx.receiver_count() > 0
    }

    /// New receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn receiver_gets_published_event() {
        let bus = Bus::new(0);
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::Paused));
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::Paused);
    }

    #[test]
    fn publish_with_skips_building_when_unobserved() {
        let bus = Bus::new(4);
        assert!(!bus.is_observed());
        bus.publish_with(|| panic!("built without a receiver"));

        let mut rx = bus.subscribe();
        assert!(bus.is_observed());
        bus.publish_with(|| Event::new(EventKind::Resumed));
        assert_eq!(rx.try_recv().unwrap().kind, EventKind::Resumed);
    }
}
