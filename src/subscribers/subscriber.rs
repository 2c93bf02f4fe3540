//! # Pipeline observers.
//!
//! A [`Subscribe`] implementation watches one orchestrator: replicas starting and failing,
//! queues being drained, the controller pausing, the shutdown sequence. It declares the
//! slice of that traffic it cares about with [`Subscribe::interest`], so a metrics hook for
//! one stage does not queue up events from every other stage.
//!
//! Delivery runs on a task owned by the [`SubscriberSet`](crate::SubscriberSet), never on a
//! replica thread. A subscriber that panics or falls behind only loses its own events.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use workvisor::{Event, EventKind, Interest, Subscribe};
//!
//! /// Counts replicas of the `squarer` stage that ended badly.
//! struct SquarerFailures;
//!
//! #[async_trait]
//! impl Subscribe for SquarerFailures {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::WorkerFailed | EventKind::WorkerPanicked) {
//!             // bump a counter
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "squarer-failures" }
//!
//!     fn interest(&self) -> Interest { Interest::worker("squarer") }
//! }
//!
//! let squarer = Event::new(EventKind::WorkerFailed).with_worker("squarer");
//! let other = Event::new(EventKind::WorkerFailed).with_worker("producer");
//! assert!(SquarerFailures.interest().matches(&squarer));
//! assert!(!SquarerFailures.interest().matches(&other));
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::events::{Event, EventKind};

/// Which events a subscriber receives.
///
/// `Worker` and `Queue` scopes still receive `ShutdownRequested` and `ShutdownComplete`,
/// so every subscriber sees where a shutdown starts and ends.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Interest {
    /// Every event.
    #[default]
    All,
    /// Only these kinds.
    Kinds(Vec<EventKind>),
    /// Events about one worker stage (its replicas and its pool).
    Worker(Arc<str>),
    /// Events about one queue.
    Queue(Arc<str>),
}

impl Interest {
    pub fn kinds(kinds: impl IntoIterator<Item = EventKind>) -> Self {
        Interest::Kinds(kinds.into_iter().collect())
    }

    pub fn worker(name: impl Into<Arc<str>>) -> Self {
        Interest::Worker(name.into())
    }

    pub fn queue(name: impl Into<Arc<str>>) -> Self {
        Interest::Queue(name.into())
    }

    /// True if `ev` should be delivered under this interest.
    pub fn matches(&self, ev: &Event) -> bool {
        match self {
            Interest::All => true,
            Interest::Kinds(kinds) => kinds.contains(&ev.kind),
            Interest::Worker(name) => {
                is_shutdown_bracket(ev.kind) || ev.worker.as_deref() == Some(&**name)
            }
            Interest::Queue(name) => {
                is_shutdown_bracket(ev.kind) || ev.queue.as_deref() == Some(&**name)
            }
        }
    }
}

fn is_shutdown_bracket(kind: EventKind) -> bool {
    matches!(
        kind,
        EventKind::ShutdownRequested | EventKind::ShutdownComplete
    )
}

/// Observer of runtime events.
///
/// `on_event` runs on the subscriber's own task; long or blocking work there only delays
/// this subscriber. Errors should be handled inside, a panic is caught and reported as
/// `SubscriberPanicked`.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    async fn on_event(&self, event: &Event);

    /// Name used in `SubscriberOverflow` / `SubscriberPanicked` events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Events this subscriber wants. Read once, when the set is built.
    fn interest(&self) -> Interest {
        Interest::All
    }

    /// Undelivered events this subscriber may hold before new ones are dropped (min 1).
    fn queue_capacity(&self) -> usize {
        1024
    }
}
