//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Controller`, `BoundedQueue::drain_and_unblock`, pool replicas,
//!   `WorkerPool`, `Orchestrator`, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: `Orchestrator` listener (fans out to `SubscriberSet`).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
