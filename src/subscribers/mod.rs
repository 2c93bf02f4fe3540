//! # Event subscribers for the workvisor runtime.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`] fan-out used by
//! the [`Orchestrator`](crate::Orchestrator).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Replica ── publish(Event) ──► Bus ──► Orchestrator listener ──► SubscriberSet::emit
//!                                                                       │
//!                                                             ┌─────────┼─────────┐
//!                                                             ▼         ▼         ▼
//!                                                         LogWriter  Metrics   Custom
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub(crate) use set::panic_message;
pub use set::SubscriberSet;
pub use subscriber::{Interest, Subscribe};
