//! # Bounded multi-producer/multi-consumer queues.
//!
//! [`BoundedQueue`] is the only data path between replicas and the orchestrating task.
//! Handles are cheap clones of one shared queue.
//!
//! ## Suspension points
//! - `put` waits while the queue is at capacity (never for unbounded queues);
//! - `get` waits while the queue is empty.
//!
//! ## Shutdown
//! ```text
//! request_exit() ──► drain_and_unblock() downstream → upstream ──► join pools
//!                         │
//!                         ├─ discard every queued item
//!                         ├─ advance drain epoch
//!                         └─ wake waiters → Err(Drained) for everyone waiting before the drain
//! ```

mod bounded;
mod drain;
mod error;

pub use bounded::BoundedQueue;
pub use drain::Drain;
pub use error::{GetError, PutError};
