//! Runtime core: pools, orchestration and shutdown.
//!
//! Public API from this module is [`WorkerPool`], [`Orchestrator`] (with its builder),
//! [`Config`] and [`ReplicaExit`].
//!
//! Internal modules:
//! - [`replica`]: runs one replica body with panic isolation and event publishing;
//! - [`pool`]: spawns and joins the replicas of one spec;
//! - [`orchestrator`]: owns queues and pools, runs the ordered shutdown;
//! - [`builder`]: orchestrator construction with subscribers.

mod builder;
mod config;
mod orchestrator;
mod pool;
mod replica;

pub use builder::OrchestratorBuilder;
pub use config::Config;
pub use orchestrator::Orchestrator;
pub use pool::WorkerPool;
pub use replica::ReplicaExit;
