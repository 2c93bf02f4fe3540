use std::sync::Arc;

use super::{config::Config, orchestrator::Orchestrator};
use crate::subscribers::Subscribe;

/// Builder for constructing an [`Orchestrator`] with optional subscribers.
pub struct OrchestratorBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl OrchestratorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (controller transitions, queue drains, replica
    /// lifecycle) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one subscriber.
    pub fn subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Builds the orchestrator.
    ///
    /// Initializes the event bus, the shared controller and, when subscribers were
    /// given, the listener forwarding bus events to them. Must be called from within a
    /// tokio runtime.
    pub fn build(self) -> Orchestrator {
        Orchestrator::new_internal(self.cfg, self.subscribers)
    }
}
