//! # Orchestrator configuration.
//!
//! [`Config`] holds the settings used by [`Orchestrator`](crate::Orchestrator).
//!
//! ## Sentinel values
//! - `grace = 0s` → join waits without a deadline
//! - `queue_capacity = 0` → queues made by `queue_default` are unbounded
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

/// Runtime configuration for an [`Orchestrator`](crate::Orchestrator).
///
/// ## Field semantics
/// - `grace`: maximum wait for replicas to finish during shutdown (`0s` = no deadline)
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `queue_capacity`: capacity used by `Orchestrator::queue_default` (`0` = unbounded)
///
/// Prefer the helper accessors over checking the `0` sentinels directly.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum time to wait for replicas to join once exit has been requested and
    /// queues drained. Replicas still running after the deadline are aborted and
    /// reported in [`RuntimeError::GraceExceeded`](crate::RuntimeError::GraceExceeded).
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel.
    ///
    /// Subscribers lagging by more than this many events skip the oldest ones.
    pub bus_capacity: usize,

    /// Default queue capacity for queues created without an explicit one.
    pub queue_capacity: usize,
}

impl Config {
    /// Returns the join deadline as an `Option`.
    ///
    /// - `None` → wait for every replica, however long it takes
    /// - `Some(d)` → abort replicas still running after `d`
    #[inline]
    pub fn join_grace(&self) -> Option<Duration> {
        if self.grace == Duration::ZERO {
            None
        } else {
            Some(self.grace)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `grace = 0s` (join waits for every replica)
    /// - `bus_capacity = 1024`
    /// - `queue_capacity = 5`
    fn default() -> Self {
        Self {
            grace: Duration::ZERO,
            bus_capacity: 1024,
            queue_capacity: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_grace_means_no_deadline() {
        let cfg = Config::default();
        assert_eq!(cfg.join_grace(), None);

        let cfg = Config {
            grace: Duration::from_millis(250),
            ..Config::default()
        };
        assert_eq!(cfg.join_grace(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn bus_capacity_is_clamped() {
        let cfg = Config {
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
