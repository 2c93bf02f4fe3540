//! # Controller: process-wide pause/exit switch.
//!
//! State lives in a [`tokio::sync::watch`] channel so every transition is visible to all
//! handles immediately and `check_pause` waiters are woken together on `resume`.
//! Exit is additionally mirrored into a [`CancellationToken`] owned by the current
//! orchestration cycle; `clear_exit` installs a fresh one.
//!
//! ## Rules
//! - Transitions are idempotent; events are published only on an actual change.
//! - `pause`/`resume` do nothing once exit is requested.
//! - `check_pause` returns as soon as the state is not `Paused`, so a paused worker is
//!   always released by either `resume` or `request_exit`.
//! - `request_exit` and `clear_exit` update the state and the exit token as one step.
//! - `clear_exit` must not race with active workers (caller obligation).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::state::ControllerState;
use crate::events::{Bus, Event, EventKind};

struct Shared {
    state: watch::Sender<ControllerState>,
    exit: Mutex<CancellationToken>,
    bus: Option<Bus>,
}

/// Shared pause/exit handle. Clones observe and drive the same state.
///
/// ## Example
/// ```rust
/// use workvisor::{Controller, ControllerState};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let controller = Controller::new();
/// let worker_view = controller.clone();
///
/// controller.request_exit();
/// assert!(worker_view.is_exit_requested());
/// worker_view.check_pause().await; // never blocks once exit is requested
///
/// controller.clear_exit();
/// assert_eq!(worker_view.state(), ControllerState::Running);
/// # }
/// ```
#[derive(Clone)]
pub struct Controller {
    shared: Arc<Shared>,
}

impl Controller {
    /// Creates a controller in the `Running` state.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Creates a controller that publishes its transitions on `bus`.
    pub fn with_bus(bus: Bus) -> Self {
        Self::build(Some(bus))
    }

    fn build(bus: Option<Bus>) -> Self {
        let (state, _rx) = watch::channel(ControllerState::Running);
        Self {
            shared: Arc::new(Shared {
                state,
                exit: Mutex::new(CancellationToken::new()),
                bus,
            }),
        }
    }

    /// True if both handles drive the same switch.
    pub fn same_as(&self, other: &Controller) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Current state.
    pub fn state(&self) -> ControllerState {
        *self.shared.state.borrow()
    }

    /// Non-blocking read of the exit flag.
    pub fn is_exit_requested(&self) -> bool {
        self.state() == ControllerState::ExitRequested
    }

    /// True while paused (and exit not requested).
    pub fn is_paused(&self) -> bool {
        self.state() == ControllerState::Paused
    }

    /// Sets the exit flag and cancels the current cycle's token. Idempotent.
    pub fn request_exit(&self) {
        let changed = {
            let token = self.lock_exit();
            let changed = self.transition(|s| match s {
                ControllerState::ExitRequested => None,
                _ => Some(ControllerState::ExitRequested),
            });
            token.cancel();
            changed
        };
        if changed {
            self.publish(EventKind::ExitRequested);
        }
    }

    /// Resets the exit flag for a new orchestration cycle.
    ///
    /// Only call once every worker bound to this controller has been joined; a worker
    /// still unwinding could otherwise observe "not exiting" again.
    pub fn clear_exit(&self) {
        let changed = {
            let mut token = self.lock_exit();
            let changed = self.transition(|s| match s {
                ControllerState::ExitRequested => Some(ControllerState::Running),
                _ => None,
            });
            if token.is_cancelled() {
                *token = CancellationToken::new();
            }
            changed
        };
        if changed {
            self.publish(EventKind::ExitCleared);
        }
    }

    /// Suspends every worker at its next `check_pause`.
    pub fn pause(&self) {
        let changed = self.transition(|s| match s {
            ControllerState::Running => Some(ControllerState::Paused),
            _ => None,
        });
        if changed {
            self.publish(EventKind::Paused);
        }
    }

    /// Clears the pause flag and wakes every worker waiting in `check_pause`.
    pub fn resume(&self) {
        let changed = self.transition(|s| match s {
            ControllerState::Paused => Some(ControllerState::Running),
            _ => None,
        });
        if changed {
            self.publish(EventKind::Resumed);
        }
    }

    /// Cooperative suspension point: waits while paused, returns immediately otherwise.
    ///
    /// Returns once `resume` or `request_exit` is called; check
    /// [`is_exit_requested`](Self::is_exit_requested) afterwards to decide whether to unwind.
    pub async fn check_pause(&self) {
        let mut rx = self.shared.state.subscribe();
        // The sender lives in `self.shared`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|s| *s != ControllerState::Paused).await;
    }

    /// Resolves once exit has been requested for the current cycle.
    pub async fn exit_requested(&self) {
        self.exit_token().cancelled_owned().await
    }

    /// Token of the current orchestration cycle; cancelled by `request_exit`.
    pub fn exit_token(&self) -> CancellationToken {
        self.lock_exit().clone()
    }

    /// Exit state and token change together under this lock: `ExitRequested` holds
    /// exactly when the current token is cancelled.
    fn lock_exit(&self) -> MutexGuard<'_, CancellationToken> {
        self.shared.exit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `next` atomically; returns whether the state changed.
    fn transition(&self, next: impl FnOnce(ControllerState) -> Option<ControllerState>) -> bool {
        self.shared.state.send_if_modified(|s| match next(*s) {
            Some(n) => {
                *s = n;
                true
            }
            None => false,
        })
    }

    fn publish(&self, kind: EventKind) {
        if let Some(bus) = &self.shared.bus {
            bus.publish(Event::new(kind));
        }
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("state", &self.state())
            .finish()
    }
}
