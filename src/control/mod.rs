//! # Cooperative pause/exit signaling.
//!
//! [`Controller`] is the single coordination switch shared by the orchestrating task
//! and every replica. It carries a three-state machine and an exit token per
//! orchestration cycle.
//!
//! ```text
//!            pause()                 request_exit()
//!   RUNNING ─────────► PAUSED ───────────────────────┐
//!      ▲  ◄─────────────                              ▼
//!      │     resume()                          EXIT_REQUESTED
//!      │                                              │
//!      └──────────────────── clear_exit() ────────────┘
//!   (RUNNING ──request_exit()──► EXIT_REQUESTED as well)
//! ```

mod controller;
mod state;

pub use controller::Controller;
pub use state::ControllerState;
