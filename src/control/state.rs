/// State of a [`Controller`](crate::Controller).
///
/// `ExitRequested` is terminal until [`Controller::clear_exit`](crate::Controller::clear_exit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerState {
    /// Workers run freely.
    #[default]
    Running,
    /// Workers suspend in `check_pause` until resumed or exit is requested.
    Paused,
    /// Workers must unwind at their next iteration.
    ExitRequested,
}

impl ControllerState {
    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ControllerState::Running => "running",
            ControllerState::Paused => "paused",
            ControllerState::ExitRequested => "exit_requested",
        }
    }
}
