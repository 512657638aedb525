//! Bootstrap states and pure decision functions for status events.
//!
//! These classifiers decide *what* a status event means for the current
//! state. The mutations (stack calls, timers, notifications) stay in
//! [`Tasklet`](crate::tasklet::Tasklet).

use std::fmt;

use crate::event::StackStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskletState {
    /// No connect has been requested yet.
    Created,
    /// Connect accepted; waiting for the event that applies configuration.
    Initialized,
    /// `interface_up` accepted; waiting for the stack's verdict.
    BootstrapStarted,
    /// Bootstrap failed; a retry may be pending.
    BootstrapFailed,
    BootstrapReady,
}

impl TaskletState {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Initialized => "initialized",
            Self::BootstrapStarted => "bootstrap_started",
            Self::BootstrapFailed => "bootstrap_failed",
            Self::BootstrapReady => "bootstrap_ready",
        }
    }
}

impl fmt::Display for TaskletState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a network status event means in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    /// First ready of this cycle: go ready, notify connected.
    Connected,
    /// Ready re-delivered while already ready.
    DuplicateReady,
    /// Stack re-attached on its own while a retry was pending.
    Recovered,
    /// Failure during bootstrap: stay quiet, make sure a retry is pending.
    RetrySilently,
    /// Failure after the node was attached: report it, then retry.
    LinkLost,
    /// No bootstrap has started; the status has nothing to act on.
    NotStarted,
    Unrecognized(u8),
}

/// Classify a network status event against the current state.
pub fn classify_status(state: TaskletState, status: StackStatus) -> StatusOutcome {
    if let StackStatus::Unknown(code) = status {
        return StatusOutcome::Unrecognized(code);
    }
    let failed = status.is_failure();
    match state {
        TaskletState::Created | TaskletState::Initialized => StatusOutcome::NotStarted,
        TaskletState::BootstrapStarted if failed => StatusOutcome::RetrySilently,
        TaskletState::BootstrapStarted => StatusOutcome::Connected,
        TaskletState::BootstrapFailed if failed => StatusOutcome::RetrySilently,
        TaskletState::BootstrapFailed => StatusOutcome::Recovered,
        TaskletState::BootstrapReady if failed => StatusOutcome::LinkLost,
        TaskletState::BootstrapReady => StatusOutcome::DuplicateReady,
    }
}
