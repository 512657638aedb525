//! The cooperative scheduler the tasklet runs under.
//!
//! Scheduling itself is owned by the host: this trait only names the calls
//! the tasklet makes into it. Implementations must deliver events one at a
//! time, in the order they release them.

use std::time::Duration;

use meshlink_core::TaskletId;

use crate::constants::TIMER_START_BOOTSTRAP;
use crate::error::RegistrationError;
use crate::event::Event;

/// Purpose of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    StartBootstrap,
}

impl TimerKind {
    pub const fn id(&self) -> u8 {
        match self {
            Self::StartBootstrap => TIMER_START_BOOTSTRAP,
        }
    }
}

/// Identifies one armed timer. The generation ties it to the connect cycle
/// it was armed in, so a timer outliving its cycle can be recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken {
    pub kind: TimerKind,
    pub generation: u32,
}

impl TimerToken {
    pub const fn start_bootstrap(generation: u32) -> Self {
        Self {
            kind: TimerKind::StartBootstrap,
            generation,
        }
    }
}

pub trait Scheduler {
    /// Register the tasklet's event handler. On success the scheduler later
    /// delivers exactly one [`Event::init`] to the returned id.
    ///
    /// Registration is not idempotent: a second call must fail with
    /// [`RegistrationError::AlreadyUsed`].
    fn register_handler(&mut self) -> Result<TaskletId, RegistrationError>;

    /// Queue an event for later delivery.
    fn post(&mut self, event: Event);

    /// Deliver [`Event::timer`] with `token` to `tasklet` once `delay` elapses.
    fn arm_timer(&mut self, tasklet: TaskletId, token: TimerToken, delay: Duration);

    /// Cancel a timer. A no-op if it already fired or was never armed.
    fn cancel_timer(&mut self, tasklet: TaskletId, token: TimerToken);
}
