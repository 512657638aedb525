//! Single-shot retry timer for restarting a failed bootstrap.
//!
//! At most one retry timer is outstanding per tasklet. Arming while one is
//! pending is a no-op, and a fired token is only honoured if it matches the
//! armed one.

use std::time::Duration;

use meshlink_core::TaskletId;

use crate::constants::RETRY_DELAY;
use crate::scheduler::{Scheduler, TimerToken};

/// How failed bootstraps are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Duration,
    /// `None` retries until success or disconnect.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub const fn unbounded() -> Self {
        Self {
            delay: RETRY_DELAY,
            max_attempts: None,
        }
    }

    pub const fn bounded(max_attempts: u32) -> Self {
        Self {
            delay: RETRY_DELAY,
            max_attempts: Some(max_attempts),
        }
    }

    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Result of asking for a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmOutcome {
    Armed,
    /// A retry is already pending; nothing new was scheduled.
    AlreadyPending,
    /// The policy's attempt budget ran out just now.
    Exhausted,
    /// The budget ran out earlier and was already reported.
    GaveUp,
}

#[derive(Debug)]
pub struct RetryTimer {
    policy: RetryPolicy,
    armed: Option<TimerToken>,
    attempts: u32,
    exhausted: bool,
}

impl RetryTimer {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            armed: None,
            attempts: 0,
            exhausted: false,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Retries that have fired since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Schedule a restart for `generation` unless one is already pending.
    pub fn arm<D: Scheduler>(
        &mut self,
        scheduler: &mut D,
        tasklet: TaskletId,
        generation: u32,
    ) -> ArmOutcome {
        if self.armed.is_some() {
            return ArmOutcome::AlreadyPending;
        }
        if self
            .policy
            .max_attempts
            .is_some_and(|max| self.attempts >= max)
        {
            if self.exhausted {
                return ArmOutcome::GaveUp;
            }
            self.exhausted = true;
            return ArmOutcome::Exhausted;
        }

        let token = TimerToken::start_bootstrap(generation);
        scheduler.arm_timer(tasklet, token, self.policy.delay);
        self.armed = Some(token);
        ArmOutcome::Armed
    }

    /// Cancel the pending retry, if any.
    pub fn cancel<D: Scheduler>(&mut self, scheduler: &mut D, tasklet: TaskletId) {
        if let Some(token) = self.armed.take() {
            scheduler.cancel_timer(tasklet, token);
        }
    }

    /// Consume a fired timer. Returns `false` for tokens that are not the
    /// pending one (stale or foreign).
    pub fn fire(&mut self, token: TimerToken) -> bool {
        if self.armed != Some(token) {
            return false;
        }
        self.armed = None;
        self.attempts = self.attempts.saturating_add(1);
        true
    }

    /// Start a fresh attempt budget (new connect, or successful attach).
    pub fn reset_attempts(&mut self) {
        self.attempts = 0;
        self.exhausted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingScheduler;

    const TASKLET: TaskletId = TaskletId(1);

    #[test]
    fn arm_schedules_once() {
        let mut sched = RecordingScheduler::new();
        let mut timer = RetryTimer::new(RetryPolicy::default());

        assert_eq!(timer.arm(&mut sched, TASKLET, 1), ArmOutcome::Armed);
        assert_eq!(timer.arm(&mut sched, TASKLET, 1), ArmOutcome::AlreadyPending);
        assert_eq!(sched.armed_timers().len(), 1);
        assert_eq!(sched.armed_timers()[0].2, RETRY_DELAY);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut sched = RecordingScheduler::new();
        let mut timer = RetryTimer::new(RetryPolicy::default());
        timer.arm(&mut sched, TASKLET, 1);

        timer.cancel(&mut sched, TASKLET);
        timer.cancel(&mut sched, TASKLET);
        assert!(!timer.is_armed());
        assert!(sched.armed_timers().is_empty());
    }

    #[test]
    fn fire_rejects_stale_generation() {
        let mut sched = RecordingScheduler::new();
        let mut timer = RetryTimer::new(RetryPolicy::default());
        timer.arm(&mut sched, TASKLET, 2);

        assert!(!timer.fire(TimerToken::start_bootstrap(1)));
        assert!(timer.is_armed());
        assert!(timer.fire(TimerToken::start_bootstrap(2)));
        assert!(!timer.is_armed());
        assert_eq!(timer.attempts(), 1);
    }

    #[test]
    fn fire_after_cancel_is_ignored() {
        let mut sched = RecordingScheduler::new();
        let mut timer = RetryTimer::new(RetryPolicy::default());
        timer.arm(&mut sched, TASKLET, 1);
        timer.cancel(&mut sched, TASKLET);

        assert!(!timer.fire(TimerToken::start_bootstrap(1)));
        assert_eq!(timer.attempts(), 0);
    }

    #[test]
    fn bounded_policy_exhausts_once() {
        let mut sched = RecordingScheduler::new();
        let mut timer = RetryTimer::new(RetryPolicy::bounded(1));

        assert_eq!(timer.arm(&mut sched, TASKLET, 1), ArmOutcome::Armed);
        assert!(timer.fire(TimerToken::start_bootstrap(1)));
        assert_eq!(timer.arm(&mut sched, TASKLET, 1), ArmOutcome::Exhausted);
        assert_eq!(timer.arm(&mut sched, TASKLET, 1), ArmOutcome::GaveUp);

        timer.reset_attempts();
        assert_eq!(timer.arm(&mut sched, TASKLET, 1), ArmOutcome::Armed);
    }

    #[test]
    fn unbounded_policy_never_exhausts() {
        let mut sched = RecordingScheduler::new();
        let mut timer = RetryTimer::new(RetryPolicy::unbounded());
        for _ in 0..100 {
            assert_eq!(timer.arm(&mut sched, TASKLET, 1), ArmOutcome::Armed);
            assert!(timer.fire(TimerToken::start_bootstrap(1)));
        }
        assert_eq!(timer.attempts(), 100);
    }

    #[test]
    fn custom_delay_is_used() {
        let mut sched = RecordingScheduler::new();
        let policy = RetryPolicy::unbounded().with_delay(Duration::from_millis(250));
        let mut timer = RetryTimer::new(policy);
        timer.arm(&mut sched, TASKLET, 1);
        assert_eq!(sched.armed_timers()[0].2, Duration::from_millis(250));
    }
}
