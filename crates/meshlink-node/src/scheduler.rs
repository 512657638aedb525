//! Tokio-backed [`Scheduler`] for a single tasklet.
//!
//! Posted events and expired timers are pushed onto the runtime's event
//! queue, which the runtime drains one event at a time.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use meshlink_bootstrap::{Event, RegistrationError, Scheduler, StackStatus, TimerToken};
use meshlink_core::TaskletId;

/// Handle the mesh stack uses to report network status to the tasklet.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    events: mpsc::UnboundedSender<Event>,
    receiver: TaskletId,
}

impl StatusReporter {
    pub(crate) fn new(events: mpsc::UnboundedSender<Event>, receiver: TaskletId) -> Self {
        Self { events, receiver }
    }

    /// Queue a network status event. Returns `false` once the runtime is gone.
    pub fn report(&self, status: StackStatus) -> bool {
        self.events
            .send(Event::network_status(self.receiver, status))
            .is_ok()
    }
}

pub struct TokioScheduler {
    events: mpsc::UnboundedSender<Event>,
    tasklet: TaskletId,
    registered: bool,
    timers: HashMap<TimerToken, JoinHandle<()>>,
}

impl TokioScheduler {
    /// `tasklet` is the id handed out on registration.
    pub fn new(events: mpsc::UnboundedSender<Event>, tasklet: TaskletId) -> Self {
        Self {
            events,
            tasklet,
            registered: false,
            timers: HashMap::new(),
        }
    }

    /// Number of timers still running.
    pub fn active_timers(&self) -> usize {
        self.timers.values().filter(|h| !h.is_finished()).count()
    }

    fn send(&self, event: Event) {
        if self.events.send(event).is_err() {
            tracing::trace!(?event, "event queue closed, event dropped");
        }
    }
}

impl Scheduler for TokioScheduler {
    fn register_handler(&mut self) -> Result<TaskletId, RegistrationError> {
        if self.registered {
            return Err(RegistrationError::AlreadyUsed);
        }
        self.registered = true;
        self.send(Event::init(self.tasklet));
        Ok(self.tasklet)
    }

    fn post(&mut self, event: Event) {
        self.send(event);
    }

    fn arm_timer(&mut self, tasklet: TaskletId, token: TimerToken, delay: Duration) {
        self.timers.retain(|_, handle| !handle.is_finished());

        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(Event::timer(tasklet, token));
        });
        if let Some(previous) = self.timers.insert(token, handle) {
            previous.abort();
        }
    }

    fn cancel_timer(&mut self, _tasklet: TaskletId, token: TimerToken) {
        if let Some(handle) = self.timers.remove(&token) {
            handle.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}
