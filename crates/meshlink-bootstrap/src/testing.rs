//! Recording fakes and conformance assertions for exercising a [`Tasklet`]
//! without a real mesh stack or scheduler.
//!
//! # Usage
//!
//! ```rust,ignore
//! use meshlink_bootstrap::testing::{self, RecordingScheduler, RecordingSink, RecordingStack};
//!
//! let sink = RecordingSink::new();
//! let mut tasklet = Tasklet::new(kind, RecordingStack::new(), RecordingScheduler::new());
//! tasklet.connect(Some(sink.boxed()), InterfaceId(3))?;
//! testing::dispatch_pending(&mut tasklet);
//! testing::assert_interface_up_count(&tasklet, 1);
//! ```

use std::collections::VecDeque;
use std::net::Ipv6Addr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use meshlink_core::{
    ChannelList, DeviceId, Eui64, InterfaceId, LinkAddressInfo, PanId, StackError, TaskletId,
};

use crate::config::{
    AddressMode, BootstrapMode, LinkSecurity, NodeMode, ThreadDeviceConfig,
    ThreadLinkConfiguration,
};
use crate::error::RegistrationError;
use crate::event::{Event, StackStatus};
use crate::notify::{ConnectionStatus, NotificationSink};
use crate::scheduler::{Scheduler, TimerToken};
use crate::stack::MeshStack;
use crate::tasklet::Tasklet;

/// One call made into a [`RecordingStack`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackCall {
    InterfaceInit {
        device: DeviceId,
        name: String,
    },
    SetBootstrapMode {
        interface: InterfaceId,
        mode: NodeMode,
        bootstrap: BootstrapMode,
    },
    SetLinkSecurity {
        interface: InterfaceId,
        security: LinkSecurity,
    },
    SetScanParameters {
        interface: InterfaceId,
        channels: ChannelList,
        duration: u8,
    },
    SetNetworkIdFilter {
        interface: InterfaceId,
        filter: Option<[u8; 16]>,
    },
    SetAddressMode {
        interface: InterfaceId,
        mode: AddressMode,
    },
    ThreadNodeInit {
        interface: InterfaceId,
        channels: ChannelList,
        device: ThreadDeviceConfig,
        link: ThreadLinkConfiguration,
    },
    InterfaceUp(InterfaceId),
    InterfaceDown(InterfaceId),
}

/// Mesh stack fake that records every call and returns programmed results.
#[derive(Debug)]
pub struct RecordingStack {
    calls: Vec<StackCall>,
    init_result: Result<InterfaceId, StackError>,
    up_results: VecDeque<Result<(), StackError>>,
    config_error: Option<StackError>,
    down_error: Option<StackError>,
    own_address: Option<Ipv6Addr>,
    router_address: Option<Ipv6Addr>,
    link: LinkAddressInfo,
}

impl Default for RecordingStack {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingStack {
    pub fn new() -> Self {
        let mac = Eui64::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77]);
        Self {
            calls: Vec::new(),
            init_result: Ok(InterfaceId(1)),
            up_results: VecDeque::new(),
            config_error: None,
            down_error: None,
            own_address: None,
            router_address: None,
            link: LinkAddressInfo {
                pan_id: PanId(0xDEFA),
                short_address: 0x0001,
                mac64: mac,
                iid: mac.locally_administered(),
            },
        }
    }

    /// Result returned by the next `interface_init`.
    pub fn with_init_result(mut self, result: Result<InterfaceId, StackError>) -> Self {
        self.init_result = result;
        self
    }

    /// Make every configuration call fail with `err`.
    pub fn reject_configuration(mut self, err: StackError) -> Self {
        self.config_error = Some(err);
        self
    }

    /// Make every `interface_down` fail with `err`.
    pub fn reject_interface_down(mut self, err: StackError) -> Self {
        self.down_error = Some(err);
        self
    }

    pub fn with_addresses(mut self, own: Ipv6Addr, router: Ipv6Addr) -> Self {
        self.own_address = Some(own);
        self.router_address = Some(router);
        self
    }

    /// Queue a result for a future `interface_up`. Once the queue runs dry,
    /// `interface_up` succeeds.
    pub fn push_up_result(&mut self, result: Result<(), StackError>) {
        self.up_results.push_back(result);
    }

    pub fn calls(&self) -> &[StackCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn interface_up_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, StackCall::InterfaceUp(_)))
            .count()
    }

    pub fn interface_down_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, StackCall::InterfaceDown(_)))
            .count()
    }

    fn configure(&mut self, call: StackCall) -> Result<(), StackError> {
        self.calls.push(call);
        match self.config_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl MeshStack for RecordingStack {
    fn interface_init(&mut self, device: DeviceId, name: &str) -> Result<InterfaceId, StackError> {
        self.calls.push(StackCall::InterfaceInit {
            device,
            name: name.to_string(),
        });
        self.init_result
    }

    fn set_bootstrap_mode(
        &mut self,
        interface: InterfaceId,
        mode: NodeMode,
        bootstrap: BootstrapMode,
    ) -> Result<(), StackError> {
        self.configure(StackCall::SetBootstrapMode {
            interface,
            mode,
            bootstrap,
        })
    }

    fn set_link_security(
        &mut self,
        interface: InterfaceId,
        security: &LinkSecurity,
    ) -> Result<(), StackError> {
        self.configure(StackCall::SetLinkSecurity {
            interface,
            security: security.clone(),
        })
    }

    fn set_scan_parameters(
        &mut self,
        interface: InterfaceId,
        channels: ChannelList,
        duration: u8,
    ) -> Result<(), StackError> {
        self.configure(StackCall::SetScanParameters {
            interface,
            channels,
            duration,
        })
    }

    fn set_network_id_filter(
        &mut self,
        interface: InterfaceId,
        filter: Option<&[u8; 16]>,
    ) -> Result<(), StackError> {
        self.configure(StackCall::SetNetworkIdFilter {
            interface,
            filter: filter.copied(),
        })
    }

    fn set_address_mode(
        &mut self,
        interface: InterfaceId,
        mode: AddressMode,
    ) -> Result<(), StackError> {
        self.configure(StackCall::SetAddressMode { interface, mode })
    }

    fn thread_node_init(
        &mut self,
        interface: InterfaceId,
        channels: ChannelList,
        device: &ThreadDeviceConfig,
        link: &ThreadLinkConfiguration,
    ) -> Result<(), StackError> {
        self.configure(StackCall::ThreadNodeInit {
            interface,
            channels,
            device: device.clone(),
            link: link.clone(),
        })
    }

    fn interface_up(&mut self, interface: InterfaceId) -> Result<(), StackError> {
        self.calls.push(StackCall::InterfaceUp(interface));
        self.up_results.pop_front().unwrap_or(Ok(()))
    }

    fn interface_down(&mut self, interface: InterfaceId) -> Result<(), StackError> {
        self.calls.push(StackCall::InterfaceDown(interface));
        match self.down_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn own_address(&self, _interface: InterfaceId) -> Result<Ipv6Addr, StackError> {
        self.own_address.ok_or(StackError::AddressUnavailable)
    }

    fn router_address(&self, _interface: InterfaceId) -> Result<Ipv6Addr, StackError> {
        self.router_address.ok_or(StackError::AddressUnavailable)
    }

    fn link_address(&self, _interface: InterfaceId) -> Result<LinkAddressInfo, StackError> {
        Ok(self.link)
    }
}

/// One call made into a [`RecordingScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCall {
    Register,
    Post(Event),
    Arm {
        tasklet: TaskletId,
        token: TimerToken,
        delay: Duration,
    },
    Cancel {
        tasklet: TaskletId,
        token: TimerToken,
    },
}

/// Scheduler fake with a manual event queue and manual timers.
///
/// Nothing is delivered on its own: tests pull events with
/// [`pop_event`](Self::pop_event) and fire timers with
/// [`fire_next_timer`](Self::fire_next_timer).
#[derive(Debug, Default)]
pub struct RecordingScheduler {
    calls: Vec<SchedulerCall>,
    queue: VecDeque<Event>,
    armed: Vec<(TaskletId, TimerToken, Duration)>,
    registered: Option<TaskletId>,
    registration_error: Option<RegistrationError>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next handler registration fail.
    pub fn fail_registration(&mut self, err: RegistrationError) {
        self.registration_error = Some(err);
    }

    pub fn calls(&self) -> &[SchedulerCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn registrations(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, SchedulerCall::Register))
            .count()
    }

    pub fn armed_timers(&self) -> &[(TaskletId, TimerToken, Duration)] {
        &self.armed
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    pub fn pop_event(&mut self) -> Option<Event> {
        self.queue.pop_front()
    }

    /// Expire the oldest armed timer and return its event.
    pub fn fire_next_timer(&mut self) -> Option<Event> {
        if self.armed.is_empty() {
            return None;
        }
        let (tasklet, token, _) = self.armed.remove(0);
        Some(Event::timer(tasklet, token))
    }
}

impl Scheduler for RecordingScheduler {
    fn register_handler(&mut self) -> Result<TaskletId, RegistrationError> {
        self.calls.push(SchedulerCall::Register);
        if let Some(err) = self.registration_error.take() {
            return Err(err);
        }
        if self.registered.is_some() {
            return Err(RegistrationError::AlreadyUsed);
        }
        let id = TaskletId(1);
        self.registered = Some(id);
        self.queue.push_back(Event::init(id));
        Ok(id)
    }

    fn post(&mut self, event: Event) {
        self.calls.push(SchedulerCall::Post(event));
        self.queue.push_back(event);
    }

    fn arm_timer(&mut self, tasklet: TaskletId, token: TimerToken, delay: Duration) {
        self.calls.push(SchedulerCall::Arm {
            tasklet,
            token,
            delay,
        });
        self.armed.push((tasklet, token, delay));
    }

    fn cancel_timer(&mut self, tasklet: TaskletId, token: TimerToken) {
        self.calls.push(SchedulerCall::Cancel { tasklet, token });
        self.armed.retain(|(t, k, _)| !(*t == tasklet && *k == token));
    }
}

/// Notification sink that collects every status it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    seen: Arc<Mutex<Vec<ConnectionStatus>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A boxed handle sharing this sink's record.
    pub fn boxed(&self) -> Box<dyn NotificationSink> {
        Box::new(self.clone())
    }

    pub fn statuses(&self) -> Vec<ConnectionStatus> {
        self.seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn count(&self, status: ConnectionStatus) -> usize {
        self.statuses().iter().filter(|s| **s == status).count()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, status: ConnectionStatus) {
        self.seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(status);
    }
}

/// Deliver every queued event to the tasklet, including events queued while
/// dispatching. Returns how many were delivered.
pub fn dispatch_pending<S: MeshStack>(tasklet: &mut Tasklet<S, RecordingScheduler>) -> usize {
    let mut delivered = 0;
    while let Some(event) = tasklet.scheduler_mut().pop_event() {
        tasklet.handle_event(event);
        delivered += 1;
    }
    delivered
}

/// Expire the oldest armed timer and deliver it. Returns `false` if no timer
/// was armed.
pub fn fire_retry<S: MeshStack>(tasklet: &mut Tasklet<S, RecordingScheduler>) -> bool {
    match tasklet.scheduler_mut().fire_next_timer() {
        Some(event) => {
            tasklet.handle_event(event);
            true
        }
        None => false,
    }
}

/// Deliver a stack status event to the tasklet's registered handler.
///
/// # Panics
///
/// Panics if the tasklet never registered a handler.
pub fn deliver_status<S: MeshStack, D: Scheduler>(
    tasklet: &mut Tasklet<S, D>,
    status: StackStatus,
) {
    let handler = tasklet
        .handler()
        .expect("tasklet has no registered handler");
    tasklet.handle_event(Event::network_status(handler, status));
}

/// Assert the stack saw exactly `expected` `interface_up` calls.
pub fn assert_interface_up_count<D: Scheduler>(
    tasklet: &Tasklet<RecordingStack, D>,
    expected: usize,
) {
    let actual = tasklet.stack().interface_up_count();
    assert_eq!(
        actual, expected,
        "expected {expected} interface_up calls, stack saw {actual}"
    );
}

/// Assert that at most one retry timer is outstanding.
pub fn assert_single_retry_pending<S: MeshStack>(tasklet: &Tasklet<S, RecordingScheduler>) {
    let armed = tasklet.scheduler().armed_timers().len();
    assert!(
        armed <= 1,
        "at most one retry timer may be outstanding, found {armed}"
    );
}

/// Assert that `Connected` is never reported twice without an intervening
/// `BootstrapFailed` or `Disconnected`.
pub fn assert_connected_once_per_cycle(sink: &RecordingSink) {
    let mut connected = false;
    for status in sink.statuses() {
        match status {
            ConnectionStatus::Connected => {
                assert!(!connected, "Connected reported twice in one cycle");
                connected = true;
            }
            ConnectionStatus::BootstrapFailed | ConnectionStatus::Disconnected => {
                connected = false;
            }
            ConnectionStatus::BootstrapStartFailed => {}
        }
    }
}
