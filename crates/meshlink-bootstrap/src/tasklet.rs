//! The bootstrap tasklet: connection state machine and event dispatch.
//!
//! A [`Tasklet`] owns the connection state for one mesh interface. The host
//! scheduler delivers events through [`Tasklet::handle_event`] one at a time;
//! each call runs to completion, issuing stack calls and arming the retry
//! timer as needed. The application drives it with [`Tasklet::connect`] and
//! [`Tasklet::disconnect`] and hears back through its [`NotificationSink`].

use std::net::Ipv6Addr;

use meshlink_core::constants::{ADDRESS_STRING_MIN_LEN, SCAN_DURATION};
use meshlink_core::{DeviceId, Eui64, InterfaceId, Pskd, StackError, TaskletId};

use crate::config::{AddressMode, BootstrapMode, NetworkKind, ThreadDeviceConfig};
use crate::error::MeshError;
use crate::event::{Event, EventKind, StackStatus};
use crate::notify::{ConnectionStatus, NotificationSink, Notifier};
use crate::retry::{ArmOutcome, RetryPolicy, RetryTimer};
use crate::scheduler::{Scheduler, TimerToken};
use crate::stack::MeshStack;
use crate::state::{StatusOutcome, TaskletState, classify_status};

/// Short address requested in GP16 mode when the stack should pick one.
const DYNAMIC_SHORT_ADDRESS: u16 = 0xffff;

/// Drives bootstrap for one mesh interface on behalf of the application.
pub struct Tasklet<S, D> {
    kind: NetworkKind,
    stack: S,
    scheduler: D,
    state: TaskletState,
    /// Attached from `connect` until `disconnect`.
    interface: Option<InterfaceId>,
    /// Registered once, then reused by every later connect.
    handler: Option<TaskletId>,
    notifier: Notifier,
    retry: RetryTimer,
    /// Bumped on every connect and disconnect. Timers and connect events
    /// carry the generation they were issued in.
    generation: u32,
}

impl<S: MeshStack, D: Scheduler> Tasklet<S, D> {
    pub fn new(kind: NetworkKind, stack: S, scheduler: D) -> Self {
        Self::with_retry_policy(kind, stack, scheduler, RetryPolicy::default())
    }

    pub fn with_retry_policy(kind: NetworkKind, stack: S, scheduler: D, policy: RetryPolicy) -> Self {
        Self {
            kind,
            stack,
            scheduler,
            state: TaskletState::Created,
            interface: None,
            handler: None,
            notifier: Notifier::new(),
            retry: RetryTimer::new(policy),
            generation: 0,
        }
    }

    pub fn state(&self) -> TaskletState {
        self.state
    }

    pub fn interface(&self) -> Option<InterfaceId> {
        self.interface
    }

    pub fn handler(&self) -> Option<TaskletId> {
        self.handler
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn kind(&self) -> &NetworkKind {
        &self.kind
    }

    pub fn retry_pending(&self) -> bool {
        self.retry.is_armed()
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut S {
        &mut self.stack
    }

    pub fn scheduler(&self) -> &D {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut D {
        &mut self.scheduler
    }

    /// Create the stack interface for this network kind on RF driver `device`.
    pub fn network_init(&mut self, device: DeviceId) -> Result<InterfaceId, MeshError> {
        let name = self.kind.interface_name();
        let interface = self
            .stack
            .interface_init(device, name)
            .map_err(|err| match err {
                StackError::InvalidParameter => MeshError::Param("rf device id"),
                StackError::OutOfMemory => MeshError::Memory("network interface"),
                other => MeshError::Stack(other),
            })?;
        tracing::info!(%interface, name, device = device.0, "network interface created");
        Ok(interface)
    }

    /// Store the Thread device identity used by the next bootstrap.
    pub fn set_device_config(&mut self, eui64: Eui64, pskd: &str) -> Result<(), MeshError> {
        let NetworkKind::Thread(thread) = &mut self.kind else {
            return Err(MeshError::WrongNetworkKind);
        };
        let pskd = Pskd::new(pskd).map_err(|_| MeshError::Param("pskd"))?;
        thread.device = Some(ThreadDeviceConfig {
            eui64,
            pskd,
            leader_capable: true,
        });
        tracing::debug!(%eui64, "thread device configuration set");
        Ok(())
    }

    /// Start a join on `interface`, reporting progress to `sink`.
    ///
    /// The first connect registers the event handler and waits for its init
    /// event; later connects reuse the handler and post a connect event.
    /// Either way the stack is only touched from inside event dispatch.
    pub fn connect(
        &mut self,
        sink: Option<Box<dyn NotificationSink>>,
        interface: InterfaceId,
    ) -> Result<(), MeshError> {
        let Some(sink) = sink else {
            return Err(MeshError::Param("status callback"));
        };
        if let Some(current) = self.interface {
            tracing::warn!(interface = %current, state = %self.state, "connect while already connected");
            return Err(MeshError::AlreadyConnected);
        }
        if let NetworkKind::Thread(thread) = &self.kind
            && thread.device.is_none()
        {
            return Err(MeshError::Param("thread device configuration"));
        }

        let first = self.handler.is_none();
        if first {
            let id = self.scheduler.register_handler().map_err(|err| {
                tracing::error!(%err, "event handler registration failed");
                MeshError::from(err)
            })?;
            self.handler = Some(id);
        }

        self.cancel_retry();
        self.generation = self.generation.wrapping_add(1);
        self.retry.reset_attempts();
        self.notifier.register(sink);
        self.interface = Some(interface);
        self.set_state(TaskletState::Initialized);

        if !first && let Some(handler) = self.handler {
            self.scheduler
                .post(Event::application_connect(handler, self.generation));
        }
        tracing::info!(%interface, network = self.kind.label(), "connect requested");
        Ok(())
    }

    /// Bring the interface down and report `Disconnected`.
    ///
    /// The sink hears `Disconnected` exactly once per call, even when no
    /// interface was attached; that case still returns
    /// [`MeshError::NotConnected`]. A stack failure to bring the interface
    /// down is returned after the tasklet has detached anyway.
    pub fn disconnect(&mut self) -> Result<(), MeshError> {
        self.cancel_retry();
        self.generation = self.generation.wrapping_add(1);

        let result = match self.interface.take() {
            Some(interface) => match self.stack.interface_down(interface) {
                Ok(()) => {
                    tracing::info!(%interface, "disconnected");
                    Ok(())
                }
                Err(err) => {
                    tracing::warn!(%interface, %err, "interface down failed");
                    Err(MeshError::Stack(err))
                }
            },
            None => Err(MeshError::NotConnected),
        };

        let next = if self.handler.is_some() {
            TaskletState::Initialized
        } else {
            TaskletState::Created
        };
        self.set_state(next);
        self.notifier.notify(ConnectionStatus::Disconnected);
        result
    }

    /// Global address of this node. Only available once bootstrap is ready.
    pub fn own_ip_address(&self) -> Result<Ipv6Addr, MeshError> {
        let interface = self.ready_interface()?;
        Ok(self.stack.own_address(interface)?)
    }

    /// Address of the border router. Only available once bootstrap is ready.
    pub fn router_ip_address(&self) -> Result<Ipv6Addr, MeshError> {
        let interface = self.ready_interface()?;
        Ok(self.stack.router_address(interface)?)
    }

    /// Entry point for the scheduler.
    pub fn handle_event(&mut self, event: Event) {
        if !event.is_from_system() {
            tracing::trace!(sender = ?event.sender, "ignoring event from foreign sender");
            return;
        }
        if self.handler != Some(event.receiver) {
            tracing::trace!(receiver = %event.receiver, "ignoring event for another tasklet");
            return;
        }

        match event.kind {
            EventKind::Init => self.on_init(),
            EventKind::NetworkStatus(status) => self.on_network_status(status),
            EventKind::Timer(token) => self.on_timer(token),
            EventKind::ApplicationConnect { generation } => self.on_application_connect(generation),
        }
    }

    fn on_init(&mut self) {
        match (self.state, self.interface) {
            (TaskletState::Initialized, Some(interface)) => self.start_bootstrap(interface),
            _ => tracing::debug!(state = %self.state, "init with nothing to configure"),
        }
    }

    fn on_application_connect(&mut self, generation: u32) {
        if generation != self.generation {
            tracing::trace!(generation, current = self.generation, "dropping stale connect event");
            return;
        }
        match (self.state, self.interface) {
            (TaskletState::Initialized, Some(interface)) => self.start_bootstrap(interface),
            _ => tracing::trace!(state = %self.state, "connect event with nothing to configure"),
        }
    }

    fn on_network_status(&mut self, status: StackStatus) {
        let Some(interface) = self.interface else {
            tracing::trace!(?status, "status with no interface attached");
            return;
        };

        match classify_status(self.state, status) {
            StatusOutcome::Connected => self.enter_ready(interface),
            StatusOutcome::Recovered => {
                self.cancel_retry();
                self.set_state(TaskletState::BootstrapStarted);
                self.enter_ready(interface);
            }
            StatusOutcome::DuplicateReady => {
                tracing::debug!(%interface, "ready re-delivered, already connected");
            }
            StatusOutcome::RetrySilently => {
                tracing::debug!(%interface, ?status, "bootstrap failed");
                self.set_state(TaskletState::BootstrapFailed);
                self.schedule_retry(false);
            }
            StatusOutcome::LinkLost => {
                tracing::warn!(%interface, ?status, "link lost");
                self.set_state(TaskletState::BootstrapFailed);
                self.notifier.notify(ConnectionStatus::BootstrapFailed);
                self.schedule_retry(true);
            }
            StatusOutcome::NotStarted => {
                tracing::debug!(state = %self.state, ?status, "status before bootstrap started");
            }
            StatusOutcome::Unrecognized(code) => {
                tracing::warn!(%interface, code, "unknown network status");
            }
        }
    }

    fn on_timer(&mut self, token: TimerToken) {
        if token.generation != self.generation || !self.retry.fire(token) {
            tracing::trace!(?token, current = self.generation, "dropping stale timer");
            return;
        }
        let (TaskletState::BootstrapFailed, Some(interface)) = (self.state, self.interface) else {
            tracing::trace!(state = %self.state, "retry fired outside failed state");
            return;
        };

        tracing::debug!(%interface, attempt = self.retry.attempts(), "restarting bootstrap");
        match self.stack.interface_up(interface) {
            Ok(()) => self.set_state(TaskletState::BootstrapStarted),
            Err(err) => {
                tracing::warn!(%interface, %err, "bootstrap restart rejected");
                self.schedule_retry(false);
            }
        }
    }

    /// Apply link configuration and issue `interface_up`.
    fn start_bootstrap(&mut self, interface: InterfaceId) {
        let result = self
            .apply_configuration(interface)
            .and_then(|()| self.stack.interface_up(interface));

        match result {
            Ok(()) => {
                self.set_state(TaskletState::BootstrapStarted);
                tracing::info!(%interface, network = self.kind.label(), "bootstrap started");
            }
            Err(err) => {
                self.set_state(TaskletState::BootstrapFailed);
                tracing::warn!(%interface, %err, "bootstrap start failed");
                self.notifier.notify(ConnectionStatus::BootstrapStartFailed);
            }
        }
    }

    fn apply_configuration(&mut self, interface: InterfaceId) -> Result<(), StackError> {
        match &self.kind {
            NetworkKind::Lowpan(cfg) => {
                self.stack
                    .set_bootstrap_mode(interface, cfg.mode, BootstrapMode::NdWithMle)?;
                self.stack.set_link_security(interface, &cfg.security)?;
                self.stack
                    .set_scan_parameters(interface, cfg.channels, SCAN_DURATION)?;
                self.stack.set_network_id_filter(interface, None)?;
            }
            NetworkKind::Thread(cfg) => {
                let device = cfg.device.as_ref().ok_or(StackError::InvalidParameter)?;
                self.stack.set_bootstrap_mode(
                    interface,
                    cfg.device_type.node_mode(),
                    BootstrapMode::Thread,
                )?;
                self.stack.set_address_mode(
                    interface,
                    AddressMode::Gp16 {
                        short_address: DYNAMIC_SHORT_ADDRESS,
                        generate_dynamic: true,
                    },
                )?;
                let link = cfg.link_configuration(device);
                self.stack
                    .thread_node_init(interface, cfg.channels, device, &link)?;
            }
        }
        Ok(())
    }

    fn enter_ready(&mut self, interface: InterfaceId) {
        self.retry.reset_attempts();
        self.set_state(TaskletState::BootstrapReady);
        tracing::info!(%interface, "bootstrap ready");
        self.trace_bootstrap_info(interface);
        self.notifier.notify(ConnectionStatus::Connected);
    }

    fn trace_bootstrap_info(&self, interface: InterfaceId) {
        match self.stack.own_address(interface) {
            Ok(addr) => tracing::debug!(%interface, %addr, "global address"),
            Err(err) => tracing::debug!(%interface, %err, "global address unavailable"),
        }
        if let Ok(addr) = self.stack.router_address(interface) {
            tracing::debug!(%interface, %addr, "border router");
        }
        if let Ok(link) = self.stack.link_address(interface) {
            tracing::debug!(
                %interface,
                pan_id = %link.pan_id,
                short_address = format_args!("{:#06x}", link.short_address),
                mac64 = %link.mac64,
                iid = %link.iid,
                "link addressing"
            );
        }
    }

    fn schedule_retry(&mut self, failure_reported: bool) {
        let Some(handler) = self.handler else {
            return;
        };
        match self.retry.arm(&mut self.scheduler, handler, self.generation) {
            ArmOutcome::Armed => {
                tracing::debug!(delay = ?self.retry.policy().delay, "retry armed");
            }
            ArmOutcome::AlreadyPending => tracing::trace!("retry already pending"),
            ArmOutcome::Exhausted => {
                tracing::warn!(attempts = self.retry.attempts(), "retry attempts exhausted");
                if !failure_reported {
                    self.notifier.notify(ConnectionStatus::BootstrapFailed);
                }
            }
            ArmOutcome::GaveUp => {}
        }
    }

    fn cancel_retry(&mut self) {
        if let Some(handler) = self.handler {
            self.retry.cancel(&mut self.scheduler, handler);
        }
    }

    fn ready_interface(&self) -> Result<InterfaceId, MeshError> {
        match (self.state, self.interface) {
            (TaskletState::BootstrapReady, Some(interface)) => Ok(interface),
            _ => Err(MeshError::NotReady),
        }
    }

    fn set_state(&mut self, next: TaskletState) {
        if self.state != next {
            tracing::debug!(from = %self.state, to = %next, "state transition");
            self.state = next;
        }
    }
}

/// Render an address for a caller-supplied buffer of `buffer_len` bytes.
pub fn format_address(addr: Ipv6Addr, buffer_len: usize) -> Result<String, MeshError> {
    if buffer_len < ADDRESS_STRING_MIN_LEN {
        return Err(MeshError::BufferTooSmall {
            needed: ADDRESS_STRING_MIN_LEN,
            actual: buffer_len,
        });
    }
    Ok(addr.to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use proptest::prelude::*;

    use super::*;
    use crate::config::{LowpanConfig, NodeMode, ThreadConfig};
    use crate::error::{ErrorKind, RegistrationError};
    use crate::event::EventSender;
    use crate::testing::{
        RecordingScheduler, RecordingSink, RecordingStack, StackCall, assert_connected_once_per_cycle,
        assert_interface_up_count, assert_single_retry_pending, deliver_status, dispatch_pending,
        fire_retry,
    };

    type TestTasklet = Tasklet<RecordingStack, RecordingScheduler>;

    const IF: InterfaceId = InterfaceId(3);

    fn lowpan() -> TestTasklet {
        Tasklet::new(
            NetworkKind::Lowpan(LowpanConfig::default()),
            RecordingStack::new(),
            RecordingScheduler::new(),
        )
    }

    fn thread() -> TestTasklet {
        Tasklet::new(
            NetworkKind::Thread(ThreadConfig::default()),
            RecordingStack::new(),
            RecordingScheduler::new(),
        )
    }

    fn started(sink: &RecordingSink) -> TestTasklet {
        let mut t = lowpan();
        t.connect(Some(sink.boxed()), IF).unwrap();
        dispatch_pending(&mut t);
        assert_eq!(t.state(), TaskletState::BootstrapStarted);
        t
    }

    fn ready(sink: &RecordingSink) -> TestTasklet {
        let mut t = started(sink);
        deliver_status(&mut t, StackStatus::BootstrapReady);
        assert_eq!(t.state(), TaskletState::BootstrapReady);
        t
    }

    #[test]
    fn scan_fail_then_ready_connects_once() {
        let sink = RecordingSink::new();
        let mut t = lowpan();
        t.connect(Some(sink.boxed()), IF).unwrap();
        assert_eq!(t.state(), TaskletState::Initialized);
        assert_interface_up_count(&t, 0);

        dispatch_pending(&mut t);
        assert_interface_up_count(&t, 1);
        assert_eq!(t.state(), TaskletState::BootstrapStarted);

        deliver_status(&mut t, StackStatus::ScanFail);
        assert_eq!(t.state(), TaskletState::BootstrapFailed);
        let armed = t.scheduler().armed_timers();
        assert_eq!(armed.len(), 1);
        assert_eq!(armed[0].2, Duration::from_millis(5000));
        assert!(sink.statuses().is_empty());

        assert!(fire_retry(&mut t));
        assert_interface_up_count(&t, 2);
        assert_eq!(t.state(), TaskletState::BootstrapStarted);

        deliver_status(&mut t, StackStatus::BootstrapReady);
        assert_eq!(t.state(), TaskletState::BootstrapReady);
        assert_eq!(sink.statuses(), vec![ConnectionStatus::Connected]);
    }

    #[test]
    fn connect_without_sink_is_param_error() {
        let mut t = lowpan();
        let err = t.connect(None, IF).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Param);
        assert!(t.stack().calls().is_empty());
        assert!(t.scheduler().calls().is_empty());
        assert_eq!(t.state(), TaskletState::Created);
    }

    #[test]
    fn connect_while_connected_issues_no_calls() {
        let sink = RecordingSink::new();
        let mut t = started(&sink);
        let stack_calls = t.stack().calls().len();
        let sched_calls = t.scheduler().calls().len();

        let err = t.connect(Some(sink.boxed()), IF).unwrap_err();
        assert!(matches!(err, MeshError::AlreadyConnected));
        assert_eq!(err.kind(), ErrorKind::State);

        deliver_status(&mut t, StackStatus::BootstrapReady);
        let err = t.connect(Some(sink.boxed()), InterfaceId(4)).unwrap_err();
        assert!(matches!(err, MeshError::AlreadyConnected));

        assert_eq!(t.stack().calls().len(), stack_calls);
        assert_eq!(t.scheduler().calls().len(), sched_calls);
    }

    #[test]
    fn duplicate_ready_does_not_renotify() {
        let sink = RecordingSink::new();
        let mut t = ready(&sink);
        deliver_status(&mut t, StackStatus::BootstrapReady);
        deliver_status(&mut t, StackStatus::BootstrapReady);
        assert_eq!(sink.count(ConnectionStatus::Connected), 1);
    }

    #[test]
    fn second_failure_keeps_single_timer() {
        let sink = RecordingSink::new();
        let mut t = started(&sink);
        deliver_status(&mut t, StackStatus::ScanFail);
        deliver_status(&mut t, StackStatus::AuthFail);
        assert_eq!(t.scheduler().armed_timers().len(), 1);
        assert_single_retry_pending(&t);
    }

    #[test]
    fn disconnect_cancels_pending_retry() {
        let sink = RecordingSink::new();
        let mut t = started(&sink);
        deliver_status(&mut t, StackStatus::ScanFail);
        let stale = t.scheduler().armed_timers()[0];

        t.disconnect().unwrap();
        assert!(t.scheduler().armed_timers().is_empty());
        assert!(!t.retry_pending());

        t.handle_event(Event::timer(stale.0, stale.1));
        assert_interface_up_count(&t, 1);
        assert_eq!(t.stack().interface_down_count(), 1);
    }

    #[test]
    fn stale_timer_after_reconnect_is_ignored() {
        let sink = RecordingSink::new();
        let mut t = started(&sink);
        deliver_status(&mut t, StackStatus::ScanFail);
        let stale = t.scheduler().armed_timers()[0];
        t.disconnect().unwrap();
        t.connect(Some(sink.boxed()), IF).unwrap();
        dispatch_pending(&mut t);
        deliver_status(&mut t, StackStatus::ScanFail);
        let ups = t.stack().interface_up_count();

        t.handle_event(Event::timer(stale.0, stale.1));
        assert_eq!(t.stack().interface_up_count(), ups);
        assert!(t.retry_pending());
    }

    #[test]
    fn disconnect_notifies_exactly_once() {
        let sink = RecordingSink::new();
        let mut t = ready(&sink);
        t.disconnect().unwrap();
        assert_eq!(
            sink.statuses(),
            vec![ConnectionStatus::Connected, ConnectionStatus::Disconnected]
        );
        assert_eq!(t.interface(), None);
        assert_eq!(t.state(), TaskletState::Initialized);
    }

    #[test]
    fn disconnect_without_interface_still_notifies() {
        let sink = RecordingSink::new();
        let mut t = started(&sink);
        t.disconnect().unwrap();

        let err = t.disconnect().unwrap_err();
        assert!(matches!(err, MeshError::NotConnected));
        assert_eq!(sink.count(ConnectionStatus::Disconnected), 2);
        assert_eq!(t.stack().interface_down_count(), 1);
    }

    #[test]
    fn disconnect_before_any_connect_stays_created() {
        let mut t = lowpan();
        assert!(matches!(t.disconnect(), Err(MeshError::NotConnected)));
        assert_eq!(t.state(), TaskletState::Created);
        assert!(t.stack().calls().is_empty());
    }

    #[test]
    fn failed_interface_down_is_reported_after_detaching() {
        let sink = RecordingSink::new();
        let mut t = Tasklet::new(
            NetworkKind::Lowpan(LowpanConfig::default()),
            RecordingStack::new().reject_interface_down(StackError::Rejected(-1)),
            RecordingScheduler::new(),
        );
        t.connect(Some(sink.boxed()), IF).unwrap();
        dispatch_pending(&mut t);
        deliver_status(&mut t, StackStatus::BootstrapReady);

        let err = t.disconnect().unwrap_err();
        assert!(matches!(err, MeshError::Stack(StackError::Rejected(-1))));
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(sink.count(ConnectionStatus::Disconnected), 1);
        assert_eq!(t.interface(), None);
        assert_eq!(t.state(), TaskletState::Initialized);
        assert_eq!(t.stack().interface_down_count(), 1);
    }

    #[test]
    fn foreign_sender_is_ignored() {
        let sink = RecordingSink::new();
        let mut t = lowpan();
        t.connect(Some(sink.boxed()), IF).unwrap();
        let handler = t.handler().unwrap();

        t.handle_event(Event {
            sender: EventSender::Tasklet(TaskletId(9)),
            receiver: handler,
            kind: EventKind::Init,
        });
        assert!(t.stack().calls().is_empty());
        assert_eq!(t.state(), TaskletState::Initialized);
    }

    #[test]
    fn event_for_other_receiver_is_ignored() {
        let sink = RecordingSink::new();
        let mut t = lowpan();
        t.connect(Some(sink.boxed()), IF).unwrap();
        t.handle_event(Event::init(TaskletId(42)));
        assert!(t.stack().calls().is_empty());
    }

    #[test]
    fn handler_registered_once_across_reconnects() {
        let sink = RecordingSink::new();
        let mut t = started(&sink);
        t.disconnect().unwrap();
        t.connect(Some(sink.boxed()), IF).unwrap();
        assert_eq!(t.scheduler().registrations(), 1);
        assert_eq!(t.scheduler().pending_events(), 1);

        dispatch_pending(&mut t);
        assert_eq!(t.state(), TaskletState::BootstrapStarted);
        assert_interface_up_count(&t, 2);
    }

    #[test]
    fn stale_connect_events_are_dropped() {
        let sink = RecordingSink::new();
        let mut t = started(&sink);
        t.disconnect().unwrap();
        t.connect(Some(sink.boxed()), IF).unwrap();
        t.disconnect().unwrap();
        t.connect(Some(sink.boxed()), IF).unwrap();
        assert_eq!(t.scheduler().pending_events(), 2);

        dispatch_pending(&mut t);
        assert_interface_up_count(&t, 2);
    }

    #[test]
    fn registration_failure_leaves_tasklet_untouched() {
        let sink = RecordingSink::new();
        let mut t = lowpan();
        t.scheduler_mut()
            .fail_registration(RegistrationError::OutOfMemory);

        let err = t.connect(Some(sink.boxed()), IF).unwrap_err();
        assert!(matches!(err, MeshError::HandlerRegistration(_)));
        assert_eq!(err.kind(), ErrorKind::Memory);
        assert_eq!(t.state(), TaskletState::Created);
        assert_eq!(t.interface(), None);

        t.connect(Some(sink.boxed()), IF).unwrap();
        assert_eq!(t.scheduler().registrations(), 2);
    }

    #[test]
    fn rejected_start_reports_start_failure_without_retry() {
        let sink = RecordingSink::new();
        let mut t = lowpan();
        t.stack_mut().push_up_result(Err(StackError::Rejected(-1)));
        t.connect(Some(sink.boxed()), IF).unwrap();
        dispatch_pending(&mut t);

        assert_eq!(t.state(), TaskletState::BootstrapFailed);
        assert_eq!(sink.statuses(), vec![ConnectionStatus::BootstrapStartFailed]);
        assert!(t.scheduler().armed_timers().is_empty());
    }

    #[test]
    fn rejected_configuration_skips_interface_up() {
        let sink = RecordingSink::new();
        let mut t = Tasklet::new(
            NetworkKind::Lowpan(LowpanConfig::default()),
            RecordingStack::new().reject_configuration(StackError::InvalidParameter),
            RecordingScheduler::new(),
        );
        t.connect(Some(sink.boxed()), IF).unwrap();
        dispatch_pending(&mut t);
        assert_interface_up_count(&t, 0);
        assert_eq!(sink.statuses(), vec![ConnectionStatus::BootstrapStartFailed]);
    }

    #[test]
    fn link_loss_reports_failure_then_retries() {
        let sink = RecordingSink::new();
        let mut t = ready(&sink);
        deliver_status(&mut t, StackStatus::ConnectionDown);

        assert_eq!(t.state(), TaskletState::BootstrapFailed);
        assert_eq!(
            sink.statuses(),
            vec![ConnectionStatus::Connected, ConnectionStatus::BootstrapFailed]
        );
        assert!(t.retry_pending());

        fire_retry(&mut t);
        deliver_status(&mut t, StackStatus::BootstrapReady);
        assert_eq!(sink.count(ConnectionStatus::Connected), 2);
        assert_connected_once_per_cycle(&sink);
    }

    #[test]
    fn ready_while_failed_cancels_retry() {
        let sink = RecordingSink::new();
        let mut t = started(&sink);
        deliver_status(&mut t, StackStatus::ParentPollFail);
        assert!(t.retry_pending());

        deliver_status(&mut t, StackStatus::BootstrapReady);
        assert_eq!(t.state(), TaskletState::BootstrapReady);
        assert!(t.scheduler().armed_timers().is_empty());
        assert_eq!(sink.statuses(), vec![ConnectionStatus::Connected]);
    }

    #[test]
    fn rejected_retry_rearms() {
        let sink = RecordingSink::new();
        let mut t = started(&sink);
        deliver_status(&mut t, StackStatus::ScanFail);
        t.stack_mut().push_up_result(Err(StackError::Rejected(-1)));

        fire_retry(&mut t);
        assert_eq!(t.state(), TaskletState::BootstrapFailed);
        assert!(t.retry_pending());
        assert!(sink.statuses().is_empty());

        fire_retry(&mut t);
        assert_eq!(t.state(), TaskletState::BootstrapStarted);
        assert_interface_up_count(&t, 3);
    }

    #[test]
    fn bounded_retries_report_failure_once() {
        let sink = RecordingSink::new();
        let mut t = Tasklet::with_retry_policy(
            NetworkKind::Lowpan(LowpanConfig::default()),
            RecordingStack::new(),
            RecordingScheduler::new(),
            RetryPolicy::bounded(2),
        );
        t.connect(Some(sink.boxed()), IF).unwrap();
        dispatch_pending(&mut t);

        for _ in 0..2 {
            deliver_status(&mut t, StackStatus::ScanFail);
            assert!(fire_retry(&mut t));
        }
        deliver_status(&mut t, StackStatus::ScanFail);
        assert!(!t.retry_pending());
        deliver_status(&mut t, StackStatus::ScanFail);

        assert_eq!(t.state(), TaskletState::BootstrapFailed);
        assert_eq!(sink.statuses(), vec![ConnectionStatus::BootstrapFailed]);
        assert_interface_up_count(&t, 3);
    }

    #[test]
    fn unknown_status_changes_nothing() {
        let sink = RecordingSink::new();
        let mut t = started(&sink);
        deliver_status(&mut t, StackStatus::Unknown(42));
        assert_eq!(t.state(), TaskletState::BootstrapStarted);
        assert!(!t.retry_pending());
        assert!(sink.statuses().is_empty());
    }

    #[test]
    fn status_after_disconnect_is_dropped() {
        let sink = RecordingSink::new();
        let mut t = started(&sink);
        t.disconnect().unwrap();
        deliver_status(&mut t, StackStatus::BootstrapReady);
        deliver_status(&mut t, StackStatus::ScanFail);
        assert_eq!(sink.statuses(), vec![ConnectionStatus::Disconnected]);
        assert!(!t.retry_pending());
    }

    #[test]
    fn addresses_require_ready() {
        let own: Ipv6Addr = "fd00:db8::211:2233:4455:6677".parse().unwrap();
        let router: Ipv6Addr = "fd00:db8::1".parse().unwrap();
        let sink = RecordingSink::new();
        let mut t = Tasklet::new(
            NetworkKind::Lowpan(LowpanConfig::default()),
            RecordingStack::new().with_addresses(own, router),
            RecordingScheduler::new(),
        );
        assert!(matches!(t.own_ip_address(), Err(MeshError::NotReady)));

        t.connect(Some(sink.boxed()), IF).unwrap();
        dispatch_pending(&mut t);
        assert!(matches!(t.router_ip_address(), Err(MeshError::NotReady)));

        deliver_status(&mut t, StackStatus::BootstrapReady);
        assert_eq!(t.own_ip_address().unwrap(), own);
        assert_eq!(t.router_ip_address().unwrap(), router);
    }

    #[test]
    fn format_address_checks_buffer_length() {
        let addr: Ipv6Addr = "fd00:db8::1".parse().unwrap();
        assert!(matches!(
            format_address(addr, 39),
            Err(MeshError::BufferTooSmall {
                needed: 40,
                actual: 39
            })
        ));
        assert_eq!(format_address(addr, 40).unwrap(), "fd00:db8::1");
    }

    #[test]
    fn lowpan_configuration_sequence() {
        let sink = RecordingSink::new();
        let t = started(&sink);
        let cfg = LowpanConfig::default();
        assert_eq!(
            t.stack().calls(),
            &[
                StackCall::SetBootstrapMode {
                    interface: IF,
                    mode: NodeMode::Router,
                    bootstrap: BootstrapMode::NdWithMle,
                },
                StackCall::SetLinkSecurity {
                    interface: IF,
                    security: cfg.security.clone(),
                },
                StackCall::SetScanParameters {
                    interface: IF,
                    channels: cfg.channels,
                    duration: SCAN_DURATION,
                },
                StackCall::SetNetworkIdFilter {
                    interface: IF,
                    filter: None,
                },
                StackCall::InterfaceUp(IF),
            ]
        );
    }

    #[test]
    fn thread_requires_device_config() {
        let sink = RecordingSink::new();
        let mut t = thread();
        let err = t.connect(Some(sink.boxed()), IF).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Param);
        assert_eq!(t.scheduler().registrations(), 0);
    }

    #[test]
    fn thread_configuration_sequence() {
        let sink = RecordingSink::new();
        let eui = Eui64::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77]);
        let mut t = thread();
        t.set_device_config(eui, "Secret password").unwrap();
        t.connect(Some(sink.boxed()), IF).unwrap();
        dispatch_pending(&mut t);

        let calls = t.stack().calls();
        assert_eq!(calls.len(), 4);
        assert!(matches!(
            calls[0],
            StackCall::SetBootstrapMode {
                bootstrap: BootstrapMode::Thread,
                mode: NodeMode::Router,
                ..
            }
        ));
        assert!(matches!(
            calls[1],
            StackCall::SetAddressMode {
                mode: AddressMode::Gp16 {
                    short_address: 0xffff,
                    generate_dynamic: true
                },
                ..
            }
        ));
        let StackCall::ThreadNodeInit { device, link, .. } = &calls[2] else {
            panic!("expected thread node init, got {:?}", calls[2]);
        };
        assert!(device.leader_capable);
        assert_eq!(link.extended_random_mac.to_bytes()[0], 0x02);
        assert_eq!(calls[3], StackCall::InterfaceUp(IF));
    }

    #[test]
    fn device_config_rules() {
        let eui = Eui64::new([1; 8]);
        let mut t = lowpan();
        assert!(matches!(
            t.set_device_config(eui, "Secret password"),
            Err(MeshError::WrongNetworkKind)
        ));

        let mut t = thread();
        let err = t.set_device_config(eui, "short").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Param);
        t.set_device_config(eui, "sixchr").unwrap();
    }

    #[test]
    fn network_init_uses_kind_name_and_maps_errors() {
        let mut t = thread();
        assert_eq!(t.network_init(DeviceId(0)).unwrap(), InterfaceId(1));
        assert_eq!(
            t.stack().calls()[0],
            StackCall::InterfaceInit {
                device: DeviceId(0),
                name: "6L-THREAD".into(),
            }
        );

        let mut t = Tasklet::new(
            NetworkKind::Lowpan(LowpanConfig::default()),
            RecordingStack::new().with_init_result(Err(StackError::InvalidParameter)),
            RecordingScheduler::new(),
        );
        assert_eq!(t.network_init(DeviceId(7)).unwrap_err().kind(), ErrorKind::Param);

        let mut t = Tasklet::new(
            NetworkKind::Lowpan(LowpanConfig::default()),
            RecordingStack::new().with_init_result(Err(StackError::OutOfMemory)),
            RecordingScheduler::new(),
        );
        assert_eq!(t.network_init(DeviceId(0)).unwrap_err().kind(), ErrorKind::Memory);

        let mut t = Tasklet::new(
            NetworkKind::Lowpan(LowpanConfig::default()),
            RecordingStack::new().with_init_result(Err(StackError::Rejected(-1))),
            RecordingScheduler::new(),
        );
        assert_eq!(t.network_init(DeviceId(0)).unwrap_err().kind(), ErrorKind::Unknown);
    }

    #[derive(Debug, Clone)]
    enum Step {
        Status(u8),
        FireTimer,
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            prop::sample::select(vec![0u8, 3, 4, 7, 8, 9, 42]).prop_map(Step::Status),
            Just(Step::FireTimer),
        ]
    }

    fn run(t: &mut TestTasklet, steps: &[Step]) {
        for step in steps {
            match step {
                Step::Status(code) => deliver_status(t, StackStatus::from_code(*code)),
                Step::FireTimer => {
                    fire_retry(t);
                }
            }
            assert_single_retry_pending(t);
        }
    }

    proptest! {
        #[test]
        fn connected_at_most_once_per_cycle(steps in prop::collection::vec(step(), 0..40)) {
            let sink = RecordingSink::new();
            let mut t = started(&sink);
            run(&mut t, &steps);
            assert_connected_once_per_cycle(&sink);
        }

        #[test]
        fn disconnect_always_settles(steps in prop::collection::vec(step(), 0..40)) {
            let sink = RecordingSink::new();
            let mut t = started(&sink);
            run(&mut t, &steps);
            let before = sink.count(ConnectionStatus::Disconnected);
            let ups = t.stack().interface_up_count();

            prop_assert!(t.disconnect().is_ok());
            prop_assert_eq!(sink.count(ConnectionStatus::Disconnected), before + 1);
            prop_assert!(t.scheduler().armed_timers().is_empty());

            run(&mut t, &steps);
            prop_assert_eq!(t.stack().interface_up_count(), ups);
        }
    }
}
