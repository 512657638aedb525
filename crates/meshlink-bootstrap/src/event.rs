//! Events delivered to the tasklet by the external scheduler.
//!
//! Every event carries its sender and receiver. Only events sent by the
//! system (the mesh stack and its event loop) are acted upon; anything a
//! peer tasklet posts on the shared channel is dropped.

use meshlink_core::TaskletId;

use crate::scheduler::TimerToken;

/// Network status codes reported by the mesh stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackStatus {
    /// Bootstrap finished and the node is attached.
    BootstrapReady,
    /// Link-layer active scan found no beacons. Stack is idle.
    ScanFail,
    /// No ND router on the channel, or global address registration failed.
    AddressAllocFail,
    /// Connection to the access point was lost.
    ConnectionDown,
    /// Parent stopped answering data polls.
    ParentPollFail,
    /// Network authentication failed. Stack is idle.
    AuthFail,
    /// Any other code.
    Unknown(u8),
}

impl StackStatus {
    /// Decode a raw stack status code.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::BootstrapReady,
            3 => Self::ScanFail,
            4 => Self::AddressAllocFail,
            7 => Self::AuthFail,
            8 => Self::ConnectionDown,
            9 => Self::ParentPollFail,
            other => Self::Unknown(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::BootstrapReady => 0,
            Self::ScanFail => 3,
            Self::AddressAllocFail => 4,
            Self::AuthFail => 7,
            Self::ConnectionDown => 8,
            Self::ParentPollFail => 9,
            Self::Unknown(code) => *code,
        }
    }

    /// Whether the status reports a bootstrap or link failure.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::ScanFail
                | Self::AddressAllocFail
                | Self::ConnectionDown
                | Self::ParentPollFail
                | Self::AuthFail
        )
    }
}

/// Originator of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSender {
    /// The mesh stack or the scheduler itself.
    System,
    /// Another tasklet sharing the dispatch channel.
    Tasklet(TaskletId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Lifecycle init, delivered once after handler registration.
    Init,
    NetworkStatus(StackStatus),
    Timer(TimerToken),
    /// Connect requested by the application on an already registered handler.
    ApplicationConnect { generation: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub sender: EventSender,
    pub receiver: TaskletId,
    pub kind: EventKind,
}

impl Event {
    pub fn init(receiver: TaskletId) -> Self {
        Self::system(receiver, EventKind::Init)
    }

    pub fn network_status(receiver: TaskletId, status: StackStatus) -> Self {
        Self::system(receiver, EventKind::NetworkStatus(status))
    }

    pub fn timer(receiver: TaskletId, token: TimerToken) -> Self {
        Self::system(receiver, EventKind::Timer(token))
    }

    pub fn application_connect(receiver: TaskletId, generation: u32) -> Self {
        Self::system(receiver, EventKind::ApplicationConnect { generation })
    }

    fn system(receiver: TaskletId, kind: EventKind) -> Self {
        Self {
            sender: EventSender::System,
            receiver,
            kind,
        }
    }

    pub fn is_from_system(&self) -> bool {
        self.sender == EventSender::System
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_roundtrip_for_known_values() {
        for code in [0u8, 3, 4, 7, 8, 9] {
            assert_eq!(StackStatus::from_code(code).code(), code);
            assert!(!matches!(StackStatus::from_code(code), StackStatus::Unknown(_)));
        }
    }

    #[test]
    fn unlisted_codes_are_unknown() {
        assert_eq!(StackStatus::from_code(2), StackStatus::Unknown(2));
        assert_eq!(StackStatus::from_code(200), StackStatus::Unknown(200));
    }

    #[test]
    fn only_failures_are_failures() {
        assert!(!StackStatus::BootstrapReady.is_failure());
        assert!(!StackStatus::Unknown(42).is_failure());
        assert!(StackStatus::ScanFail.is_failure());
        assert!(StackStatus::AuthFail.is_failure());
    }

    #[test]
    fn constructors_are_system_events() {
        let ev = Event::init(TaskletId(1));
        assert!(ev.is_from_system());
        assert_eq!(ev.kind, EventKind::Init);
    }
}
