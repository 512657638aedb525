//! Connection status notification.

use std::fmt;

/// Connection status visible to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionStatus {
    Connected = 0,
    Disconnected = 1,
    /// The stack refused to start the bootstrap.
    BootstrapStartFailed = 2,
    /// An established link was lost, or retries were exhausted.
    BootstrapFailed = 3,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::BootstrapStartFailed => "bootstrap start failed",
            Self::BootstrapFailed => "bootstrap failed",
        };
        f.write_str(name)
    }
}

/// Receiver of connection status changes, implemented by the application.
///
/// Called synchronously from inside event dispatch, so implementations must
/// not block.
pub trait NotificationSink: Send {
    fn notify(&self, status: ConnectionStatus);
}

impl<F> NotificationSink for F
where
    F: Fn(ConnectionStatus) + Send,
{
    fn notify(&self, status: ConnectionStatus) {
        self(status)
    }
}

/// Single-slot holder for the registered sink.
#[derive(Default)]
pub struct Notifier {
    sink: Option<Box<dyn NotificationSink>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink, superseding any previous one.
    pub fn register(&mut self, sink: Box<dyn NotificationSink>) {
        self.sink = Some(sink);
    }

    pub fn is_registered(&self) -> bool {
        self.sink.is_some()
    }

    /// Invoke the registered sink. Silent no-op when none is registered.
    pub fn notify(&self, status: ConnectionStatus) {
        match &self.sink {
            Some(sink) => sink.notify(status),
            None => tracing::trace!(%status, "no sink registered, status dropped"),
        }
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("registered", &self.is_registered())
            .finish()
    }
}
