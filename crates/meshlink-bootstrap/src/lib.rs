//! Bootstrap state machine for 6LoWPAN-ND and Thread mesh nodes.
//!
//! A [`Tasklet`] drives one mesh interface from "connect requested" to
//! "attached", retrying failed bootstraps on a fixed timer and reporting
//! connection changes to a single [`NotificationSink`]. The mesh stack and
//! the event scheduler are consumed through the [`MeshStack`] and
//! [`Scheduler`] traits.

pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod notify;
pub mod retry;
pub mod scheduler;
pub mod stack;
pub mod state;
pub mod tasklet;
pub mod testing;

pub use config::{
    LinkSecurity, LowpanConfig, NetworkKind, NodeMode, ThreadConfig, ThreadDeviceConfig,
    ThreadDeviceType,
};
pub use error::{ErrorKind, MeshError, RegistrationError};
pub use event::{Event, EventKind, EventSender, StackStatus};
pub use notify::{ConnectionStatus, NotificationSink};
pub use retry::RetryPolicy;
pub use scheduler::{Scheduler, TimerKind, TimerToken};
pub use stack::MeshStack;
pub use state::TaskletState;
pub use tasklet::{Tasklet, format_address};
