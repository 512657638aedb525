//! Core types and constants for the meshlink bootstrap stack.
//!
//! This crate defines the newtype wrappers, radio/link constants, and stack
//! error codes shared by the bootstrap state machine and the node runtime.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{InvalidLength, StackError};
pub use types::{
    ChannelList, ChannelMask, DeviceId, Eui64, InterfaceId, LinkAddressInfo, MasterKey,
    MeshLocalPrefix, PanId, Pskc, Pskd, TaskletId,
};
