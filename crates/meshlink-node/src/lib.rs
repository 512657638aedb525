//! Async node runtime for the meshlink bootstrap tasklet.
//!
//! This crate hosts a [`Tasklet`](meshlink_bootstrap::Tasklet) on tokio,
//! providing configuration, logging, a tokio-backed scheduler and a
//! simulated mesh stack.

pub mod config;
pub mod error;
pub mod logging;
pub mod node;
pub mod runtime;
pub mod scheduler;
pub mod sim;

pub use config::NodeConfig;
pub use error::NodeError;
pub use node::Node;
pub use runtime::{MeshHandle, MeshRuntime};
pub use scheduler::{StatusReporter, TokioScheduler};
pub use sim::{SimulatedStack, SimulationSettings};
