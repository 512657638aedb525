//! Error types for the node runtime.

use meshlink_bootstrap::MeshError;

/// Errors that can occur during node operation.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("mesh error: {0}")]
    Mesh(#[from] MeshError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("node not started")]
    NotStarted,
}
