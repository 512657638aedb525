//! Bootstrap error types.
//!
//! Stack-reported bootstrap failures (scan failures, lost parents and so on)
//! never show up here; they are absorbed into the retry loop. These errors
//! cover only call-time failures of the boundary API.

use meshlink_core::StackError;

/// Why the one-time event handler registration failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("handler already used by another tasklet")]
    AlreadyUsed,
    #[error("out of memory")]
    OutOfMemory,
}

/// Coarse error taxonomy reported to applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorKind {
    Unknown = 1,
    Memory = 2,
    State = 3,
    Param = 4,
}

impl ErrorKind {
    pub const fn code(&self) -> u8 {
        *self as u8
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("invalid parameter: {0}")]
    Param(&'static str),

    #[error("out of memory: {0}")]
    Memory(&'static str),

    #[error("already connected")]
    AlreadyConnected,

    #[error("not connected")]
    NotConnected,

    #[error("bootstrap not ready")]
    NotReady,

    #[error("operation not supported by this network kind")]
    WrongNetworkKind,

    #[error("event handler registration failed: {0}")]
    HandlerRegistration(#[from] RegistrationError),

    #[error("buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    #[error("stack error: {0}")]
    Stack(#[from] StackError),
}

impl MeshError {
    /// Reduce this error to the application-visible taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Param(_) | Self::BufferTooSmall { .. } => ErrorKind::Param,
            Self::Memory(_) => ErrorKind::Memory,
            Self::AlreadyConnected | Self::NotReady | Self::WrongNetworkKind => ErrorKind::State,
            Self::HandlerRegistration(RegistrationError::AlreadyUsed) => ErrorKind::Param,
            Self::HandlerRegistration(RegistrationError::OutOfMemory) => ErrorKind::Memory,
            Self::NotConnected | Self::Stack(_) => ErrorKind::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(MeshError::Param("callback").kind(), ErrorKind::Param);
        assert_eq!(MeshError::AlreadyConnected.kind(), ErrorKind::State);
        assert_eq!(MeshError::NotReady.kind(), ErrorKind::State);
        assert_eq!(MeshError::NotConnected.kind(), ErrorKind::Unknown);
        assert_eq!(
            MeshError::Stack(StackError::Rejected(-1)).kind(),
            ErrorKind::Unknown
        );
        assert_eq!(
            MeshError::HandlerRegistration(RegistrationError::AlreadyUsed).kind(),
            ErrorKind::Param
        );
        assert_eq!(
            MeshError::HandlerRegistration(RegistrationError::OutOfMemory).kind(),
            ErrorKind::Memory
        );
    }

    #[test]
    fn kind_codes_match_application_values() {
        assert_eq!(ErrorKind::Unknown.code(), 1);
        assert_eq!(ErrorKind::Memory.code(), 2);
        assert_eq!(ErrorKind::State.code(), 3);
        assert_eq!(ErrorKind::Param.code(), 4);
    }

    #[test]
    fn display_includes_source() {
        let err = MeshError::from(StackError::OutOfMemory);
        assert_eq!(err.to_string(), "stack error: out of memory");
        let err = MeshError::BufferTooSmall {
            needed: 40,
            actual: 16,
        };
        assert!(err.to_string().contains("need 40 bytes"));
    }
}
