//! Error types for the meshlink-core crate.

use core::fmt;

/// Failure reported by the underlying mesh stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    /// The stack rejected a parameter (bad device id, bad interface id).
    InvalidParameter,
    /// The stack could not allocate the resources for the request.
    OutOfMemory,
    /// The requested address has not been assigned yet.
    AddressUnavailable,
    /// Any other negative return code.
    Rejected(i8),
}

impl StackError {
    /// Interpret a raw negative stack return code.
    pub fn from_code(code: i8) -> Self {
        match code {
            -2 => StackError::InvalidParameter,
            -3 => StackError::OutOfMemory,
            other => StackError::Rejected(other),
        }
    }
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackError::InvalidParameter => write!(f, "invalid parameter"),
            StackError::OutOfMemory => write!(f, "out of memory"),
            StackError::AddressUnavailable => write!(f, "address not available"),
            StackError::Rejected(code) => write!(f, "rejected with code {code}"),
        }
    }
}

impl std::error::Error for StackError {}

/// A byte slice or string had the wrong length for a fixed-size type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidLength {
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for InvalidLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid length: expected {}, got {}",
            self.expected, self.actual
        )
    }
}

impl std::error::Error for InvalidLength {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_code_maps_known_codes() {
        assert_eq!(StackError::from_code(-2), StackError::InvalidParameter);
        assert_eq!(StackError::from_code(-3), StackError::OutOfMemory);
        assert_eq!(StackError::from_code(-1), StackError::Rejected(-1));
    }

    #[test]
    fn display_variants() {
        assert_eq!(StackError::OutOfMemory.to_string(), "out of memory");
        assert_eq!(StackError::Rejected(-7).to_string(), "rejected with code -7");
        let err = InvalidLength {
            expected: 8,
            actual: 3,
        };
        assert_eq!(err.to_string(), "invalid length: expected 8, got 3");
    }
}
