//! Error types for the events crate.

use std::fmt;

/// Result type alias for state store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// State store error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A store operation failed.
    StoreFailed { operation: String, reason: String },
    /// The stored record could not be encoded or decoded.
    Serialization { reason: String },
    /// A core operation (file access, parsing) failed.
    Core { reason: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StoreFailed { operation, reason } => {
                write!(f, "state store operation '{operation}' failed: {reason}")
            }
            Self::Serialization { reason } => {
                write!(f, "serialization error: {reason}")
            }
            Self::Core { reason } => {
                write!(f, "{reason}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<waltz_core::Error> for Error {
    fn from(err: waltz_core::Error) -> Self {
        Self::Core {
            reason: err.to_string(),
        }
    }
}

impl Error {
    /// Create a store failed error.
    pub fn store_failed(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StoreFailed {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a serialization error.
    pub fn serialization(reason: impl Into<String>) -> Self {
        Self::Serialization {
            reason: reason.into(),
        }
    }
}
