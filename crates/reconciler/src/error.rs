//! Error types for the reconciler crate.
//!
//! Only unanticipated collaborator failures are errors. A missing
//! configuration or an unreachable supervisor is reported through
//! [`ReconcileOutcome`](crate::types::ReconcileOutcome) instead.

use thiserror::Error;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler error types.
#[derive(Debug, Error)]
pub enum Error {
    #[error("supervisor operation '{operation}' failed: {reason}")]
    Supervisor { operation: String, reason: String },

    #[error("requesting database '{database}' failed: {reason}")]
    Relation { database: String, reason: String },

    #[error("database connection check failed: {reason}")]
    Probe { reason: String },

    #[error("state store error: {0}")]
    State(#[from] waltz_events::Error),

    #[error("serialization error: {reason}")]
    Serialization { reason: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("event loop stopped")]
    LoopStopped,
}

impl Error {
    /// Create a supervisor error.
    pub fn supervisor(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Supervisor {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a relation request error.
    pub fn relation(database: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Relation {
            database: database.into(),
            reason: reason.into(),
        }
    }

    /// Create a probe error.
    pub fn probe(reason: impl Into<String>) -> Self {
        Self::Probe {
            reason: reason.into(),
        }
    }

    /// Create a serialization error.
    pub fn serialization(reason: impl Into<String>) -> Self {
        Self::Serialization {
            reason: reason.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}
