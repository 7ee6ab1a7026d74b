//! Core types for the reconciler.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status message while no database configuration is available.
pub const WAITING_FOR_DATABASE: &str = "Waiting for database configuration.";

/// Status message while the workload supervisor cannot be reached.
pub const WAITING_FOR_PEBBLE: &str = "Waiting for Pebble to be ready";

/// Status message when the connection probe rejects the database.
pub const DATABASE_UNREACHABLE: &str = "Unable to connect to the database.";

/// Externally visible status of the unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum UnitStatus {
    /// Nothing has been reconciled yet.
    #[default]
    Unknown,
    /// No usable configuration; needs user or relation action.
    Blocked(String),
    /// Configuration is available but the supervisor is not.
    Waiting(String),
    /// The desired layer is applied.
    Active,
}

impl UnitStatus {
    /// Create a blocked status.
    pub fn blocked(message: impl Into<String>) -> Self {
        Self::Blocked(message.into())
    }

    /// Create a waiting status.
    pub fn waiting(message: impl Into<String>) -> Self {
        Self::Waiting(message.into())
    }

    /// The attached message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Blocked(message) | Self::Waiting(message) => Some(message),
            Self::Unknown | Self::Active => None,
        }
    }

    /// Status name as shown to users.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Blocked(_) => "blocked",
            Self::Waiting(_) => "waiting",
            Self::Active => "active",
        }
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(message) => write!(f, "{}: {message}", self.name()),
            None => write!(f, "{}", self.name()),
        }
    }
}

/// Result of handling one lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileOutcome {
    /// The desired layer is in place; `restarted` is true if it had to be applied.
    Applied { restarted: bool },
    /// No usable configuration. The supervisor was not touched.
    Blocked,
    /// The supervisor was unreachable. The event must be redelivered later.
    Deferred,
    /// The event was not relevant to this unit; nothing ran.
    Ignored,
}

impl ReconcileOutcome {
    /// Whether the host must redeliver the event.
    pub const fn needs_redelivery(self) -> bool {
        matches!(self, Self::Deferred)
    }
}
