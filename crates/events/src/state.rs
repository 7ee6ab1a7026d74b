//! Persisted database connection state.

use serde::{Deserialize, Serialize};
use waltz_core::DatabaseConfig;

/// Connection details last provided by the database relation.
///
/// The record holds a complete [`DatabaseConfig`] or nothing. It is only
/// ever replaced or cleared as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionState {
    #[serde(default)]
    connection: Option<DatabaseConfig>,
}

impl ConnectionState {
    /// Create an empty state (no relation-provided connection).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a state populated from a leader's connection details.
    pub fn from_leader(leader: DatabaseConfig) -> Self {
        Self {
            connection: Some(leader),
        }
    }

    /// The stored connection details, if any.
    pub fn connection(&self) -> Option<&DatabaseConfig> {
        self.connection.as_ref()
    }

    /// Whether the relation is currently providing connection details.
    pub fn is_populated(&self) -> bool {
        self.connection.is_some()
    }

    /// Replace the stored connection details.
    pub fn set(&mut self, leader: DatabaseConfig) {
        self.connection = Some(leader);
    }

    /// Forget the stored connection details.
    pub fn clear(&mut self) {
        self.connection = None;
    }
}
