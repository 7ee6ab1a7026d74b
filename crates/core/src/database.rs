//! Resolved database connection details.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A set of database connection details.
///
/// Values arriving from a database relation are not validated on the way in;
/// check [`DatabaseConfig::is_complete`] before pointing a workload at them.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl DatabaseConfig {
    /// Create a new set of connection details.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Whether every field is usable: non-empty strings and a non-zero port.
    ///
    /// Uses the same rule as [`StaticConfig`](crate::StaticConfig) applies to
    /// its options.
    pub fn is_complete(&self) -> bool {
        !self.host.is_empty()
            && self.port != 0
            && !self.database.is_empty()
            && !self.username.is_empty()
            && !self.password.is_empty()
    }
}

// Keeps the password out of logs.
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
