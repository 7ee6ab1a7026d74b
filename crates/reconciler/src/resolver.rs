//! Effective database configuration.

use waltz_core::{DatabaseConfig, StaticConfig};
use waltz_events::ConnectionState;

/// Merge the relation-provided connection and the static configuration.
///
/// A fully populated `persisted` state always wins. Otherwise every static
/// option must be set; if any is missing the result is `None`.
pub fn resolve(persisted: &ConnectionState, config: &StaticConfig) -> Option<DatabaseConfig> {
    if let Some(connection) = persisted.connection().filter(|c| c.is_complete()) {
        return Some(connection.clone());
    }

    Some(DatabaseConfig::new(
        config.host()?,
        config.port()?,
        config.database()?,
        config.username()?,
        config.password()?,
    ))
}
