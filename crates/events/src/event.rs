//! Lifecycle events delivered to the operator.

use serde::{Deserialize, Serialize};
use waltz_core::{DatabaseConfig, StaticConfig};

/// Notifications from the database relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RelationEvent {
    /// A database server joined the relation.
    Joined,
    /// The relation was removed.
    Broken,
    /// The database server reported a new leader (or none) for `database`.
    LeaderChanged {
        database: String,
        #[serde(default)]
        leader: Option<DatabaseConfig>,
    },
}

impl RelationEvent {
    /// Create a leader-changed event with an active leader.
    pub fn leader_changed(database: impl Into<String>, leader: DatabaseConfig) -> Self {
        Self::LeaderChanged {
            database: database.into(),
            leader: Some(leader),
        }
    }

    /// Create a leader-changed event reporting no active leader.
    pub fn leader_lost(database: impl Into<String>) -> Self {
        Self::LeaderChanged {
            database: database.into(),
            leader: None,
        }
    }

    /// Get the event type as a string.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Joined => "relation-joined",
            Self::Broken => "relation-broken",
            Self::LeaderChanged { .. } => "leader-changed",
        }
    }
}

/// Every trigger that starts a reconcile cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum LifecycleEvent {
    /// The workload container's supervisor became available.
    WorkloadReady,
    /// The user changed the static configuration.
    ConfigChanged { config: StaticConfig },
    /// Something happened on the database relation.
    Relation(RelationEvent),
}

impl LifecycleEvent {
    /// Create a config-changed event.
    pub fn config_changed(config: StaticConfig) -> Self {
        Self::ConfigChanged { config }
    }

    /// Get the event type as a string.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::WorkloadReady => "workload-ready",
            Self::ConfigChanged { .. } => "config-changed",
            Self::Relation(relation) => relation.event_type(),
        }
    }
}

impl From<RelationEvent> for LifecycleEvent {
    fn from(event: RelationEvent) -> Self {
        Self::Relation(event)
    }
}
