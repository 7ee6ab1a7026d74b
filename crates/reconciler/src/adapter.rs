//! Translates database relation events into connection state updates.

use std::sync::Arc;

use tracing::{debug, info, warn};
use waltz_core::DatabaseConfig;
use waltz_events::{ConnectionState, ConnectionStateStore, RelationEvent};

use crate::error::Result;
use crate::relation::DatabaseRelation;

/// What the reconciler should do after a relation event was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterDecision {
    /// Run a reconcile cycle.
    Reconcile,
    /// The event was not for this unit's database; do nothing.
    Ignore,
}

/// Owns every mutation of the persisted [`ConnectionState`].
pub struct DependencyAdapter {
    store: Arc<dyn ConnectionStateStore>,
    relation: Arc<dyn DatabaseRelation>,
}

impl DependencyAdapter {
    /// Create a new adapter.
    pub fn new(store: Arc<dyn ConnectionStateStore>, relation: Arc<dyn DatabaseRelation>) -> Self {
        Self { store, relation }
    }

    /// Apply a relation event. `desired_database` is the configured `db-name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the state store or the relation request fails.
    pub async fn handle(
        &self,
        event: &RelationEvent,
        desired_database: Option<&str>,
    ) -> Result<AdapterDecision> {
        match event {
            RelationEvent::Joined => self.on_joined(desired_database).await,
            RelationEvent::Broken => self.on_broken().await,
            RelationEvent::LeaderChanged { database, leader } => {
                self.on_leader_changed(database, leader.as_ref(), desired_database)
                    .await
            }
        }
    }

    async fn on_joined(&self, desired_database: Option<&str>) -> Result<AdapterDecision> {
        match desired_database {
            Some(database) => {
                info!(database, "Requesting database from relation");
                self.relation.request_database(database).await?;
            }
            None => warn!("Database relation joined but db-name is not configured"),
        }
        Ok(AdapterDecision::Reconcile)
    }

    async fn on_broken(&self) -> Result<AdapterDecision> {
        info!("Database relation broken, clearing connection details");
        self.store.clear().await?;
        Ok(AdapterDecision::Reconcile)
    }

    async fn on_leader_changed(
        &self,
        database: &str,
        leader: Option<&DatabaseConfig>,
        desired_database: Option<&str>,
    ) -> Result<AdapterDecision> {
        if desired_database != Some(database) {
            debug!(
                reported = database,
                desired = desired_database,
                "Ignoring leader change for another database"
            );
            return Ok(AdapterDecision::Ignore);
        }

        match leader {
            Some(leader) if !leader.is_complete() => {
                warn!(
                    host = %leader.host,
                    port = leader.port,
                    "Leader reported incomplete connection details, clearing connection details"
                );
                self.store.clear().await?;
            }
            Some(leader) => {
                info!(host = %leader.host, port = leader.port, "Database leader changed");
                self.store
                    .save(&ConnectionState::from_leader(leader.clone()))
                    .await?;
            }
            None => {
                info!("Database has no active leader, clearing connection details");
                self.store.clear().await?;
            }
        }
        Ok(AdapterDecision::Reconcile)
    }
}
