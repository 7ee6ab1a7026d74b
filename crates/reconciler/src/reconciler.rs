//! Reconciler implementation.

use std::sync::Arc;

use tracing::{debug, info, warn};
use waltz_core::StaticConfig;
use waltz_events::{ConnectionStateStore, InMemoryStateStore, LifecycleEvent};

use crate::adapter::{AdapterDecision, DependencyAdapter};
use crate::error::{Error, Result};
use crate::layer::{build_layer, LAYER_LABEL, SERVICE_NAME};
use crate::relation::{ConnectionProbe, DatabaseRelation};
use crate::resolver::resolve;
use crate::supervisor::WorkloadSupervisor;
use crate::types::{
    ReconcileOutcome, UnitStatus, DATABASE_UNREACHABLE, WAITING_FOR_DATABASE, WAITING_FOR_PEBBLE,
};

/// Keeps the Waltz service in line with the resolved database configuration.
///
/// Takes `&mut self` for every event, so exactly one event is processed at
/// a time.
pub struct Reconciler {
    config: StaticConfig,
    store: Arc<dyn ConnectionStateStore>,
    supervisor: Arc<dyn WorkloadSupervisor>,
    adapter: DependencyAdapter,
    probe: Option<Arc<dyn ConnectionProbe>>,
    status: UnitStatus,
}

impl Reconciler {
    /// Create a new reconciler.
    pub fn new(
        config: StaticConfig,
        store: Arc<dyn ConnectionStateStore>,
        supervisor: Arc<dyn WorkloadSupervisor>,
        relation: Arc<dyn DatabaseRelation>,
    ) -> Self {
        Self {
            config,
            adapter: DependencyAdapter::new(store.clone(), relation),
            store,
            supervisor,
            probe: None,
            status: UnitStatus::Unknown,
        }
    }

    /// Create a builder.
    pub fn builder() -> ReconcilerBuilder {
        ReconcilerBuilder::new()
    }

    /// Handle one lifecycle event to completion.
    ///
    /// # Errors
    ///
    /// Returns an error only for unexpected collaborator failures (state
    /// store, relation, or supervisor operations after a successful
    /// reachability check). These are not retried.
    pub async fn handle(&mut self, event: LifecycleEvent) -> Result<ReconcileOutcome> {
        debug!(event = event.event_type(), "Handling event");

        match event {
            LifecycleEvent::WorkloadReady => self.reconcile().await,
            LifecycleEvent::ConfigChanged { config } => {
                self.config = config;
                self.reconcile().await
            }
            LifecycleEvent::Relation(relation_event) => {
                let decision = self
                    .adapter
                    .handle(&relation_event, self.config.database())
                    .await?;
                match decision {
                    AdapterDecision::Reconcile => self.reconcile().await,
                    AdapterDecision::Ignore => Ok(ReconcileOutcome::Ignored),
                }
            }
        }
    }

    /// Run one reconcile cycle: resolve, build, diff, apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the state store or a supervisor operation fails.
    pub async fn reconcile(&mut self) -> Result<ReconcileOutcome> {
        let persisted = self.store.load().await?;

        let Some(database) = resolve(&persisted, &self.config) else {
            self.set_status(UnitStatus::blocked(WAITING_FOR_DATABASE));
            return Ok(ReconcileOutcome::Blocked);
        };

        if !self.supervisor.can_connect().await {
            self.set_status(UnitStatus::waiting(WAITING_FOR_PEBBLE));
            return Ok(ReconcileOutcome::Deferred);
        }

        if let Some(probe) = &self.probe {
            if let Err(e) = probe.check(&database).await {
                warn!(error = %e, "Database connection check failed");
                self.set_status(UnitStatus::blocked(DATABASE_UNREACHABLE));
                return Ok(ReconcileOutcome::Blocked);
            }
        }

        let layer = build_layer(&database);
        let plan = self.supervisor.plan().await?;

        let restarted = plan.service(SERVICE_NAME) != layer.service(SERVICE_NAME);
        if restarted {
            info!(
                service = SERVICE_NAME,
                host = %database.host,
                "Waltz needs to be updated. Restarting."
            );
            self.supervisor.add_layer(LAYER_LABEL, &layer, true).await?;
            self.supervisor.restart(SERVICE_NAME).await?;
        } else {
            debug!(service = SERVICE_NAME, "Plan is up to date");
        }

        self.set_status(UnitStatus::Active);
        Ok(ReconcileOutcome::Applied { restarted })
    }

    fn set_status(&mut self, status: UnitStatus) {
        if self.status != status {
            info!(status = %status, "Unit status changed");
        }
        self.status = status;
    }

    /// Current unit status.
    pub fn status(&self) -> &UnitStatus {
        &self.status
    }

    /// Current static configuration.
    pub fn config(&self) -> &StaticConfig {
        &self.config
    }
}

/// Builder for Reconciler.
pub struct ReconcilerBuilder {
    config: StaticConfig,
    store: Option<Arc<dyn ConnectionStateStore>>,
    supervisor: Option<Arc<dyn WorkloadSupervisor>>,
    relation: Option<Arc<dyn DatabaseRelation>>,
    probe: Option<Arc<dyn ConnectionProbe>>,
}

impl ReconcilerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: StaticConfig::default(),
            store: None,
            supervisor: None,
            relation: None,
            probe: None,
        }
    }

    /// Set the initial static configuration.
    #[must_use]
    pub fn with_config(mut self, config: StaticConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the connection state store. Defaults to an in-memory store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ConnectionStateStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the workload supervisor.
    #[must_use]
    pub fn with_supervisor(mut self, supervisor: Arc<dyn WorkloadSupervisor>) -> Self {
        self.supervisor = Some(supervisor);
        self
    }

    /// Set the database relation client.
    #[must_use]
    pub fn with_relation(mut self, relation: Arc<dyn DatabaseRelation>) -> Self {
        self.relation = Some(relation);
        self
    }

    /// Check database connectivity before applying the layer.
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn ConnectionProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Build the reconciler.
    ///
    /// # Errors
    ///
    /// Returns an error if the supervisor or relation client is missing.
    pub fn build(self) -> Result<Reconciler> {
        let supervisor = self
            .supervisor
            .ok_or_else(|| Error::invalid_config("workload supervisor is required"))?;
        let relation = self
            .relation
            .ok_or_else(|| Error::invalid_config("database relation is required"))?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryStateStore::new()));

        let mut reconciler = Reconciler::new(self.config, store, supervisor, relation);
        reconciler.probe = self.probe;
        Ok(reconciler)
    }
}

impl Default for ReconcilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
