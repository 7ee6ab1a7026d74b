//! Workload supervisor client trait and an in-memory implementation.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::layer::{Layer, Plan};

/// Client for the agent that runs the workload process.
#[async_trait]
pub trait WorkloadSupervisor: Send + Sync {
    /// Whether the supervisor can currently be reached. Never blocks on retries.
    async fn can_connect(&self) -> bool;

    /// The currently applied plan.
    async fn plan(&self) -> Result<Plan>;

    /// Add a layer under `label`, combining with an existing layer of that label if `combine`.
    async fn add_layer(&self, label: &str, layer: &Layer, combine: bool) -> Result<()>;

    /// Restart (or start) a service.
    async fn restart(&self, service: &str) -> Result<()>;
}

#[derive(Debug)]
struct SupervisorState {
    reachable: bool,
    failing: bool,
    layers: Vec<(String, Layer)>,
    running: BTreeSet<String>,
    restarts: Vec<String>,
}

/// In-memory supervisor following Pebble's layer semantics.
///
/// Records restarts so callers can observe whether a layer was re-applied.
#[derive(Debug)]
pub struct InMemorySupervisor {
    state: Mutex<SupervisorState>,
}

impl Default for InMemorySupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySupervisor {
    /// Create a reachable supervisor with an empty plan.
    pub fn new() -> Self {
        Self::with_reachable(true)
    }

    /// Create a supervisor that cannot be reached yet.
    pub fn unreachable() -> Self {
        Self::with_reachable(false)
    }

    fn with_reachable(reachable: bool) -> Self {
        Self {
            state: Mutex::new(SupervisorState {
                reachable,
                failing: false,
                layers: Vec::new(),
                running: BTreeSet::new(),
                restarts: Vec::new(),
            }),
        }
    }

    /// Make the supervisor reachable or unreachable.
    pub async fn set_reachable(&self, reachable: bool) {
        self.state.lock().await.reachable = reachable;
    }

    /// Make every operation after the reachability check fail.
    pub async fn set_failing(&self, failing: bool) {
        self.state.lock().await.failing = failing;
    }

    /// Number of times `service` has been restarted.
    pub async fn restart_count(&self, service: &str) -> usize {
        self.state
            .lock()
            .await
            .restarts
            .iter()
            .filter(|s| s.as_str() == service)
            .count()
    }

    /// Whether `service` is running.
    pub async fn is_running(&self, service: &str) -> bool {
        self.state.lock().await.running.contains(service)
    }

    /// Labels of the layers added so far, in order.
    pub async fn layer_labels(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .layers
            .iter()
            .map(|(label, _)| label.clone())
            .collect()
    }

    fn check(state: &SupervisorState, operation: &str) -> Result<()> {
        if !state.reachable {
            return Err(Error::supervisor(operation, "cannot connect to supervisor"));
        }
        if state.failing {
            return Err(Error::supervisor(operation, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl WorkloadSupervisor for InMemorySupervisor {
    async fn can_connect(&self) -> bool {
        self.state.lock().await.reachable
    }

    async fn plan(&self) -> Result<Plan> {
        let state = self.state.lock().await;
        Self::check(&state, "plan")?;
        Ok(Plan::from_layers(state.layers.iter().map(|(_, layer)| layer)))
    }

    async fn add_layer(&self, label: &str, layer: &Layer, combine: bool) -> Result<()> {
        let mut state = self.state.lock().await;
        Self::check(&state, "add_layer")?;

        let position = state.layers.iter().position(|(l, _)| l == label);
        match position.and_then(|index| state.layers.get_mut(index)) {
            Some((_, existing)) if combine => existing.combine(layer),
            Some(_) => {
                return Err(Error::supervisor(
                    "add_layer",
                    format!("layer '{label}' already exists"),
                ));
            }
            None => state.layers.push((label.to_string(), layer.clone())),
        }
        Ok(())
    }

    async fn restart(&self, service: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        Self::check(&state, "restart")?;

        let plan = Plan::from_layers(state.layers.iter().map(|(_, layer)| layer));
        if plan.service(service).is_none() {
            return Err(Error::supervisor(
                "restart",
                format!("service '{service}' is not in the plan"),
            ));
        }

        state.running.insert(service.to_string());
        state.restarts.push(service.to_string());
        Ok(())
    }
}
