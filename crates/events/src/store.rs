//! Connection state store trait and implementations.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::state::ConnectionState;

/// Trait for persisted connection state backends.
///
/// Implementations must replace the stored record as a whole: a reader
/// never observes a mix of an old and a new record.
#[async_trait]
pub trait ConnectionStateStore: Send + Sync {
    /// Load the current state. A store that was never written yields the empty state.
    async fn load(&self) -> Result<ConnectionState>;

    /// Replace the stored state.
    async fn save(&self, state: &ConnectionState) -> Result<()>;

    /// Reset the stored state to empty.
    async fn clear(&self) -> Result<()> {
        self.save(&ConnectionState::empty()).await
    }
}

/// In-memory state store.
#[derive(Default)]
pub struct InMemoryStateStore {
    state: RwLock<ConnectionState>,
}

impl InMemoryStateStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new in-memory store wrapped in an Arc.
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl ConnectionStateStore for InMemoryStateStore {
    async fn load(&self) -> Result<ConnectionState> {
        Ok(self.state.read().await.clone())
    }

    async fn save(&self, state: &ConnectionState) -> Result<()> {
        *self.state.write().await = state.clone();
        Ok(())
    }
}

/// A wrapper that adds tracing to a state store.
pub struct TracingStateStore<S: ConnectionStateStore> {
    inner: S,
}

impl<S: ConnectionStateStore> TracingStateStore<S> {
    /// Create a new tracing state store.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Get the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: ConnectionStateStore> ConnectionStateStore for TracingStateStore<S> {
    async fn load(&self) -> Result<ConnectionState> {
        let result = self.inner.load().await;
        if let Ok(ref state) = result {
            tracing::trace!(populated = state.is_populated(), "Loaded connection state");
        }
        result
    }

    async fn save(&self, state: &ConnectionState) -> Result<()> {
        tracing::debug!(
            populated = state.is_populated(),
            host = state.connection().map(|c| c.host.as_str()),
            "Saving connection state"
        );
        self.inner.save(state).await
    }

    async fn clear(&self) -> Result<()> {
        tracing::debug!("Clearing connection state");
        self.inner.clear().await
    }
}
