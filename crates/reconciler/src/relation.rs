//! Request side of the database relation, and database connection probes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use waltz_core::DatabaseConfig;

use crate::error::{Error, Result};

/// Client for the database relation.
#[async_trait]
pub trait DatabaseRelation: Send + Sync {
    /// Ask the related database server to provision `database`.
    async fn request_database(&self, database: &str) -> Result<()>;
}

/// In-memory relation that records provisioning requests.
#[derive(Debug, Default)]
pub struct InMemoryRelation {
    requests: RwLock<Vec<String>>,
    failing: AtomicBool,
}

impl InMemoryRelation {
    /// Create a new relation with no requests.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later request fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Databases requested so far, in order.
    pub async fn requests(&self) -> Vec<String> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl DatabaseRelation for InMemoryRelation {
    async fn request_database(&self, database: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::relation(database, "relation is not available"));
        }
        self.requests.write().await.push(database.to_string());
        Ok(())
    }
}

/// Checks that a database accepts connections before the workload is pointed at it.
#[async_trait]
pub trait ConnectionProbe: Send + Sync {
    /// Try to connect with `config`.
    async fn check(&self, config: &DatabaseConfig) -> Result<()>;
}

/// Probe that only checks the database host accepts TCP connections.
#[derive(Debug, Clone)]
pub struct TcpConnectionProbe {
    timeout: Duration,
}

impl TcpConnectionProbe {
    /// Create a probe that gives up after `timeout`.
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TcpConnectionProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl ConnectionProbe for TcpConnectionProbe {
    async fn check(&self, config: &DatabaseConfig) -> Result<()> {
        let address = (config.host.as_str(), config.port);
        match tokio::time::timeout(self.timeout, TcpStream::connect(address)).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(Error::probe(format!(
                "{}:{}: {e}",
                config.host, config.port
            ))),
            Err(_) => Err(Error::probe(format!(
                "{}:{}: timed out after {:?}",
                config.host, config.port, self.timeout
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_requests_are_recorded() {
        let relation = InMemoryRelation::new();
        relation.request_database("waltzdb").await.unwrap();
        relation.request_database("other").await.unwrap();

        assert_eq!(relation.requests().await, vec!["waltzdb", "other"]);
    }

    #[tokio::test]
    async fn test_failing_relation_rejects_requests() {
        let relation = InMemoryRelation::new();
        relation.set_failing(true);

        let result = relation.request_database("waltzdb").await;
        assert!(matches!(result, Err(Error::Relation { ref database, .. }) if database == "waltzdb"));
        assert!(relation.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_tcp_probe_reaches_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let probe = TcpConnectionProbe::new(Duration::from_secs(2));
        let config = DatabaseConfig::new("127.0.0.1", port, "waltzdb", "u", "p");
        assert!(probe.check(&config).await.is_ok());
    }

    #[tokio::test]
    async fn test_tcp_probe_reports_refused() {
        let port = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let probe = TcpConnectionProbe::new(Duration::from_secs(2));
        let config = DatabaseConfig::new("127.0.0.1", port, "waltzdb", "u", "p");
        assert!(matches!(probe.check(&config).await, Err(Error::Probe { .. })));
    }
}
