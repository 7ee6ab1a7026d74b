//! Lifecycle events and persisted connection state for the Waltz operator.
//!
//! - **Events**: the triggers that start a reconcile cycle, including the
//!   database relation notifications
//! - **Connection state**: the database connection details last provided by
//!   the relation, replaced or cleared as a whole
//! - **State stores**: in-memory, tracing and durable JSON-file backends
//!
//! # Example
//!
//! ```ignore
//! use waltz_events::{ConnectionState, ConnectionStateStore, InMemoryStateStore};
//! use waltz_core::DatabaseConfig;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = InMemoryStateStore::new();
//!     let leader = DatabaseConfig::new("db1", 5432, "waltzdb", "waltz", "secret");
//!     store.save(&ConnectionState::from_leader(leader)).await.ok();
//!     assert!(store.load().await.map(|s| s.is_populated()).unwrap_or(false));
//! }
//! ```

pub mod durable_store;
pub mod error;
pub mod event;
pub mod state;
pub mod store;

// Re-export main types
pub use durable_store::JsonFileStateStore;
pub use error::{Error, Result};
pub use event::{LifecycleEvent, RelationEvent};
pub use state::ConnectionState;
pub use store::{ConnectionStateStore, InMemoryStateStore, TracingStateStore};
