//! Reconciliation engine for the Waltz workload.
//!
//! Every lifecycle event runs the same cycle:
//!
//! 1. **Resolve**: relation-provided connection details, else the static
//!    `db-*` options, else nothing ([`resolve`])
//! 2. **Build**: the Pebble layer that runs Waltz against them ([`build_layer`])
//! 3. **Diff**: compare the `waltz` service against the supervisor's plan
//! 4. **Apply**: add the layer and restart, only if it differs
//!
//! Anticipated problems never surface as errors. Missing configuration ends
//! the cycle [`ReconcileOutcome::Blocked`]; an unreachable supervisor ends it
//! [`ReconcileOutcome::Deferred`], and the host is expected to redeliver the
//! event ([`EventLoop`] does this).
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use waltz_core::StaticConfig;
//! use waltz_events::LifecycleEvent;
//! use waltz_reconciler::{InMemoryRelation, InMemorySupervisor, Reconciler};
//!
//! #[tokio::main]
//! async fn main() -> waltz_reconciler::Result<()> {
//!     let mut reconciler = Reconciler::builder()
//!         .with_config(StaticConfig::new().with_database("waltzdb"))
//!         .with_supervisor(Arc::new(InMemorySupervisor::new()))
//!         .with_relation(Arc::new(InMemoryRelation::new()))
//!         .build()?;
//!
//!     let outcome = reconciler.handle(LifecycleEvent::WorkloadReady).await?;
//!     println!("{outcome:?}: {}", reconciler.status());
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod error;
pub mod layer;
pub mod r#loop;
pub mod reconciler;
pub mod relation;
pub mod resolver;
pub mod supervisor;
pub mod types;

// Re-export main types
pub use adapter::{AdapterDecision, DependencyAdapter};
pub use error::{Error, Result};
pub use layer::{
    build_layer, Layer, Override, Plan, ServiceSpec, Startup, LAYER_LABEL, SERVICE_NAME,
};
pub use r#loop::{EventLoop, EventSender, LoopConfig, LoopStopper};
pub use reconciler::{Reconciler, ReconcilerBuilder};
pub use relation::{ConnectionProbe, DatabaseRelation, InMemoryRelation, TcpConnectionProbe};
pub use resolver::resolve;
pub use supervisor::{InMemorySupervisor, WorkloadSupervisor};
pub use types::{
    ReconcileOutcome, UnitStatus, DATABASE_UNREACHABLE, WAITING_FOR_DATABASE, WAITING_FOR_PEBBLE,
};
