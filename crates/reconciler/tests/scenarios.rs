//! End-to-end reconcile scenarios against the in-memory supervisor.
//!
//! Each test drives a `Reconciler` through the same lifecycle events the
//! hosting runtime would deliver and checks the unit status, the applied
//! plan and the number of restarts.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::BTreeMap;
use std::sync::Arc;

use waltz_core::{DatabaseConfig, StaticConfig};
use waltz_events::{ConnectionState, ConnectionStateStore, InMemoryStateStore, LifecycleEvent, RelationEvent};
use waltz_reconciler::{
    InMemoryRelation, InMemorySupervisor, Override, ReconcileOutcome, Reconciler, Startup,
    UnitStatus, WorkloadSupervisor, SERVICE_NAME, WAITING_FOR_DATABASE, WAITING_FOR_PEBBLE,
};

struct Unit {
    reconciler: Reconciler,
    supervisor: Arc<InMemorySupervisor>,
    relation: Arc<InMemoryRelation>,
    store: Arc<InMemoryStateStore>,
}

impl Unit {
    fn new(config: StaticConfig, supervisor: InMemorySupervisor) -> Self {
        let supervisor = Arc::new(supervisor);
        let relation = Arc::new(InMemoryRelation::new());
        let store = InMemoryStateStore::new_arc();
        let reconciler = Reconciler::builder()
            .with_config(config)
            .with_store(store.clone())
            .with_supervisor(supervisor.clone())
            .with_relation(relation.clone())
            .build()
            .unwrap();
        Self {
            reconciler,
            supervisor,
            relation,
            store,
        }
    }

    async fn deliver(&mut self, event: impl Into<LifecycleEvent>) -> ReconcileOutcome {
        self.reconciler.handle(event.into()).await.unwrap()
    }

    async fn environment(&self) -> BTreeMap<String, String> {
        let plan = self.supervisor.plan().await.unwrap();
        plan.service(SERVICE_NAME).unwrap().environment.clone()
    }
}

fn static_config() -> StaticConfig {
    StaticConfig::new()
        .with_host("foo.lish")
        .with_port(5432)
        .with_database("waltzdb")
        .with_username("u")
        .with_password("p")
}

fn leader() -> DatabaseConfig {
    DatabaseConfig::new("db1", 5432, "waltzdb", "u2", "p2")
}

#[tokio::test]
async fn no_configuration_blocks_without_touching_plan() {
    let mut unit = Unit::new(StaticConfig::new(), InMemorySupervisor::new());

    let outcome = unit.deliver(LifecycleEvent::WorkloadReady).await;

    assert_eq!(outcome, ReconcileOutcome::Blocked);
    assert_eq!(unit.reconciler.status(), &UnitStatus::blocked(WAITING_FOR_DATABASE));
    assert!(unit.supervisor.layer_labels().await.is_empty());
    assert_eq!(unit.supervisor.restart_count(SERVICE_NAME).await, 0);
}

#[tokio::test]
async fn unreachable_supervisor_defers_event() {
    let mut unit = Unit::new(static_config(), InMemorySupervisor::unreachable());

    let outcome = unit.deliver(LifecycleEvent::WorkloadReady).await;

    assert_eq!(outcome, ReconcileOutcome::Deferred);
    assert!(outcome.needs_redelivery());
    assert_eq!(unit.reconciler.status(), &UnitStatus::waiting(WAITING_FOR_PEBBLE));
    assert!(unit.supervisor.layer_labels().await.is_empty());
}

#[tokio::test]
async fn reachable_supervisor_applies_layer_and_restarts_once() {
    let mut unit = Unit::new(static_config(), InMemorySupervisor::unreachable());
    unit.deliver(LifecycleEvent::WorkloadReady).await;

    unit.supervisor.set_reachable(true).await;
    let outcome = unit.deliver(LifecycleEvent::WorkloadReady).await;

    assert_eq!(outcome, ReconcileOutcome::Applied { restarted: true });
    assert_eq!(unit.reconciler.status(), &UnitStatus::Active);
    assert!(unit.supervisor.is_running(SERVICE_NAME).await);
    assert_eq!(unit.supervisor.restart_count(SERVICE_NAME).await, 1);

    let plan = unit.supervisor.plan().await.unwrap();
    let service = plan.service(SERVICE_NAME).unwrap();
    assert_eq!(service.override_, Override::Replace);
    assert_eq!(service.summary.as_deref(), Some("waltz"));
    assert_eq!(service.startup, Some(Startup::Enabled));
    assert_eq!(service.user.as_deref(), Some("waltz"));

    let expected: BTreeMap<String, String> = [
        ("DB_HOST", "foo.lish"),
        ("DB_PORT", "5432"),
        ("DB_NAME", "waltzdb"),
        ("DB_USER", "u"),
        ("DB_PASSWORD", "p"),
        ("DB_SCHEME", "waltz"),
        ("WALTZ_FROM_EMAIL", "help@finos.org"),
        ("CHANGELOG_FILE", "/opt/waltz/liquibase/db.changelog-master.xml"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    assert_eq!(service.environment, expected);
}

#[tokio::test]
async fn leader_credentials_override_static_config() {
    let mut unit = Unit::new(static_config(), InMemorySupervisor::new());
    unit.deliver(LifecycleEvent::WorkloadReady).await;

    let outcome = unit
        .deliver(RelationEvent::leader_changed("waltzdb", leader()))
        .await;

    assert_eq!(outcome, ReconcileOutcome::Applied { restarted: true });
    assert_eq!(unit.store.load().await.unwrap(), ConnectionState::from_leader(leader()));

    let env = unit.environment().await;
    assert_eq!(env["DB_HOST"], "db1");
    assert_eq!(env["DB_USER"], "u2");
    assert_eq!(env["DB_PASSWORD"], "p2");
    assert_eq!(unit.supervisor.restart_count(SERVICE_NAME).await, 2);
}

#[tokio::test]
async fn relation_broken_falls_back_to_static_config() {
    let mut unit = Unit::new(static_config(), InMemorySupervisor::new());
    unit.deliver(RelationEvent::leader_changed("waltzdb", leader())).await;
    assert_eq!(unit.environment().await["DB_HOST"], "db1");

    let outcome = unit.deliver(RelationEvent::Broken).await;

    assert_eq!(outcome, ReconcileOutcome::Applied { restarted: true });
    assert!(!unit.store.load().await.unwrap().is_populated());
    assert_eq!(unit.environment().await["DB_HOST"], "foo.lish");
}

#[tokio::test]
async fn relation_broken_blocks_when_static_config_incomplete() {
    let mut unit = Unit::new(StaticConfig::new().with_database("waltzdb"), InMemorySupervisor::new());
    unit.deliver(RelationEvent::leader_changed("waltzdb", leader())).await;
    assert_eq!(unit.reconciler.status(), &UnitStatus::Active);

    let outcome = unit.deliver(RelationEvent::Broken).await;

    assert_eq!(outcome, ReconcileOutcome::Blocked);
    assert_eq!(unit.reconciler.status(), &UnitStatus::blocked(WAITING_FOR_DATABASE));
    // The previously applied layer stays in place.
    assert_eq!(unit.environment().await["DB_HOST"], "db1");
}

#[tokio::test]
async fn leader_lost_clears_connection_state() {
    let mut unit = Unit::new(StaticConfig::new().with_database("waltzdb"), InMemorySupervisor::new());
    unit.deliver(RelationEvent::leader_changed("waltzdb", leader())).await;

    let outcome = unit.deliver(RelationEvent::leader_lost("waltzdb")).await;

    assert_eq!(outcome, ReconcileOutcome::Blocked);
    assert_eq!(unit.store.load().await.unwrap(), ConnectionState::empty());
}

#[tokio::test]
async fn incomplete_leader_does_not_override_static_config() {
    let mut unit = Unit::new(static_config(), InMemorySupervisor::new());
    unit.deliver(LifecycleEvent::WorkloadReady).await;

    let outcome = unit
        .deliver(RelationEvent::leader_changed(
            "waltzdb",
            DatabaseConfig::new("", 0, "", "", ""),
        ))
        .await;

    assert_eq!(outcome, ReconcileOutcome::Applied { restarted: false });
    assert_eq!(unit.store.load().await.unwrap(), ConnectionState::empty());
    let env = unit.environment().await;
    assert_eq!(env["DB_HOST"], "foo.lish");
    assert_eq!(env["DB_PORT"], "5432");
    assert_eq!(unit.supervisor.restart_count(SERVICE_NAME).await, 1);
}

#[tokio::test]
async fn repeated_reconcile_does_not_restart() {
    let mut unit = Unit::new(static_config(), InMemorySupervisor::new());

    let first = unit.deliver(LifecycleEvent::WorkloadReady).await;
    let second = unit.deliver(LifecycleEvent::WorkloadReady).await;
    let third = unit
        .deliver(LifecycleEvent::config_changed(static_config()))
        .await;

    assert_eq!(first, ReconcileOutcome::Applied { restarted: true });
    assert_eq!(second, ReconcileOutcome::Applied { restarted: false });
    assert_eq!(third, ReconcileOutcome::Applied { restarted: false });
    assert_eq!(unit.supervisor.restart_count(SERVICE_NAME).await, 1);
}

#[tokio::test]
async fn joined_requests_database_and_reconciles() {
    let mut unit = Unit::new(static_config(), InMemorySupervisor::new());

    let outcome = unit.deliver(RelationEvent::Joined).await;

    assert_eq!(unit.relation.requests().await, vec!["waltzdb"]);
    assert_eq!(outcome, ReconcileOutcome::Applied { restarted: true });
}

#[tokio::test]
async fn mismatched_leader_change_is_ignored() {
    let mut unit = Unit::new(static_config(), InMemorySupervisor::new());
    unit.deliver(LifecycleEvent::WorkloadReady).await;

    let outcome = unit
        .deliver(RelationEvent::leader_changed("someone-else", leader()))
        .await;

    assert_eq!(outcome, ReconcileOutcome::Ignored);
    assert_eq!(unit.environment().await["DB_HOST"], "foo.lish");
    assert_eq!(unit.supervisor.restart_count(SERVICE_NAME).await, 1);
}
