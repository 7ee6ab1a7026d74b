//! Property-based tests for resolution, layer building and idempotence.
//!
//! Properties verified:
//! - Persisted relation data always wins over static configuration
//! - Static fallback resolves iff all five fields are set
//! - The layer environment always has exactly eight entries
//! - Reconciling twice without a state change restarts once

#![allow(clippy::unwrap_used, clippy::panic, clippy::indexing_slicing)]

use std::sync::Arc;

use proptest::prelude::*;
use waltz_core::{DatabaseConfig, StaticConfig};
use waltz_events::{ConnectionState, InMemoryStateStore};
use waltz_reconciler::{
    build_layer, resolve, InMemoryRelation, InMemorySupervisor, ReconcileOutcome, Reconciler,
    SERVICE_NAME,
};

/// Test helper: Unwrap a Result or panic with context
fn unwrap_result<T, E: std::fmt::Display>(result: std::result::Result<T, E>, context: &str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("{context}: {e}"),
    }
}

fn field() -> impl Strategy<Value = String> {
    "[a-z0-9.]{1,16}"
}

fn optional_field() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[a-z0-9.]{0,8}")
}

fn database_config() -> impl Strategy<Value = DatabaseConfig> {
    (field(), 1..=u16::MAX, field(), field(), field()).prop_map(
        |(host, port, database, username, password)| {
            DatabaseConfig::new(host, port, database, username, password)
        },
    )
}

fn static_config() -> impl Strategy<Value = StaticConfig> {
    (
        optional_field(),
        prop::option::of(any::<u16>()),
        optional_field(),
        optional_field(),
        optional_field(),
    )
        .prop_map(|(db_host, db_port, db_name, db_username, db_password)| StaticConfig {
            db_host,
            db_port,
            db_name,
            db_username,
            db_password,
        })
}

fn is_complete(config: &StaticConfig) -> bool {
    config.host().is_some()
        && config.port().is_some()
        && config.database().is_some()
        && config.username().is_some()
        && config.password().is_some()
}

// ==========================================================================
// PROPERTY: Precedence
// ==========================================================================

proptest! {
    /// Property: A populated persisted state resolves to itself, whatever
    /// the static configuration holds.
    #[test]
    fn prop_persisted_state_takes_precedence(
        leader in database_config(),
        config in static_config(),
    ) {
        let persisted = ConnectionState::from_leader(leader.clone());
        prop_assert_eq!(resolve(&persisted, &config), Some(leader));
    }
}

// ==========================================================================
// PROPERTY: Fallback completeness
// ==========================================================================

proptest! {
    /// Property: With no persisted state, resolution fails iff at least one
    /// static field is empty.
    #[test]
    fn prop_static_fallback_requires_all_fields(config in static_config()) {
        let resolved = resolve(&ConnectionState::empty(), &config);
        prop_assert_eq!(resolved.is_some(), is_complete(&config));

        if let Some(database) = resolved {
            prop_assert_eq!(Some(database.host.as_str()), config.host());
            prop_assert_eq!(Some(database.port), config.port());
            prop_assert_eq!(Some(database.database.as_str()), config.database());
            prop_assert_eq!(Some(database.username.as_str()), config.username());
            prop_assert_eq!(Some(database.password.as_str()), config.password());
        }
    }
}

// ==========================================================================
// PROPERTY: Environment mapping
// ==========================================================================

proptest! {
    /// Property: The built environment holds the five connection fields
    /// and three fixed entries, nothing else.
    #[test]
    fn prop_layer_environment_has_eight_entries(config in database_config()) {
        let layer = build_layer(&config);
        let service = layer.service(SERVICE_NAME);
        prop_assert!(service.is_some());
        let env = &service.unwrap().environment;

        prop_assert_eq!(env.len(), 8);
        prop_assert_eq!(&env["DB_HOST"], &config.host);
        prop_assert_eq!(&env["DB_PORT"], &config.port.to_string());
        prop_assert_eq!(&env["DB_NAME"], &config.database);
        prop_assert_eq!(&env["DB_USER"], &config.username);
        prop_assert_eq!(&env["DB_PASSWORD"], &config.password);
        prop_assert_eq!(env["DB_SCHEME"].as_str(), "waltz");
        prop_assert_eq!(env["WALTZ_FROM_EMAIL"].as_str(), "help@finos.org");
        prop_assert_eq!(
            env["CHANGELOG_FILE"].as_str(),
            "/opt/waltz/liquibase/db.changelog-master.xml"
        );
    }

    /// Property: Building twice from equal input yields equal layers.
    #[test]
    fn prop_layer_building_is_deterministic(config in database_config()) {
        prop_assert_eq!(build_layer(&config), build_layer(&config.clone()));
    }
}

// ==========================================================================
// PROPERTY: Idempotence
// ==========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: A second reconcile with nothing changed issues no restart.
    #[test]
    fn prop_reconcile_is_idempotent(database in database_config()) {
        let config = StaticConfig::new()
            .with_host(database.host.clone())
            .with_port(database.port)
            .with_database(database.database.clone())
            .with_username(database.username.clone())
            .with_password(database.password.clone());

        let rt = unwrap_result(
            tokio::runtime::Runtime::new(),
            "runtime creation should succeed",
        );

        let (first, second, restarts) = rt.block_on(async {
            let supervisor = Arc::new(InMemorySupervisor::new());
            let mut reconciler = unwrap_result(
                Reconciler::builder()
                    .with_config(config)
                    .with_store(InMemoryStateStore::new_arc())
                    .with_supervisor(supervisor.clone())
                    .with_relation(Arc::new(InMemoryRelation::new()))
                    .build(),
                "reconciler should build",
            );
            let first = unwrap_result(reconciler.reconcile().await, "first reconcile");
            let second = unwrap_result(reconciler.reconcile().await, "second reconcile");
            (first, second, supervisor.restart_count(SERVICE_NAME).await)
        });

        prop_assert_eq!(first, ReconcileOutcome::Applied { restarted: true });
        prop_assert_eq!(second, ReconcileOutcome::Applied { restarted: false });
        prop_assert_eq!(restarts, 1);
    }
}
