//! CLI command handlers.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};
use waltz_core::StaticConfig;
use waltz_events::{
    ConnectionStateStore, InMemoryStateStore, JsonFileStateStore, TracingStateStore,
};
use waltz_reconciler::{
    build_layer, resolve, EventLoop, InMemoryRelation, InMemorySupervisor, LoopConfig, Reconciler,
    UnitStatus, WAITING_FOR_DATABASE,
};

use crate::cli::Commands;
use crate::replay::{parse_log, with_overlay, ReplayStep, SupervisorControl};

/// Execute a CLI command, writing results to `out`.
///
/// # Errors
///
/// Returns an error if configuration or event files cannot be loaded, or if
/// the reconciler hits an unexpected collaborator failure.
pub async fn execute_command(command: Commands, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::Render { config, state } => {
            cmd_render(config.as_deref(), state.as_deref(), out).await
        }
        Commands::Replay {
            config,
            events,
            state,
            supervisor_ready,
        } => cmd_replay(config.as_deref(), &events, state.as_deref(), supervisor_ready, out).await,
    }
}

/// Options set through `WALTZ_DB_*` environment variables.
fn env_overlay() -> Result<StaticConfig> {
    StaticConfig::from_env().context("Invalid WALTZ_DB_* environment")
}

/// Load the static configuration: the file (if any) overlaid with `overlay`.
fn load_config(path: Option<&Path>, overlay: &StaticConfig) -> Result<StaticConfig> {
    let from_file = match path {
        Some(path) => StaticConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => StaticConfig::default(),
    };
    Ok(from_file.merge(overlay.clone()))
}

fn open_store(path: Option<&Path>) -> Arc<dyn ConnectionStateStore> {
    match path {
        Some(path) => Arc::new(TracingStateStore::new(JsonFileStateStore::new(path))),
        None => Arc::new(TracingStateStore::new(InMemoryStateStore::new())),
    }
}

/// Print the Pebble layer for the resolved configuration.
async fn cmd_render(
    config: Option<&Path>,
    state: Option<&Path>,
    out: &mut impl Write,
) -> Result<()> {
    let config = load_config(config, &env_overlay()?)?;
    let persisted = open_store(state)
        .load()
        .await
        .context("Failed to load connection state")?;

    let Some(database) = resolve(&persisted, &config) else {
        bail!("{}", UnitStatus::blocked(WAITING_FOR_DATABASE));
    };

    debug!(host = %database.host, port = database.port, "Resolved database");
    let yaml = build_layer(&database)
        .to_yaml()
        .context("Failed to render layer")?;
    out.write_all(yaml.as_bytes())?;
    Ok(())
}

/// Replay an event log through the reconciler, printing the unit status
/// after every step.
async fn cmd_replay(
    config: Option<&Path>,
    events: &Path,
    state: Option<&Path>,
    supervisor_ready: bool,
    out: &mut impl Write,
) -> Result<()> {
    let overlay = env_overlay()?;
    let config = load_config(config, &overlay)?;
    let content = tokio::fs::read_to_string(events)
        .await
        .with_context(|| format!("Failed to read events from {}", events.display()))?;
    let steps = parse_log(&content)
        .with_context(|| format!("Failed to parse {}", events.display()))?;

    let supervisor = Arc::new(if supervisor_ready {
        InMemorySupervisor::new()
    } else {
        InMemorySupervisor::unreachable()
    });
    let reconciler = Reconciler::builder()
        .with_config(config)
        .with_store(open_store(state))
        .with_supervisor(supervisor.clone())
        .with_relation(Arc::new(InMemoryRelation::new()))
        .build()?;

    let loop_config = LoopConfig {
        stop_on_error: true,
        ..LoopConfig::default()
    };
    let (mut event_loop, _sender) = EventLoop::new(reconciler, loop_config)?;

    info!(steps = steps.len(), "Replaying events");
    for (index, step) in steps.iter().enumerate() {
        match step {
            ReplayStep::Supervisor(SupervisorControl::SupervisorReady) => {
                supervisor.set_reachable(true).await;
                event_loop.redeliver().await?;
            }
            ReplayStep::Supervisor(SupervisorControl::SupervisorUnreachable) => {
                supervisor.set_reachable(false).await;
            }
            ReplayStep::Event(event) => {
                event_loop.accept(with_overlay(event.clone(), &overlay)).await?;
            }
        }

        writeln!(
            out,
            "{:>3} {:<24} {} (pending: {})",
            index.saturating_add(1),
            step.name(),
            event_loop.reconciler().status(),
            event_loop.pending()
        )?;
    }

    Ok(())
}
