//! JSON-lines event logs for the `replay` command.
//!
//! Each non-blank line is one lifecycle event, for example
//! `{"event":"workload-ready"}`, or one of two supervisor pseudo-events,
//! `{"event":"supervisor-ready"}` and `{"event":"supervisor-unreachable"}`,
//! which flip the reachability of the in-memory supervisor. Lines starting
//! with `#` are comments.

use anyhow::{Context, Result};
use serde::Deserialize;
use waltz_core::StaticConfig;
use waltz_events::LifecycleEvent;

/// Supervisor reachability changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum SupervisorControl {
    SupervisorReady,
    SupervisorUnreachable,
}

/// One line of an event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayStep {
    Supervisor(SupervisorControl),
    Event(LifecycleEvent),
}

impl ReplayStep {
    /// Parse one line.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is neither a lifecycle event nor a
    /// supervisor pseudo-event.
    pub fn parse(line: &str) -> Result<Self> {
        if let Ok(control) = serde_json::from_str::<SupervisorControl>(line) {
            return Ok(Self::Supervisor(control));
        }
        let event = serde_json::from_str::<LifecycleEvent>(line)
            .with_context(|| format!("Invalid event: {line}"))?;
        Ok(Self::Event(event))
    }

    /// Short name used when printing progress.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Supervisor(SupervisorControl::SupervisorReady) => "supervisor-ready",
            Self::Supervisor(SupervisorControl::SupervisorUnreachable) => "supervisor-unreachable",
            Self::Event(event) => event.event_type(),
        }
    }
}

/// Apply the environment `overlay` to a replayed event.
///
/// A `config-changed` payload replaces the whole static configuration, so the
/// `WALTZ_DB_*` options are merged over it the same way they are merged over
/// the config file at startup. Other events pass through unchanged.
pub fn with_overlay(event: LifecycleEvent, overlay: &StaticConfig) -> LifecycleEvent {
    match event {
        LifecycleEvent::ConfigChanged { config } => {
            LifecycleEvent::config_changed(config.merge(overlay.clone()))
        }
        other => other,
    }
}

/// Parse a whole event log, skipping blank lines and comments.
///
/// # Errors
///
/// Returns an error naming the first line that fails to parse.
pub fn parse_log(content: &str) -> Result<Vec<ReplayStep>> {
    content
        .lines()
        .enumerate()
        .map(|(index, line)| (index, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(index, line)| {
            ReplayStep::parse(line).with_context(|| format!("line {}", index.saturating_add(1)))
        })
        .collect()
}
