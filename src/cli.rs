//! CLI command definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Waltz operator
#[derive(Parser, Debug)]
#[command(name = "waltz-operator")]
#[command(version)]
#[command(about = "Keeps a Waltz workload in sync with its database configuration")]
#[command(
    long_about = "Resolves the database connection for a Waltz workload from relation data or \
static configuration, renders the Pebble layer that runs Waltz against it, and replays \
lifecycle events through the reconciler."
)]
pub struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the Pebble layer the configuration would produce
    Render {
        /// Static configuration file (.yaml, .json or .toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Persisted connection state file; relation data wins over static config
        #[arg(short, long)]
        state: Option<PathBuf>,
    },

    /// Feed a JSON-lines event log through the reconciler
    Replay {
        /// Static configuration file (.yaml, .json or .toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Event log, one JSON event per line
        #[arg(short, long)]
        events: PathBuf,

        /// Persisted connection state file (in-memory if omitted)
        #[arg(short, long)]
        state: Option<PathBuf>,

        /// Start with the supervisor already reachable
        #[arg(long, default_value_t = false)]
        supervisor_ready: bool,
    },
}
