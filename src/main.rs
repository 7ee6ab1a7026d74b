//! # Waltz operator entry point
//!
//! Parses the command line, installs the tracing subscriber and dispatches
//! to the command handlers. Logs go to stderr so stdout carries only
//! command output.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use waltz_operator::cli::Cli;
use waltz_operator::commands::execute_command;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let mut stdout = std::io::stdout().lock();
    execute_command(cli.command, &mut stdout).await
}

/// Initialize tracing subscriber with environment filter.
///
/// `RUST_LOG` wins; otherwise `--verbose` selects debug and the default is info.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
