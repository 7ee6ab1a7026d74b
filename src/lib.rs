//! # Waltz operator
//!
//! Command-line front end for the Waltz reconciler: renders the Pebble layer
//! for a configuration and replays lifecycle event logs.

pub mod cli;
pub mod commands;
pub mod replay;

pub use waltz_core;
pub use waltz_events;
pub use waltz_reconciler;
