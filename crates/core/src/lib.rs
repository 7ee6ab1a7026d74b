//! Core types, errors, and configuration for the Waltz operator.
//!
//! - [`StaticConfig`]: the user-supplied `db-*` configuration options
//! - [`DatabaseConfig`]: a fully resolved set of database connection details
//! - [`Error`] / [`Result`]: file and parse failures shared by the workspace

pub mod config;
pub mod database;
pub mod error;

pub use config::StaticConfig;
pub use database::DatabaseConfig;
pub use error::{Error, Result};
