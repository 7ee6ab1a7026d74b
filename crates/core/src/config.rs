//! Static operator configuration.
//!
//! These are the `db-*` options a user sets on the deployed unit. They are
//! the fallback source of database connection details when no database
//! relation is providing them.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variables read by [`StaticConfig::from_env`].
pub const ENV_DB_HOST: &str = "WALTZ_DB_HOST";
pub const ENV_DB_PORT: &str = "WALTZ_DB_PORT";
pub const ENV_DB_NAME: &str = "WALTZ_DB_NAME";
pub const ENV_DB_USERNAME: &str = "WALTZ_DB_USERNAME";
pub const ENV_DB_PASSWORD: &str = "WALTZ_DB_PASSWORD";

/// User-supplied configuration options.
///
/// Every option is optional. An empty string, or a port of `0`, is treated
/// exactly like an option that was never set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StaticConfig {
    #[serde(default)]
    pub db_host: Option<String>,

    #[serde(default)]
    pub db_port: Option<u16>,

    #[serde(default)]
    pub db_name: Option<String>,

    #[serde(default)]
    pub db_username: Option<String>,

    #[serde(default)]
    pub db_password: Option<String>,
}

impl StaticConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the database host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.db_host = Some(host.into());
        self
    }

    /// Set the database port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.db_port = Some(port);
        self
    }

    /// Set the database name.
    #[must_use]
    pub fn with_database(mut self, name: impl Into<String>) -> Self {
        self.db_name = Some(name.into());
        self
    }

    /// Set the database username.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.db_username = Some(username.into());
        self
    }

    /// Set the database password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.db_password = Some(password.into());
        self
    }

    /// The configured host, if set and non-empty.
    pub fn host(&self) -> Option<&str> {
        non_empty(self.db_host.as_deref())
    }

    /// The configured port, if set and non-zero.
    pub fn port(&self) -> Option<u16> {
        self.db_port.filter(|port| *port != 0)
    }

    /// The configured database name, if set and non-empty.
    ///
    /// This is also the database requested from a related database server.
    pub fn database(&self) -> Option<&str> {
        non_empty(self.db_name.as_deref())
    }

    /// The configured username, if set and non-empty.
    pub fn username(&self) -> Option<&str> {
        non_empty(self.db_username.as_deref())
    }

    /// The configured password, if set and non-empty.
    pub fn password(&self) -> Option<&str> {
        non_empty(self.db_password.as_deref())
    }

    /// Overlay every option that is set in `other` onto `self`.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            db_host: other.db_host.or(self.db_host),
            db_port: other.db_port.or(self.db_port),
            db_name: other.db_name.or(self.db_name),
            db_username: other.db_username.or(self.db_username),
            db_password: other.db_password.or(self.db_password),
        }
    }

    /// Load configuration from a file.
    ///
    /// The format is chosen by extension: `.json` and `.toml` are parsed as
    /// such, anything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::file_read_failed(path, e.to_string()))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| Error::json_parse_failed(e.to_string())),
            Some("toml") => {
                toml::from_str(&content).map_err(|e| Error::toml_parse_failed(e.to_string()))
            }
            _ => Self::from_yaml_str(&content),
        }
    }

    /// Parse configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid YAML for this structure.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        // An empty document deserializes as null.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| Error::yaml_parse_failed(e.to_string()))
    }

    /// Load configuration from `WALTZ_DB_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `WALTZ_DB_PORT` is set but is not a valid port.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the port variable is set but is not a valid port.
    pub fn from_env_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_port = lookup(ENV_DB_PORT)
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| {
                raw.trim()
                    .parse::<u16>()
                    .map_err(|e| Error::invalid_config(ENV_DB_PORT, e.to_string()))
            })
            .transpose()?;

        Ok(Self {
            db_host: lookup(ENV_DB_HOST),
            db_port,
            db_name: lookup(ENV_DB_NAME),
            db_username: lookup(ENV_DB_USERNAME),
            db_password: lookup(ENV_DB_PASSWORD),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
