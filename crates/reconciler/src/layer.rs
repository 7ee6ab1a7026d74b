//! Pebble layer model and the Waltz workload spec builder.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use waltz_core::DatabaseConfig;

use crate::error::{Error, Result};

/// Name of the managed service, and the label of the layer that defines it.
pub const SERVICE_NAME: &str = "waltz";

/// Label used when adding the layer to the supervisor.
pub const LAYER_LABEL: &str = "waltz";

const LAYER_SUMMARY: &str = "Waltz layer";
const LAYER_DESCRIPTION: &str = "Pebble config layer for Waltz.";
const SERVICE_COMMAND: &str = "/bin/sh -c 'docker-entrypoint.sh update run'";
const SERVICE_USER: &str = "waltz";

const DB_SCHEME: &str = "waltz";
const WALTZ_FROM_EMAIL: &str = "help@finos.org";
const CHANGELOG_FILE: &str = "/opt/waltz/liquibase/db.changelog-master.xml";

/// How a service entry combines with an existing entry of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Override {
    /// Overlay the set fields onto the existing entry.
    Merge,
    /// Discard the existing entry.
    Replace,
}

/// Whether the supervisor starts a service automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Startup {
    Enabled,
    Disabled,
}

/// One service entry of a layer or plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    #[serde(rename = "override")]
    pub override_: Override,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup: Option<Startup>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
}

impl ServiceSpec {
    /// Combine `other` into this entry according to `other`'s override policy.
    pub fn combine(&mut self, other: &Self) {
        match other.override_ {
            Override::Replace => *self = other.clone(),
            Override::Merge => {
                if other.summary.is_some() {
                    self.summary.clone_from(&other.summary);
                }
                if other.command.is_some() {
                    self.command.clone_from(&other.command);
                }
                if other.startup.is_some() {
                    self.startup = other.startup;
                }
                if other.user.is_some() {
                    self.user.clone_from(&other.user);
                }
                self.environment.extend(
                    other
                        .environment
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone())),
                );
            }
        }
    }
}

/// A declarative layer of service definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub services: BTreeMap<String, ServiceSpec>,
}

impl Layer {
    /// Get a service entry by name.
    pub fn service(&self, name: &str) -> Option<&ServiceSpec> {
        self.services.get(name)
    }

    /// Combine another layer into this one, service by service.
    pub fn combine(&mut self, other: &Self) {
        if other.summary.is_some() {
            self.summary.clone_from(&other.summary);
        }
        if other.description.is_some() {
            self.description.clone_from(&other.description);
        }
        for (name, service) in &other.services {
            match self.services.get_mut(name) {
                Some(existing) => existing.combine(service),
                None => {
                    self.services.insert(name.clone(), service.clone());
                }
            }
        }
    }

    /// Render the layer as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::serialization(e.to_string()))
    }
}

/// The supervisor's effective service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub services: BTreeMap<String, ServiceSpec>,
}

impl Plan {
    /// Flatten an ordered sequence of layers into a plan.
    pub fn from_layers<'a>(layers: impl IntoIterator<Item = &'a Layer>) -> Self {
        let mut services: BTreeMap<String, ServiceSpec> = BTreeMap::new();
        for layer in layers {
            for (name, service) in &layer.services {
                match services.get_mut(name) {
                    Some(existing) => existing.combine(service),
                    None => {
                        services.insert(name.clone(), service.clone());
                    }
                }
            }
        }
        Self { services }
    }

    /// Get a service entry by name.
    pub fn service(&self, name: &str) -> Option<&ServiceSpec> {
        self.services.get(name)
    }
}

/// Build the layer that runs Waltz against `config`.
///
/// Pure and total: the same connection details always produce an equal layer.
pub fn build_layer(config: &DatabaseConfig) -> Layer {
    let environment: BTreeMap<String, String> = [
        ("DB_HOST", config.host.clone()),
        ("DB_PORT", config.port.to_string()),
        ("DB_NAME", config.database.clone()),
        ("DB_USER", config.username.clone()),
        ("DB_PASSWORD", config.password.clone()),
        ("DB_SCHEME", DB_SCHEME.to_string()),
        ("WALTZ_FROM_EMAIL", WALTZ_FROM_EMAIL.to_string()),
        ("CHANGELOG_FILE", CHANGELOG_FILE.to_string()),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect();

    let service = ServiceSpec {
        override_: Override::Replace,
        summary: Some(SERVICE_NAME.to_string()),
        command: Some(SERVICE_COMMAND.to_string()),
        startup: Some(Startup::Enabled),
        user: Some(SERVICE_USER.to_string()),
        environment,
    };

    Layer {
        summary: Some(LAYER_SUMMARY.to_string()),
        description: Some(LAYER_DESCRIPTION.to_string()),
        services: BTreeMap::from([(SERVICE_NAME.to_string(), service)]),
    }
}
