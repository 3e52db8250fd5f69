//! Adapter settings.
//!
//! Sources, later ones overriding earlier ones:
//! 1. `config/default.toml` (optional)
//! 2. `config/local.toml` (optional)
//! 3. A file given explicitly, e.g. through `--config`
//! 4. Environment variables prefixed with `NRQL_ADAPTER_`, nested keys joined
//!    by `__` (`NRQL_ADAPTER_METRICS__QUEUE_DEPTH__QUERY`)
//!
//! The API key may also be supplied as `NEWRELIC_API_KEY`, which wins over
//! every other source.

use crate::catalog::{Metric, MetricsCatalog};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::time::Duration;

pub const ENV_PREFIX: &str = "NRQL_ADAPTER";
pub const API_KEY_ENV: &str = "NEWRELIC_API_KEY";

const US_GRAPHQL_ENDPOINT: &str = "https://api.newrelic.com/graphql";
const EU_GRAPHQL_ENDPOINT: &str = "https://api.eu.newrelic.com/graphql";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    #[default]
    US,
    EU,
}

impl Region {
    pub fn graphql_endpoint(&self) -> &'static str {
        match self {
            Region::US => US_GRAPHQL_ENDPOINT,
            Region::EU => EU_GRAPHQL_ENDPOINT,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AdapterSettings {
    /// Account every query is executed against
    pub account_id: i64,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub region: Region,
    /// Value matched by `clusterName` on metrics with `add_cluster_filter`
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
    #[serde(default)]
    pub metrics: HashMap<String, Metric>,
}

fn default_query_timeout_secs() -> u64 {
    30
}

impl AdapterSettings {
    /// Loads settings from every source, with `config_file` layered on top
    /// of the files under `config/`.
    pub fn new(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let config_dir = Path::new("config");

        let mut builder = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false));

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        );

        Self::from_config(builder.build()?)
    }

    /// Parses settings from a TOML document, skipping the `config/` files and
    /// `NRQL_ADAPTER_*` variables. `NEWRELIC_API_KEY` still overrides `api_key`.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self, ConfigError> {
        let mut settings: AdapterSettings = config.try_deserialize()?;

        if let Ok(api_key) = env::var(API_KEY_ENV) {
            settings.api_key = Some(api_key);
        }

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, metric) in &self.metrics {
            if metric.query.trim().is_empty() {
                return Err(ConfigError::Message(format!(
                    "metric {name:?} has an empty query"
                )));
            }
            if metric.add_cluster_filter && self.cluster_name.is_empty() {
                return Err(ConfigError::Message(format!(
                    "metric {name:?} filters by cluster but cluster_name is not set"
                )));
            }
        }
        Ok(())
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn catalog(&self) -> MetricsCatalog {
        self.metrics.clone().into()
    }
}
