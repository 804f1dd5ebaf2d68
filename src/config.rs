use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::{Validate, ValidationError};

use crate::bridge::SchemaVersion;
use crate::domain::{Scenario, SelectionPolicy, TargetId};
use crate::error::ConfigurationError;
use crate::runner::RetryPolicy;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    #[validate(nested)]
    pub batch: BatchConfig,
    /// HTTP interface provider; the simulated one is used when unset
    #[serde(default)]
    #[validate(nested)]
    pub interface: Option<InterfaceConfig>,
    #[serde(default)]
    pub db: Option<DbConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlobalConfig {
    /// Dataset version of the grids; unset means the legacy schema
    #[serde(default)]
    pub grid_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BatchConfig {
    /// `cluster`, `manual` or `all`
    pub choice_mode: String,
    /// Number of clusters for `cluster`
    #[serde(default)]
    pub no_grids: Option<usize>,
    /// Grid ids for `manual`
    #[serde(default)]
    pub manual_grids: Option<Vec<TargetId>>,
    pub grid_dir: PathBuf,
    pub scn_name: String,
    #[serde(default = "default_workers")]
    #[validate(range(min = 1, max = 256))]
    pub workers: usize,
    #[serde(default)]
    #[validate(range(min = 1))]
    pub target_timeout_seconds: Option<u64>,
    #[serde(default)]
    #[validate(custom(function = "validate_retry"))]
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InterfaceConfig {
    /// Serves `GET {base_url}/interface/{scenario}/{bus_id}`
    #[validate(url)]
    pub base_url: String,
    #[validate(range(min = 1, max = 600))]
    pub http_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub url: String,
}

fn default_workers() -> usize {
    1
}

fn validate_retry(retry: &RetryPolicy) -> Result<(), ValidationError> {
    if retry.max_attempts == 0 {
        return Err(ValidationError::new("max_attempts must be at least 1"));
    }
    if retry.initial_backoff > retry.max_backoff {
        return Err(ValidationError::new("initial backoff exceeds max backoff"));
    }
    Ok(())
}

impl Config {
    /// `config/default.toml` overridden by `GRIDBATCH__` environment variables
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("config/default.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("GRIDBATCH__").split("__"));
        let config: Config = figment.extract()?;
        config.validate().map_err(ConfigurationError::from)?;
        Ok(config)
    }

    pub fn schema_version(&self) -> SchemaVersion {
        SchemaVersion::from_grid_version(self.global.grid_version.as_deref())
    }
}

impl BatchConfig {
    pub fn selection_policy(&self) -> Result<SelectionPolicy, ConfigurationError> {
        match self.choice_mode.trim().to_ascii_lowercase().as_str() {
            "cluster" => {
                let count = self.no_grids.ok_or(ConfigurationError::MissingParameter {
                    mode: "cluster",
                    parameter: "no_grids",
                })?;
                Ok(SelectionPolicy::Cluster { count })
            }
            "manual" => {
                let ids = self
                    .manual_grids
                    .clone()
                    .ok_or(ConfigurationError::MissingParameter {
                        mode: "manual",
                        parameter: "manual_grids",
                    })?;
                Ok(SelectionPolicy::Manual { ids })
            }
            "all" => Ok(SelectionPolicy::All),
            _ => Err(ConfigurationError::UnknownChoiceMode(self.choice_mode.clone())),
        }
    }

    pub fn scenario(&self) -> Result<Scenario, ConfigurationError> {
        self.scn_name
            .parse()
            .map_err(|_| ConfigurationError::UnknownScenario(self.scn_name.clone()))
    }

    pub fn target_timeout(&self) -> Option<Duration> {
        self.target_timeout_seconds.map(Duration::from_secs)
    }
}
