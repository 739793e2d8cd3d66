//! YAML application config with environment overrides.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use flowtick_core::{PollerConfig, UpstreamConfig};
use flowtick_warehouse::WarehouseConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::logging::LogConfig;

pub const DEFAULT_CONFIG_PATH: &str = "flowtick.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("missing required setting '{field}'")]
    Missing { field: &'static str },
}

/// `warehouse:` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WarehouseSection {
    /// `~/` is expanded against `HOME`. Unset means `FLOWTICK_HOME`.
    pub db_path: Option<PathBuf>,
    pub max_pool_size: usize,
}

impl Default for WarehouseSection {
    fn default() -> Self {
        Self {
            db_path: None,
            max_pool_size: 4,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub upstream: UpstreamConfig,
    pub poller: PollerConfig,
    pub warehouse: WarehouseSection,
    pub logging: LogConfig,
}

impl AppConfig {
    /// Load `path` and apply environment overrides.
    ///
    /// A missing file falls back to defaults unless the path was given
    /// explicitly.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path.is_some();
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));

        let mut config = match fs::read_to_string(path) {
            Ok(raw) => Self::from_yaml(&raw)?,
            Err(error) if error.kind() == io::ErrorKind::NotFound && !explicit => Self::default(),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        config.apply_overrides(|key| env::var(key).ok());
        config.logging = config.logging.with_env_overrides();
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Overlay `FLOWTICK_*` variables; empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(username) = lookup("FLOWTICK_USERNAME") {
            self.upstream.username = username;
        }
        if let Some(password) = lookup("FLOWTICK_PASSWORD") {
            self.upstream.password = password;
        }
        if let Some(base_url) = lookup("FLOWTICK_BASE_URL") {
            self.upstream.base_url = base_url;
        }
        if let Some(db_path) = lookup("FLOWTICK_DB_PATH") {
            self.warehouse.db_path = Some(PathBuf::from(db_path));
        }
    }

    /// Credentials needed by `run`.
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        if self.upstream.username.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "upstream.username",
            });
        }
        if self.upstream.password.is_empty() {
            return Err(ConfigError::Missing {
                field: "upstream.password",
            });
        }
        Ok(())
    }

    pub fn warehouse_config(&self) -> WarehouseConfig {
        let defaults = WarehouseConfig::default();
        WarehouseConfig {
            db_path: self
                .warehouse
                .db_path
                .as_deref()
                .map(expand_home)
                .unwrap_or(defaults.db_path),
            max_pool_size: self.warehouse.max_pool_size,
        }
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}
