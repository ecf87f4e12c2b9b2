//! Configuration types and parsing for sqldeploy.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default connection-establishment timeout, in seconds.
pub const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 30;

/// Project configuration from sqldeploy.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Path to the catalog file, relative to the directory holding the config file
    #[serde(default = "default_catalog")]
    pub catalog: String,

    /// How long to wait for a connection to be established
    #[serde(default = "default_login_timeout")]
    pub login_timeout_secs: u64,

    /// Target used when none is named on the command line
    #[serde(default)]
    pub default_target: Option<String>,

    /// Named deployment targets (e.g., dev, staging, prod)
    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog: default_catalog(),
            login_timeout_secs: default_login_timeout(),
            default_target: None,
            targets: BTreeMap::new(),
        }
    }
}

/// Connection settings for one deployment target
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Full connection endpoint (takes precedence over host/port/database)
    #[serde(default)]
    pub url: Option<String>,

    /// Engine name when the endpoint is assembled from parts
    #[serde(default)]
    pub dialect: Option<String>,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub database: Option<String>,

    /// Login user
    #[serde(default)]
    pub user: Option<String>,

    /// Environment variable holding the password
    #[serde(default)]
    pub password_env: Option<String>,
}

/// How a target identifies its database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetEndpoint {
    /// A complete endpoint string
    Url(String),
    /// Parts to be formatted by the dialect's endpoint template
    Parts {
        dialect: String,
        host: String,
        port: Option<u16>,
        database: String,
    },
}

impl TargetConfig {
    /// Work out the endpoint this target describes.
    pub fn endpoint(&self, name: &str) -> CoreResult<TargetEndpoint> {
        if let Some(url) = &self.url {
            return Ok(TargetEndpoint::Url(url.clone()));
        }
        match (&self.dialect, &self.host, &self.database) {
            (Some(dialect), Some(host), Some(database)) => Ok(TargetEndpoint::Parts {
                dialect: dialect.clone(),
                host: host.clone(),
                port: self.port,
                database: database.clone(),
            }),
            _ => Err(CoreError::ConfigInvalid {
                message: format!(
                    "target '{}' needs either `url` or `dialect`, `host` and `database`",
                    name
                ),
            }),
        }
    }

    /// Read the password from the configured environment variable, if any.
    pub fn password(&self) -> Option<String> {
        self.password_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
    }
}

impl Config {
    /// Load and validate configuration from a file
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load sqldeploy.yml (or .yaml) from `dir`, or the defaults if neither exists.
    pub fn load_from_dir_or_default(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("sqldeploy.yml");
        let yaml_path = dir.join("sqldeploy.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> CoreResult<()> {
        if self.login_timeout_secs == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "login_timeout_secs must be greater than zero".to_string(),
            });
        }
        if let Some(default) = &self.default_target {
            self.target(default)?;
        }
        for (name, target) in &self.targets {
            target.endpoint(name)?;
        }
        Ok(())
    }

    /// Look up a named target.
    pub fn target(&self, name: &str) -> CoreResult<&TargetConfig> {
        self.targets
            .get(name)
            .ok_or_else(|| CoreError::TargetNotFound {
                name: name.to_string(),
                available: self.target_names().join(", "),
            })
    }

    /// Resolve the target to use: explicit name, then `default_target`.
    pub fn selected_target(&self, name: Option<&str>) -> CoreResult<Option<&TargetConfig>> {
        match name.or(self.default_target.as_deref()) {
            Some(name) => self.target(name).map(Some),
            None => Ok(None),
        }
    }

    /// Names of all configured targets, sorted.
    pub fn target_names(&self) -> Vec<String> {
        self.targets.keys().cloned().collect()
    }

    /// Catalog path resolved against the config directory.
    pub fn catalog_path(&self, root: &Path) -> PathBuf {
        root.join(&self.catalog)
    }
}

fn default_catalog() -> String {
    "catalog.yml".to_string()
}

fn default_login_timeout() -> u64 {
    DEFAULT_LOGIN_TIMEOUT_SECS
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
