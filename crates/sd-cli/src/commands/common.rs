//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use sd_core::{Catalog, Config, TargetEndpoint};
use sd_db::{ConnectOptions, Dialect, DriverSessionFactory, Session, SessionFactory};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that the session is closed before the process ends.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; main exits with the code and prints nothing.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Config and resolved paths for one invocation.
pub(crate) struct Project {
    pub(crate) root: PathBuf,
    pub(crate) config: Config,
}

impl Project {
    /// Load `--config`, or sqldeploy.yml from the project directory.
    ///
    /// `root` is the directory holding the config file, so a relative
    /// `catalog` entry is found next to it.
    pub(crate) fn load(global: &GlobalArgs) -> Result<Self> {
        match &global.config {
            Some(path) => {
                let path = Path::new(path);
                let config = Config::load(path)
                    .with_context(|| format!("Failed to load config from {}", path.display()))?;
                let root = match path.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                    _ => PathBuf::from("."),
                };
                Ok(Self { root, config })
            }
            None => {
                let root = PathBuf::from(&global.project_dir);
                let config = Config::load_from_dir_or_default(&root)
                    .with_context(|| format!("Failed to load config in {}", root.display()))?;
                Ok(Self { root, config })
            }
        }
    }

    /// The catalog named on the command line, or the configured one.
    pub(crate) fn load_catalog(&self, explicit: Option<&str>) -> Result<Catalog> {
        let path = match explicit {
            Some(path) => PathBuf::from(path),
            None => self.config.catalog_path(&self.root),
        };
        let catalog = Catalog::load(&path).context("Failed to load catalog")?;
        log::info!(
            "Catalog '{}' lists {} scripts",
            catalog.label,
            catalog.len()
        );
        Ok(catalog)
    }

    /// Connection settings: flags and environment first, then the target.
    pub(crate) fn connect_options(&self, global: &GlobalArgs) -> Result<ConnectOptions> {
        let target_name = global
            .target
            .as_deref()
            .or(self.config.default_target.as_deref());
        let target = self.config.selected_target(global.target.as_deref())?;

        let endpoint = match (&global.url, target, target_name) {
            (Some(url), _, _) => url.clone(),
            (None, Some(target), Some(name)) => match target.endpoint(name)? {
                TargetEndpoint::Url(url) => url,
                TargetEndpoint::Parts {
                    dialect,
                    host,
                    port,
                    database,
                } => Dialect::from_name(&dialect)?.build_endpoint(&host, port, &database),
            },
            _ => anyhow::bail!(
                "No database endpoint: pass --url, set SQLDEPLOY_URL, or configure a target"
            ),
        };

        let user = global
            .user
            .clone()
            .or_else(|| target.and_then(|t| t.user.clone()))
            .unwrap_or_default();
        let password = global
            .password
            .clone()
            .or_else(|| target.and_then(|t| t.password()))
            .unwrap_or_default();
        let timeout = global
            .login_timeout
            .unwrap_or(self.config.login_timeout_secs);

        Ok(ConnectOptions::new(endpoint)
            .with_credentials(user, password)
            .with_login_timeout(Duration::from_secs(timeout)))
    }
}

/// Open a read-only session for the reporting commands.
pub(crate) fn open_session(options: &ConnectOptions) -> Result<Box<dyn Session>> {
    DriverSessionFactory
        .open(options)
        .with_context(|| format!("Failed to connect to {}", options.endpoint))
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
