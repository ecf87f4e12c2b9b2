//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand};

/// sqldeploy - Apply a catalog of SQL scripts to a database and audit every run
#[derive(Parser, Debug)]
#[command(name = "sqldeploy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding sqldeploy.yml and the catalog
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Named target from the config file
    #[arg(short, long, global = true)]
    pub target: Option<String>,

    /// Connection endpoint, e.g. postgresql://host:5432/db or duckdb:app.duckdb
    #[arg(long, global = true, env = "SQLDEPLOY_URL")]
    pub url: Option<String>,

    /// Database user
    #[arg(short, long, global = true, env = "SQLDEPLOY_USER")]
    pub user: Option<String>,

    /// Database password
    #[arg(long, global = true, env = "SQLDEPLOY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Seconds to wait for the connection to be established
    #[arg(long, global = true)]
    pub login_timeout: Option<u64>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the catalog against the target database
    Deploy(DeployArgs),

    /// Compare the catalog with the scripts recorded in the target database
    Status(StatusArgs),

    /// Show recorded script executions, newest first
    History(HistoryArgs),
}

/// Arguments for the deploy command
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Catalog file (default: from config, then catalog.yml)
    #[arg(long)]
    pub catalog: Option<String>,

    /// Exit non-zero when any script fails
    #[arg(long)]
    pub strict: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Catalog file (default: from config, then catalog.yml)
    #[arg(long)]
    pub catalog: Option<String>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the history command
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Only show executions of this script (any path; matched by file name)
    #[arg(short, long)]
    pub script: Option<String>,

    /// Maximum number of executions to show
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: usize,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
