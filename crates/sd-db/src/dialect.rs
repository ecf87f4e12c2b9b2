//! Dialect resolution: map a connection endpoint to a supported engine.
//!
//! The table is ordered and matched by endpoint prefix. Each entry names the
//! driver that serves it and the directory holding the engine's bootstrap
//! scripts for the audit tables.

use crate::error::{DbError, DbResult};
use std::fmt;

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// PostgreSQL via tokio-postgres
    Postgres,
    /// Microsoft SQL Server via tiberius
    SqlServer,
    /// DuckDB (embedded, file or in-memory)
    DuckDb,
}

/// Static description of one supported engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectInfo {
    pub dialect: Dialect,
    /// Human-readable engine name
    pub display_name: &'static str,
    /// Driver serving this engine
    pub driver: &'static str,
    /// Endpoint prefixes recognised for this engine, in match order
    pub prefixes: &'static [&'static str],
    /// Relative path of the engine's bootstrap scripts (trailing slash)
    pub schema_path: &'static str,
    /// Port used when a target omits one
    pub default_port: Option<u16>,
}

static DIALECTS: &[DialectInfo] = &[
    DialectInfo {
        dialect: Dialect::Postgres,
        display_name: "PostgreSQL",
        driver: "tokio-postgres",
        prefixes: &["postgresql://", "postgres://", "jdbc:postgresql://"],
        schema_path: "schema/postgres/",
        default_port: Some(5432),
    },
    DialectInfo {
        dialect: Dialect::SqlServer,
        display_name: "SQL Server",
        driver: "tiberius",
        prefixes: &["sqlserver://", "jdbc:sqlserver://"],
        schema_path: "schema/sqlserver/",
        default_port: Some(1433),
    },
    DialectInfo {
        dialect: Dialect::DuckDb,
        display_name: "DuckDB",
        driver: "duckdb",
        prefixes: &["duckdb:"],
        schema_path: "schema/duckdb/",
        default_port: None,
    },
];

/// Resolve the engine for a connection endpoint.
///
/// Pure: no I/O. Fails with [`DbError::UnsupportedDialect`] naming the
/// supported engines when no prefix matches.
pub fn resolve(endpoint: &str) -> DbResult<DialectInfo> {
    let endpoint = endpoint.trim();
    DIALECTS
        .iter()
        .find(|info| info.prefixes.iter().any(|p| endpoint.starts_with(p)))
        .copied()
        .ok_or_else(|| DbError::UnsupportedDialect {
            endpoint: endpoint.to_string(),
            supported: supported_names(),
        })
}

/// Comma-separated list of supported engine names.
pub fn supported_names() -> String {
    DIALECTS
        .iter()
        .map(|info| info.display_name)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Dialect {
    /// All supported dialects, in resolution order.
    pub fn all() -> impl Iterator<Item = Dialect> {
        DIALECTS.iter().map(|info| info.dialect)
    }

    /// Static description of this dialect.
    pub fn info(&self) -> DialectInfo {
        DIALECTS
            .iter()
            .find(|info| info.dialect == *self)
            .copied()
            .unwrap_or(DIALECTS[0])
    }

    /// Short lowercase name, as used in config files.
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::SqlServer => "sqlserver",
            Dialect::DuckDb => "duckdb",
        }
    }

    /// Parse a dialect name from config (`postgres`, `mssql`, ...).
    pub fn from_name(name: &str) -> DbResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "sqlserver" | "mssql" => Ok(Dialect::SqlServer),
            "duckdb" => Ok(Dialect::DuckDb),
            _ => Err(DbError::UnsupportedDialect {
                endpoint: name.to_string(),
                supported: supported_names(),
            }),
        }
    }

    /// Bind placeholder for the 1-based parameter `index`.
    pub fn param_placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", index),
            Dialect::SqlServer => format!("@P{}", index),
            Dialect::DuckDb => "?".to_string(),
        }
    }

    /// Comma-separated placeholders for `count` parameters starting at 1.
    pub fn placeholders(&self, count: usize) -> String {
        (1..=count)
            .map(|i| self.param_placeholder(i))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Format an endpoint from its parts using this engine's URL template.
    ///
    /// DuckDB has no server: `database` is the file path and `host`/`port`
    /// are ignored.
    pub fn build_endpoint(&self, host: &str, port: Option<u16>, database: &str) -> String {
        let port = port.or(self.info().default_port);
        match (self, port) {
            (Dialect::Postgres, Some(port)) => {
                format!("postgresql://{}:{}/{}", host, port, database)
            }
            (Dialect::Postgres, None) => format!("postgresql://{}/{}", host, database),
            (Dialect::SqlServer, Some(port)) => {
                format!("sqlserver://{}:{};databaseName={}", host, port, database)
            }
            (Dialect::SqlServer, None) => {
                format!("sqlserver://{};databaseName={}", host, database)
            }
            (Dialect::DuckDb, _) => format!("duckdb:{}", database),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
#[path = "dialect_test.rs"]
mod tests;
