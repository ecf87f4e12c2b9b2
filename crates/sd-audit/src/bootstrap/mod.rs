//! Embedded bootstrap scripts for the audit tables.
//!
//! One directory per engine under `schema/`, addressed by the dialect's
//! `schema_path` (for example `schema/postgres/`) plus the script name.

/// Script creating the script registry table.
pub const REGISTRY_SCRIPT: &str = "001_TABLE_CATALOG_SCRIPT_SQL.SQL";

/// Script creating the execution log table.
pub const EXECUTION_SCRIPT: &str = "002_TABLE_CATALOG_SCRIPT_SQL_EXECUTION.SQL";

/// A packaged bootstrap script.
pub struct BootstrapScript {
    /// Path relative to the package, e.g. `schema/duckdb/001_...SQL`
    pub path: &'static str,
    /// DDL to execute
    pub sql: &'static str,
}

/// All packaged scripts.
pub static BOOTSTRAP_SCRIPTS: &[BootstrapScript] = &[
    BootstrapScript {
        path: "schema/postgres/001_TABLE_CATALOG_SCRIPT_SQL.SQL",
        sql: include_str!("schema/postgres/001_TABLE_CATALOG_SCRIPT_SQL.SQL"),
    },
    BootstrapScript {
        path: "schema/postgres/002_TABLE_CATALOG_SCRIPT_SQL_EXECUTION.SQL",
        sql: include_str!("schema/postgres/002_TABLE_CATALOG_SCRIPT_SQL_EXECUTION.SQL"),
    },
    BootstrapScript {
        path: "schema/sqlserver/001_TABLE_CATALOG_SCRIPT_SQL.SQL",
        sql: include_str!("schema/sqlserver/001_TABLE_CATALOG_SCRIPT_SQL.SQL"),
    },
    BootstrapScript {
        path: "schema/sqlserver/002_TABLE_CATALOG_SCRIPT_SQL_EXECUTION.SQL",
        sql: include_str!("schema/sqlserver/002_TABLE_CATALOG_SCRIPT_SQL_EXECUTION.SQL"),
    },
    BootstrapScript {
        path: "schema/duckdb/001_TABLE_CATALOG_SCRIPT_SQL.SQL",
        sql: include_str!("schema/duckdb/001_TABLE_CATALOG_SCRIPT_SQL.SQL"),
    },
    BootstrapScript {
        path: "schema/duckdb/002_TABLE_CATALOG_SCRIPT_SQL_EXECUTION.SQL",
        sql: include_str!("schema/duckdb/002_TABLE_CATALOG_SCRIPT_SQL_EXECUTION.SQL"),
    },
];

/// Look up a packaged script by its full relative path.
pub fn bootstrap_script(path: &str) -> Option<&'static str> {
    BOOTSTRAP_SCRIPTS
        .iter()
        .find(|script| script.path == path)
        .map(|script| script.sql)
}
