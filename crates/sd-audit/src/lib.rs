//! sd-audit - Audit store for sqldeploy
//!
//! Owns the two bookkeeping tables kept in every target database: the script
//! registry (`catalog_script_sql`) and the append-only execution log
//! (`catalog_script_sql_execution`). The [`decision`] module decides, per
//! script, whether a deployment run executes it.

pub mod bootstrap;
pub mod decision;
pub mod error;
pub mod store;

pub use decision::{decide, Decision, RunReason};
pub use error::{AuditError, AuditResult};
pub use store::{
    new_catalog_id, AuditStore, BootstrapReport, ExecutionRecord, ExecutionStatus, Registration,
    ScriptState, TablePresence, EXECUTION_TABLE, REGISTRY_TABLE,
};
