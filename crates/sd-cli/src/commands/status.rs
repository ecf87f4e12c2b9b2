//! Status command implementation
//!
//! Read-only: the audit tables are inspected but never created.

use anyhow::Result;
use sd_audit::{AuditStore, ScriptState, TablePresence, EXECUTION_TABLE, REGISTRY_TABLE};
use sd_core::Catalog;
use sd_db::Session;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::cli::{GlobalArgs, StatusArgs};
use crate::commands::common::{open_session, Project};

/// What the next deploy will do with a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ScriptStatusKind {
    /// Not registered yet; runs on the next deploy
    New,
    /// One-time, registered, never attempted
    Pending,
    /// One-time, only failed attempts so far
    Failed,
    /// One-time, succeeded; skipped from now on
    Applied,
    /// Runs on every deploy
    Repeatable,
}

impl fmt::Display for ScriptStatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptStatusKind::New => write!(f, "new"),
            ScriptStatusKind::Pending => write!(f, "pending"),
            ScriptStatusKind::Failed => write!(f, "failed"),
            ScriptStatusKind::Applied => write!(f, "applied"),
            ScriptStatusKind::Repeatable => write!(f, "repeatable"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ScriptStatus {
    pub(crate) position: usize,
    pub(crate) filename: String,
    pub(crate) onetime: bool,
    pub(crate) status: ScriptStatusKind,
    pub(crate) attempts: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct StatusReport {
    pub(crate) label: String,
    pub(crate) audit_tables_present: bool,
    pub(crate) scripts: Vec<ScriptStatus>,
    /// Registered scripts no longer listed in the catalog
    pub(crate) unlisted: Vec<String>,
}

/// Execute the status command
pub(crate) fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let catalog = project.load_catalog(args.catalog.as_deref())?;
    let options = project.connect_options(global)?;

    let mut session = open_session(&options)?;
    let report = build_report(session.as_mut(), &catalog);
    session.close();
    let report = report?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

pub(crate) fn build_report(session: &mut dyn Session, catalog: &Catalog) -> Result<StatusReport> {
    let mut store = AuditStore::new(session);
    let present = [REGISTRY_TABLE, EXECUTION_TABLE]
        .into_iter()
        .all(|table| store.table_presence(table) == TablePresence::Exists);

    let states = if present {
        store.script_states()?
    } else {
        Vec::new()
    };
    Ok(classify(catalog, states, present))
}

fn classify(catalog: &Catalog, states: Vec<ScriptState>, present: bool) -> StatusReport {
    let mut by_key: HashMap<String, ScriptState> = states
        .into_iter()
        .map(|state| (state.filename.clone(), state))
        .collect();

    let scripts = catalog
        .scripts
        .iter()
        .enumerate()
        .map(|(idx, script)| {
            let key = script.key();
            let state = by_key.remove(&key);
            let attempts = state.as_ref().map_or(0, |s| s.attempts);
            let status = match state {
                None => ScriptStatusKind::New,
                Some(_) if !script.onetime => ScriptStatusKind::Repeatable,
                Some(s) if s.successes > 0 => ScriptStatusKind::Applied,
                Some(s) if s.attempts > 0 => ScriptStatusKind::Failed,
                Some(_) => ScriptStatusKind::Pending,
            };
            ScriptStatus {
                position: idx + 1,
                filename: key,
                onetime: script.onetime,
                status,
                attempts,
            }
        })
        .collect();

    let mut unlisted: Vec<String> = by_key.into_keys().collect();
    unlisted.sort();

    StatusReport {
        label: catalog.label.clone(),
        audit_tables_present: present,
        scripts,
        unlisted,
    }
}

fn print_report(report: &StatusReport) {
    println!("Catalog '{}'", report.label);
    if !report.audit_tables_present {
        println!("  audit tables not found; the first deploy will create them");
    }
    println!();

    let width = report
        .scripts
        .iter()
        .map(|s| s.filename.len())
        .max()
        .unwrap_or(8)
        .max(8);
    println!(
        "  {:>4}  {:<width$}  {:<10}  {:>8}",
        "#",
        "SCRIPT",
        "STATUS",
        "ATTEMPTS",
        width = width
    );
    for script in &report.scripts {
        println!(
            "  {:>4}  {:<width$}  {:<10}  {:>8}",
            script.position,
            script.filename,
            script.status.to_string(),
            script.attempts,
            width = width
        );
    }

    if !report.unlisted.is_empty() {
        println!();
        println!(
            "  {} registered scripts are not in the catalog: {}",
            report.unlisted.len(),
            report.unlisted.join(", ")
        );
    }
}

#[cfg(test)]
#[path = "status_test.rs"]
mod tests;
