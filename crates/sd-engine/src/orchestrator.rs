//! Catalog deployment.
//!
//! One run opens a single session, bootstraps the audit tables, then walks
//! the catalog in order. Only connection and bootstrap failures end the run
//! early; a failing script is recorded as an ERROR execution and the next
//! script is attempted.

use crate::error::EngineResult;
use crate::runner::ScriptRunner;
use sd_audit::{decide, AuditStore, Decision, ExecutionStatus};
use sd_core::{Catalog, ScriptDescriptor};
use sd_db::{ConnectOptions, Session, SessionFactory};
use serde::Serialize;
use std::time::Instant;

/// Counters for one deployment run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Catalog label
    pub label: String,
    /// Scripts in the catalog
    pub total: usize,
    /// Scripts the run attempted
    pub executed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Scripts whose decision or execution record could not be written
    pub audit_errors: usize,
}

impl RunSummary {
    fn new(label: &str, total: usize) -> Self {
        Self {
            label: label.to_string(),
            total,
            ..Default::default()
        }
    }

    /// True when every attempted script succeeded and was recorded.
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.audit_errors == 0
    }
}

/// Deploys catalogs to the database described by its connect options.
pub struct Deployer<F: SessionFactory> {
    factory: F,
    options: ConnectOptions,
}

impl<F: SessionFactory> Deployer<F> {
    pub fn new(factory: F, options: ConnectOptions) -> Self {
        Self { factory, options }
    }

    /// Run the catalog; returns the number of scripts it lists.
    pub fn deploy_count(&self, catalog: &Catalog) -> EngineResult<usize> {
        Ok(self.deploy(catalog)?.total)
    }

    /// Run the catalog and report what happened.
    ///
    /// The session is closed exactly once, whether the run completes or
    /// bootstrap fails.
    pub fn deploy(&self, catalog: &Catalog) -> EngineResult<RunSummary> {
        let label = catalog.label.as_str();
        log::info!("Catalog has been loaded for {} database", label);

        let mut session = self.factory.open(&self.options)?;
        log::info!("[{}] Connection successfully established", label);

        let result = run_catalog(session.as_mut(), catalog);

        session.close();
        log::info!("[{}] The database connection is closed", label);
        result
    }
}

fn run_catalog(session: &mut dyn Session, catalog: &Catalog) -> EngineResult<RunSummary> {
    let label = catalog.label.as_str();
    let total = catalog.len();
    let mut store = AuditStore::new(session);

    log::info!("[{}] Check table schema", label);
    let report = store.bootstrap()?;
    if report.is_noop() {
        log::debug!("[{}] audit tables already present", label);
    }
    log::info!(
        "[{}] Catalog associated with {} scripts for execution",
        label,
        total
    );

    let runner = ScriptRunner::new(&catalog.base_dir);
    let mut summary = RunSummary::new(label, total);
    for (idx, script) in catalog.scripts.iter().enumerate() {
        let progress = format!("[{}] [{}/{}]", label, idx + 1, total);
        run_one(&mut store, &runner, script, &progress, &mut summary);
    }

    log::info!(
        "[{}] {} executed, {} succeeded, {} failed, {} skipped",
        label,
        summary.executed,
        summary.succeeded,
        summary.failed,
        summary.skipped
    );
    Ok(summary)
}

fn run_one(
    store: &mut AuditStore<'_>,
    runner: &ScriptRunner,
    script: &ScriptDescriptor,
    progress: &str,
    summary: &mut RunSummary,
) {
    let key = script.key();

    let catalog_id = match decide(store, script) {
        Ok(Decision::Run { catalog_id, reason }) => {
            log::debug!("{} running {} ({:?})", progress, key, reason);
            catalog_id
        }
        Ok(Decision::Skip { .. }) => {
            log::info!(
                "{} (SKIPPED): The script {} has been skipped.",
                progress,
                key
            );
            summary.skipped += 1;
            return;
        }
        Err(e) => {
            log::error!(
                "{} (ERROR) Could not decide whether to run {}: {}",
                progress,
                key,
                e
            );
            summary.audit_errors += 1;
            return;
        }
    };

    summary.executed += 1;
    let started = Instant::now();
    let outcome = runner.run(store.session(), script.script_type, &script.filename);
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let recorded = match outcome {
        Ok(()) => {
            log::info!(
                "{} (SUCCESS): The script {} has been successfully executed.",
                progress,
                key
            );
            summary.succeeded += 1;
            store.record_execution(&catalog_id, elapsed_ms, ExecutionStatus::Success, "")
        }
        Err(e) => {
            log::error!("{} (ERROR) Error executing script {} : {}", progress, key, e);
            summary.failed += 1;
            store.record_execution(
                &catalog_id,
                elapsed_ms,
                ExecutionStatus::Error,
                &e.cause_message(),
            )
        }
    };
    if !recorded {
        summary.audit_errors += 1;
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
