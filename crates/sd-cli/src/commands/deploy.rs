//! Deploy command implementation

use anyhow::{Context, Result};
use sd_db::DriverSessionFactory;
use sd_engine::{Deployer, RunSummary};

use crate::cli::{DeployArgs, GlobalArgs};
use crate::commands::common::{ExitCode, Project};

/// Execute the deploy command
pub(crate) fn execute(args: &DeployArgs, global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let catalog = project.load_catalog(args.catalog.as_deref())?;
    let options = project.connect_options(global)?;

    let summary = Deployer::new(DriverSessionFactory, options)
        .deploy(&catalog)
        .with_context(|| format!("Deployment of '{}' aborted", catalog.label))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    if args.strict && !summary.is_clean() {
        return Err(ExitCode(1).into());
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!(
        "Deployed '{}': {} scripts in catalog",
        summary.label, summary.total
    );
    println!(
        "  {} executed ({} succeeded, {} failed), {} skipped",
        summary.executed, summary.succeeded, summary.failed, summary.skipped
    );
    if summary.audit_errors > 0 {
        println!(
            "  {} scripts could not be audited; see the log for details",
            summary.audit_errors
        );
    }
}
