//! History command implementation

use anyhow::Result;
use sd_audit::{AuditStore, ExecutionRecord, TablePresence, EXECUTION_TABLE};

use crate::cli::{GlobalArgs, HistoryArgs};
use crate::commands::common::{open_session, Project};

/// Execute the history command
pub(crate) fn execute(args: &HistoryArgs, global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let options = project.connect_options(global)?;

    let mut session = open_session(&options)?;
    let records = {
        let mut store = AuditStore::new(session.as_mut());
        if store.table_presence(EXECUTION_TABLE) == TablePresence::Exists {
            store.list_executions(args.script.as_deref(), args.limit)
        } else {
            Ok(Vec::new())
        }
    };
    session.close();
    let records = records?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else if records.is_empty() {
        println!("No executions recorded");
    } else {
        print_records(&records);
    }
    Ok(())
}

fn print_records(records: &[ExecutionRecord]) {
    let width = records
        .iter()
        .map(|r| r.filename.len())
        .max()
        .unwrap_or(8)
        .max(8);
    println!(
        "  {:<19}  {:<width$}  {:<7}  {:>9}  MESSAGE",
        "EXECUTED",
        "SCRIPT",
        "STATUS",
        "MS",
        width = width
    );
    for record in records {
        let when = record
            .execution_date
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        let message = record
            .exit_message
            .as_deref()
            .and_then(|m| m.lines().next())
            .unwrap_or("");
        println!(
            "  {:<19}  {:<width$}  {:<7}  {:>9}  {}",
            when,
            record.filename,
            record.status.to_string(),
            record.milliseconds,
            message,
            width = width
        );
    }
}
