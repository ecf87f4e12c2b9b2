//! Registry and execution log access over one [`Session`].
//!
//! Every lookup and insert is keyed by the normalized filename (uppercase
//! base name), never by path; the store normalizes whatever it is given.
//! Parameters are bound with the dialect's placeholder syntax.

use crate::bootstrap::{bootstrap_script, EXECUTION_SCRIPT, REGISTRY_SCRIPT};
use crate::error::{AuditError, AuditResult};
use chrono::{Local, NaiveDateTime, Utc};
use sd_core::{normalize_filename, ScriptType};
use sd_db::{query_map, Dialect, DialectInfo, Row, Session, SqlParam};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Script registry table.
pub const REGISTRY_TABLE: &str = "CATALOG_SCRIPT_SQL";

/// Execution log table.
pub const EXECUTION_TABLE: &str = "CATALOG_SCRIPT_SQL_EXECUTION";

/// Outcome of one script attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionStatus {
    Success,
    Error,
}

impl ExecutionStatus {
    /// Value stored in `catalog_script_sql_execution.status`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "SUCCESS",
            ExecutionStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "SUCCESS" => Ok(ExecutionStatus::Success),
            "ERROR" => Ok(ExecutionStatus::Error),
            other => Err(AuditError::UnknownStatus(other.to_string())),
        }
    }
}

/// Whether an audit table exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TablePresence {
    Exists,
    Missing,
    /// Metadata could not be read; carries the driver message
    Unknown(String),
}

/// Tables created by [`AuditStore::bootstrap`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub created: Vec<&'static str>,
}

impl BootstrapReport {
    /// True when both tables already existed.
    pub fn is_noop(&self) -> bool {
        self.created.is_empty()
    }
}

/// Registry row as seen by the decision engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub catalog_id: String,
    pub one_time: bool,
}

/// One row of the execution log joined with its registry entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionRecord {
    pub filename: String,
    pub label: Option<String>,
    pub object_type: String,
    pub execution_date: Option<NaiveDateTime>,
    pub milliseconds: i64,
    pub status: ExecutionStatus,
    pub exit_message: Option<String>,
}

/// Registry row with aggregated execution history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptState {
    pub filename: String,
    pub label: Option<String>,
    pub object_type: String,
    pub one_time: bool,
    pub attempts: i64,
    pub successes: i64,
    pub last_run: Option<NaiveDateTime>,
}

impl ScriptState {
    /// Whether a one-time script will be skipped by the next run.
    pub fn is_settled(&self) -> bool {
        self.one_time && self.successes > 0
    }
}

/// Generate a registry key: creation time in milliseconds plus a random UUID.
pub fn new_catalog_id() -> String {
    format!("{}_{}", Utc::now().timestamp_millis(), Uuid::new_v4())
}

fn one_time_flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

fn parse_one_time(value: Option<String>) -> bool {
    value.is_some_and(|v| v.trim() == "1")
}

/// Expression yielding the session's default schema.
fn current_schema_expr(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Postgres | Dialect::DuckDb => "current_schema()",
        Dialect::SqlServer => "SCHEMA_NAME()",
    }
}

/// Audit table access bound to one open session.
///
/// The store borrows the session for its lifetime; [`AuditStore::session`]
/// lends it back out so scripts run on the same connection.
pub struct AuditStore<'s> {
    session: &'s mut dyn Session,
    info: DialectInfo,
}

impl<'s> AuditStore<'s> {
    pub fn new(session: &'s mut dyn Session) -> Self {
        let info = session.dialect().info();
        Self { session, info }
    }

    pub fn dialect_info(&self) -> DialectInfo {
        self.info
    }

    /// The underlying session.
    pub fn session(&mut self) -> &mut dyn Session {
        &mut *self.session
    }

    fn p(&self, index: usize) -> String {
        self.info.dialect.param_placeholder(index)
    }

    /// Look the table up in `information_schema.tables`.
    pub fn metadata_presence(&mut self, table: &str) -> TablePresence {
        let sql = format!(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE UPPER(table_name) = {} AND table_schema = {}",
            self.p(1),
            current_schema_expr(self.info.dialect)
        );
        match self
            .session
            .query_scalar_int(&sql, &[table.to_uppercase().into()])
        {
            Ok(n) if n > 0 => TablePresence::Exists,
            Ok(_) => TablePresence::Missing,
            Err(e) => TablePresence::Unknown(e.driver_message()),
        }
    }

    /// Whether `table` exists, probing it directly when metadata is unavailable.
    pub fn table_presence(&mut self, table: &str) -> TablePresence {
        match self.metadata_presence(table) {
            TablePresence::Unknown(message) => {
                log::debug!(
                    "metadata lookup for {} failed ({}), probing the table",
                    table,
                    message
                );
                let probe = format!("SELECT COUNT(*) FROM {}", table.to_lowercase());
                match self.session.query_scalar_int(&probe, &[]) {
                    Ok(_) => TablePresence::Exists,
                    Err(e) => {
                        log::debug!("table probe for {} failed: {}", table, e.driver_message());
                        TablePresence::Missing
                    }
                }
            }
            known => known,
        }
    }

    /// Create whichever audit tables are missing. Safe to call on every run.
    pub fn bootstrap(&mut self) -> AuditResult<BootstrapReport> {
        let mut report = BootstrapReport::default();
        for (table, script) in [
            (REGISTRY_TABLE, REGISTRY_SCRIPT),
            (EXECUTION_TABLE, EXECUTION_SCRIPT),
        ] {
            if self.table_presence(table) == TablePresence::Exists {
                continue;
            }

            let path = format!("{}{}", self.info.schema_path, script);
            let sql = bootstrap_script(&path)
                .ok_or_else(|| AuditError::MissingBootstrapScript { path: path.clone() })?;
            log::debug!("creating {} from {}", table, path);

            self.session
                .execute_script(sql)
                .map_err(|e| AuditError::BootstrapError {
                    table: table.to_string(),
                    message: e.driver_message(),
                })?;
            log::info!("schema {} table has been created successfully", table);
            report.created.push(table);
        }
        Ok(report)
    }

    /// Registry entry for `filename`.
    ///
    /// Legacy databases may hold several rows for one filename; the first
    /// returned by the engine wins.
    pub fn find_registration(&mut self, filename: &str) -> AuditResult<Option<Registration>> {
        let sql = format!(
            "SELECT catalog_id, one_time FROM catalog_script_sql WHERE filename = {}",
            self.p(1)
        );
        let key = normalize_filename(filename);
        let rows = query_map(&mut *self.session, &sql, &[key.into()], |row| {
            Ok(Registration {
                catalog_id: row.get_string(0)?.unwrap_or_default(),
                one_time: parse_one_time(row.get_string(1)?),
            })
        })?;
        Ok(rows.into_iter().next())
    }

    pub fn find_catalog_id(&mut self, filename: &str) -> AuditResult<Option<String>> {
        Ok(self.find_registration(filename)?.map(|r| r.catalog_id))
    }

    fn count_executions(
        &mut self,
        filename: &str,
        status: Option<ExecutionStatus>,
    ) -> AuditResult<i64> {
        let mut sql = format!(
            "SELECT COUNT(1) FROM catalog_script_sql_execution e \
             INNER JOIN catalog_script_sql s ON e.catalog_id = s.catalog_id \
             WHERE s.filename = {}",
            self.p(1)
        );
        let mut params: Vec<SqlParam> = vec![normalize_filename(filename).into()];
        if let Some(status) = status {
            sql.push_str(&format!(" AND e.status = {}", self.p(2)));
            params.push(status.as_str().into());
        }
        Ok(self.session.query_scalar_int(&sql, &params)?)
    }

    /// Whether the script has been attempted at all.
    pub fn has_any_execution(&mut self, filename: &str) -> AuditResult<bool> {
        Ok(self.count_executions(filename, None)? > 0)
    }

    /// Whether at least one attempt succeeded.
    pub fn has_successful_execution(&mut self, filename: &str) -> AuditResult<bool> {
        Ok(self.count_executions(filename, Some(ExecutionStatus::Success))? > 0)
    }

    /// Insert a registry row and return its new catalog id.
    pub fn register_new(
        &mut self,
        script_type: ScriptType,
        label: &str,
        filename: &str,
        one_time: bool,
    ) -> AuditResult<String> {
        let catalog_id = new_catalog_id();
        let key = normalize_filename(filename);
        let sql = format!(
            "INSERT INTO catalog_script_sql (catalog_id, object_type, label, filename, one_time) \
             VALUES ({})",
            self.info.dialect.placeholders(5)
        );
        self.session.execute(
            &sql,
            &[
                catalog_id.as_str().into(),
                script_type.as_str().into(),
                label.into(),
                key.as_str().into(),
                one_time_flag(one_time).into(),
            ],
        )?;
        log::debug!("registered {} as {}", key, catalog_id);
        Ok(catalog_id)
    }

    /// Store the catalog's current one-time policy for every row of `filename`.
    pub fn update_policy(&mut self, filename: &str, one_time: bool) -> AuditResult<u64> {
        let sql = format!(
            "UPDATE catalog_script_sql SET one_time = {} WHERE filename = {}",
            self.p(1),
            self.p(2)
        );
        let key = normalize_filename(filename);
        Ok(self
            .session
            .execute(&sql, &[one_time_flag(one_time).into(), key.into()])?)
    }

    /// Append one execution row stamped with the current local time.
    /// `message` is empty for successful runs.
    ///
    /// Failures are logged, never returned; the result says whether the row
    /// was written.
    pub fn record_execution(
        &mut self,
        catalog_id: &str,
        duration_ms: u64,
        status: ExecutionStatus,
        message: &str,
    ) -> bool {
        let sql = format!(
            "INSERT INTO catalog_script_sql_execution \
             (catalog_id, execution_date, miliseconds, status, exit_message) VALUES ({})",
            self.info.dialect.placeholders(5)
        );
        let params: [SqlParam; 5] = [
            catalog_id.into(),
            Local::now().naive_local().into(),
            i64::try_from(duration_ms).unwrap_or(i64::MAX).into(),
            status.as_str().into(),
            message.into(),
        ];
        match self.session.execute(&sql, &params) {
            Ok(_) => true,
            Err(e) => {
                log::error!(
                    "could not record {} execution for {}: {}",
                    status,
                    catalog_id,
                    e.driver_message()
                );
                false
            }
        }
    }

    /// At most `limit` executions, most recent first, optionally for one script.
    pub fn list_executions(
        &mut self,
        filename: Option<&str>,
        limit: usize,
    ) -> AuditResult<Vec<ExecutionRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        // Limits beyond i64 are unbounded.
        let limit = i64::try_from(limit).ok();
        let top = match (self.info.dialect, limit) {
            (Dialect::SqlServer, Some(n)) => format!("TOP ({}) ", n),
            _ => String::new(),
        };
        let mut sql = format!(
            "SELECT {top}s.filename, s.label, s.object_type, e.execution_date, e.miliseconds, \
             e.status, e.exit_message \
             FROM catalog_script_sql_execution e \
             INNER JOIN catalog_script_sql s ON e.catalog_id = s.catalog_id"
        );
        let mut params: Vec<SqlParam> = Vec::new();
        if let Some(filename) = filename {
            sql.push_str(&format!(" WHERE s.filename = {}", self.p(1)));
            params.push(normalize_filename(filename).into());
        }
        sql.push_str(" ORDER BY e.execution_date DESC");
        match (self.info.dialect, limit) {
            (Dialect::SqlServer, _) | (_, None) => {}
            (_, Some(n)) => sql.push_str(&format!(" LIMIT {}", n)),
        }

        let mut records = Vec::new();
        let mut bad_status = None;
        self.session.query_rows(&sql, &params, &mut |row| {
            if bad_status.is_some() {
                return Ok(());
            }
            match execution_record(&row)? {
                Ok(record) => records.push(record),
                Err(e) => bad_status = Some(e),
            }
            Ok(())
        })?;
        match bad_status {
            Some(e) => Err(e),
            None => Ok(records),
        }
    }

    /// Every registered script with its attempt counts, ordered by filename.
    pub fn script_states(&mut self) -> AuditResult<Vec<ScriptState>> {
        let success = ExecutionStatus::Success.as_str();
        let sql = format!(
            "SELECT s.filename, s.label, s.object_type, s.one_time, \
             (SELECT COUNT(1) FROM catalog_script_sql_execution e \
              WHERE e.catalog_id = s.catalog_id) AS attempts, \
             (SELECT COUNT(1) FROM catalog_script_sql_execution e \
              WHERE e.catalog_id = s.catalog_id AND e.status = '{success}') AS successes, \
             (SELECT MAX(e.execution_date) FROM catalog_script_sql_execution e \
              WHERE e.catalog_id = s.catalog_id) AS last_run \
             FROM catalog_script_sql s ORDER BY s.filename"
        );
        Ok(query_map(&mut *self.session, &sql, &[], |row| {
            Ok(ScriptState {
                filename: row.get_string(0)?.unwrap_or_default(),
                label: row.get_string(1)?,
                object_type: row.get_string(2)?.unwrap_or_default(),
                one_time: parse_one_time(row.get_string(3)?),
                attempts: row.get_i64(4)?.unwrap_or(0),
                successes: row.get_i64(5)?.unwrap_or(0),
                last_run: row.get_timestamp(6)?,
            })
        })?)
    }
}

/// Column errors abort the stream; an unknown status is reported after it.
fn execution_record(row: &Row) -> sd_db::DbResult<AuditResult<ExecutionRecord>> {
    let status = row.get_string(5)?.unwrap_or_default();
    let status = match status.parse::<ExecutionStatus>() {
        Ok(status) => status,
        Err(e) => return Ok(Err(e)),
    };
    Ok(Ok(ExecutionRecord {
        filename: row.get_string(0)?.unwrap_or_default(),
        label: row.get_string(1)?,
        object_type: row.get_string(2)?.unwrap_or_default(),
        execution_date: row.get_timestamp(3)?,
        milliseconds: row.get_i64(4)?.unwrap_or(0),
        status,
        exit_message: row.get_string(6)?,
    }))
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
