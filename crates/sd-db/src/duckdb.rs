//! DuckDB session implementation

use crate::dialect::Dialect;
use crate::error::{DbError, DbResult};
use crate::session::{Row, Session, SqlParam, SqlValue};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use duckdb::types::{TimeUnit, ToSqlOutput, Value, ValueRef};
use duckdb::{params_from_iter, Connection, ToSql};
use std::path::Path;

/// DuckDB session; DuckDB streams results in vector-sized chunks.
pub struct DuckDbSession {
    conn: Option<Connection>,
}

impl DuckDbSession {
    /// Create a new in-memory DuckDB session
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self { conn: Some(conn) })
    }

    /// Create a new DuckDB session from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self { conn: Some(conn) })
    }

    /// Open from a `duckdb:` endpoint (`duckdb::memory:` or `duckdb:<path>`)
    pub fn connect(endpoint: &str) -> DbResult<Self> {
        let target = endpoint.trim().strip_prefix("duckdb:").unwrap_or(endpoint);
        if target.is_empty() || target == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(target))
        }
    }

    fn conn(&self) -> DbResult<&Connection> {
        self.conn.as_ref().ok_or(DbError::ConnectionClosed)
    }
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlParam::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlParam::Int(i) => ToSqlOutput::Owned(Value::BigInt(*i)),
            SqlParam::Bool(b) => ToSqlOutput::Owned(Value::Boolean(*b)),
            SqlParam::Timestamp(ts) => ToSqlOutput::Owned(Value::Timestamp(
                TimeUnit::Microsecond,
                ts.and_utc().timestamp_micros(),
            )),
            SqlParam::Null => ToSqlOutput::Owned(Value::Null),
        })
    }
}

fn timestamp_from(unit: TimeUnit, raw: i64) -> Option<NaiveDateTime> {
    let micros = match unit {
        TimeUnit::Second => raw.checked_mul(1_000_000)?,
        TimeUnit::Millisecond => raw.checked_mul(1_000)?,
        TimeUnit::Microsecond => raw,
        TimeUnit::Nanosecond => raw / 1_000,
    };
    DateTime::from_timestamp_micros(micros).map(|dt| dt.naive_utc())
}

fn read_value(row: &duckdb::Row<'_>, idx: usize) -> DbResult<SqlValue> {
    let value: Value = row.get(idx).map_err(|e| DbError::ValueError {
        column: idx,
        message: e.to_string(),
    })?;
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Boolean(b) => SqlValue::Bool(b),
        Value::TinyInt(v) => SqlValue::Int(v.into()),
        Value::SmallInt(v) => SqlValue::Int(v.into()),
        Value::Int(v) => SqlValue::Int(v.into()),
        Value::BigInt(v) => SqlValue::Int(v),
        Value::HugeInt(v) => SqlValue::Int(v as i64),
        Value::UTinyInt(v) => SqlValue::Int(v.into()),
        Value::USmallInt(v) => SqlValue::Int(v.into()),
        Value::UInt(v) => SqlValue::Int(v.into()),
        Value::UBigInt(v) => SqlValue::Int(v as i64),
        Value::Float(v) => SqlValue::Float(v.into()),
        Value::Double(v) => SqlValue::Float(v),
        Value::Text(s) => SqlValue::Text(s),
        Value::Timestamp(unit, raw) => timestamp_from(unit, raw)
            .map(SqlValue::Timestamp)
            .unwrap_or(SqlValue::Null),
        Value::Date32(days) => NaiveDate::from_ymd_opt(1970, 1, 1)
            .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(days.into())))
            .map(|date| SqlValue::Timestamp(date.and_time(NaiveTime::MIN)))
            .unwrap_or(SqlValue::Null),
        other => SqlValue::Text(format!("{:?}", other)),
    })
}

impl Session for DuckDbSession {
    fn dialect(&self) -> Dialect {
        Dialect::DuckDb
    }

    fn query_rows(
        &mut self,
        sql: &str,
        params: &[SqlParam],
        on_row: &mut dyn FnMut(Row) -> DbResult<()>,
    ) -> DbResult<()> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| DbError::QueryError(e.to_string()))?;
        let mut rows = stmt
            .query(params_from_iter(params.iter()))
            .map_err(|e| DbError::QueryError(e.to_string()))?;

        while let Some(row) = rows
            .next()
            .map_err(|e| DbError::QueryError(e.to_string()))?
        {
            let col_count = row.as_ref().column_count();
            let values = (0..col_count)
                .map(|i| read_value(row, i))
                .collect::<DbResult<Vec<_>>>()?;
            on_row(Row::new(values))?;
        }
        Ok(())
    }

    fn execute(&mut self, sql: &str, params: &[SqlParam]) -> DbResult<u64> {
        let conn = self.conn()?;
        let affected = conn
            .execute(sql, params_from_iter(params.iter()))
            .map_err(|e| DbError::ExecutionError(e.to_string()))?;
        Ok(affected as u64)
    }

    fn execute_script(&mut self, sql: &str) -> DbResult<()> {
        self.conn()?
            .execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(e.to_string()))
    }

    fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, e)) = conn.close() {
                log::warn!("Error closing DuckDB connection: {}", e);
            }
        }
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }
}

impl Drop for DuckDbSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
