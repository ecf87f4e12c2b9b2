//! Connection session abstraction.
//!
//! A [`Session`] owns exactly one live connection for the duration of a
//! deployment run. Everything above it (audit store, script runner) is built
//! on the same parameterized-statement path exposed here.

use crate::dialect::{resolve, Dialect};
use crate::duckdb::DuckDbSession;
use crate::error::{DbError, DbResult};
use crate::mssql::MssqlSession;
use crate::postgres::PostgresSession;
use chrono::NaiveDateTime;
use std::fmt;
use std::time::Duration;

/// Rows requested per network round trip by [`Session::query_rows`].
pub const FETCH_SIZE: usize = 100;

/// Default connection-establishment timeout.
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(30);

/// A bound statement parameter.
///
/// `Timestamp` is bound with the driver's timestamp type; every other variant
/// is bound by value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Int(i64),
    Bool(bool),
    Timestamp(NaiveDateTime),
    Null,
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        SqlParam::Text(v.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        SqlParam::Text(v)
    }
}

impl From<&String> for SqlParam {
    fn from(v: &String) -> Self {
        SqlParam::Text(v.clone())
    }
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        SqlParam::Int(v)
    }
}

impl From<bool> for SqlParam {
    fn from(v: bool) -> Self {
        SqlParam::Bool(v)
    }
}

impl From<NaiveDateTime> for SqlParam {
    fn from(v: NaiveDateTime) -> Self {
        SqlParam::Timestamp(v)
    }
}

impl<T: Into<SqlParam>> From<Option<T>> for SqlParam {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlParam::Null, Into::into)
    }
}

/// A column value read back from the database.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "null"),
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::Int(i) => write!(f, "{}", i),
            SqlValue::Float(v) => write!(f, "{}", v),
            SqlValue::Text(s) => write!(f, "{}", s),
            SqlValue::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.3f")),
        }
    }
}

/// One result row, owned.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value at `idx`.
    pub fn get(&self, idx: usize) -> DbResult<&SqlValue> {
        self.values.get(idx).ok_or_else(|| DbError::ValueError {
            column: idx,
            message: format!("row has only {} columns", self.values.len()),
        })
    }

    /// Column as text; numbers and timestamps are rendered.
    pub fn get_string(&self, idx: usize) -> DbResult<Option<String>> {
        Ok(match self.get(idx)? {
            SqlValue::Null => None,
            SqlValue::Text(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
    }

    /// Column as an integer; numeric text is parsed.
    pub fn get_i64(&self, idx: usize) -> DbResult<Option<i64>> {
        match self.get(idx)? {
            SqlValue::Null => Ok(None),
            SqlValue::Int(i) => Ok(Some(*i)),
            SqlValue::Float(v) => Ok(Some(*v as i64)),
            SqlValue::Bool(b) => Ok(Some(i64::from(*b))),
            SqlValue::Text(s) => s.trim().parse().map(Some).map_err(|_| DbError::ValueError {
                column: idx,
                message: format!("'{}' is not an integer", s),
            }),
            SqlValue::Timestamp(_) => Err(DbError::ValueError {
                column: idx,
                message: "timestamp is not an integer".to_string(),
            }),
        }
    }

    /// Column as a timestamp.
    pub fn get_timestamp(&self, idx: usize) -> DbResult<Option<NaiveDateTime>> {
        match self.get(idx)? {
            SqlValue::Null => Ok(None),
            SqlValue::Timestamp(ts) => Ok(Some(*ts)),
            other => Err(DbError::ValueError {
                column: idx,
                message: format!("'{}' is not a timestamp", other),
            }),
        }
    }

    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}

/// One live database connection.
///
/// Sessions are blocking and assume exclusive use by a single caller. All
/// primitives report driver failures as [`DbError`]; none of them swallow
/// errors.
pub trait Session {
    /// Engine this session is connected to.
    fn dialect(&self) -> Dialect;

    /// Stream the rows of a query to `on_row`, fetching at most
    /// [`FETCH_SIZE`] rows per round trip where the driver allows it.
    fn query_rows(
        &mut self,
        sql: &str,
        params: &[SqlParam],
        on_row: &mut dyn FnMut(Row) -> DbResult<()>,
    ) -> DbResult<()>;

    /// Execute a single parameterized statement, returning affected rows.
    fn execute(&mut self, sql: &str, params: &[SqlParam]) -> DbResult<u64>;

    /// Execute a script of one or more statements without parameters.
    fn execute_script(&mut self, sql: &str) -> DbResult<()>;

    /// Release the connection. Idempotent and infallible.
    fn close(&mut self);

    /// Whether `close()` has not been called yet.
    fn is_open(&self) -> bool;

    /// First column of the first row as an integer, or 0 when there is no row.
    fn query_scalar_int(&mut self, sql: &str, params: &[SqlParam]) -> DbResult<i64> {
        Ok(first_row(self, sql, params)?
            .map(|row| row.get_i64(0))
            .transpose()?
            .flatten()
            .unwrap_or(0))
    }

    /// First column of the first row as text, or `None` when there is no row.
    fn query_scalar_string(&mut self, sql: &str, params: &[SqlParam]) -> DbResult<Option<String>> {
        Ok(first_row(self, sql, params)?
            .map(|row| row.get_string(0))
            .transpose()?
            .flatten())
    }
}

fn first_row<S: Session + ?Sized>(
    session: &mut S,
    sql: &str,
    params: &[SqlParam],
) -> DbResult<Option<Row>> {
    let mut first = None;
    session.query_rows(sql, params, &mut |row| {
        if first.is_none() {
            first = Some(row);
        }
        Ok(())
    })?;
    Ok(first)
}

/// Run a query and map every row through `mapper`.
pub fn query_map<S, T, F>(
    session: &mut S,
    sql: &str,
    params: &[SqlParam],
    mut mapper: F,
) -> DbResult<Vec<T>>
where
    S: Session + ?Sized,
    F: FnMut(&Row) -> DbResult<T>,
{
    let mut out = Vec::new();
    session.query_rows(sql, params, &mut |row| {
        out.push(mapper(&row)?);
        Ok(())
    })?;
    Ok(out)
}

/// Everything needed to open a session.
#[derive(Clone)]
pub struct ConnectOptions {
    pub endpoint: String,
    pub user: String,
    pub password: String,
    pub login_timeout: Duration,
}

impl ConnectOptions {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            user: String::new(),
            password: String::new(),
            login_timeout: DEFAULT_LOGIN_TIMEOUT,
        }
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    pub fn with_login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }
}

impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("endpoint", &self.endpoint)
            .field("user", &self.user)
            .field("login_timeout", &self.login_timeout)
            .finish_non_exhaustive()
    }
}

/// Opens sessions for an endpoint.
///
/// Passed explicitly to the deployer so tests and embedders can substitute
/// their own connections.
pub trait SessionFactory {
    fn open(&self, options: &ConnectOptions) -> DbResult<Box<dyn Session>>;
}

/// Factory that picks the backend from the endpoint's dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverSessionFactory;

impl SessionFactory for DriverSessionFactory {
    fn open(&self, options: &ConnectOptions) -> DbResult<Box<dyn Session>> {
        let info = resolve(&options.endpoint)?;
        log::debug!(
            "Getting connection to {} --> user: [{}], timeout: [{}s], driver: [{}]",
            info.display_name,
            options.user,
            options.login_timeout.as_secs(),
            info.driver
        );
        Ok(match info.dialect {
            Dialect::Postgres => Box::new(PostgresSession::connect(options)?),
            Dialect::SqlServer => Box::new(MssqlSession::connect(options)?),
            Dialect::DuckDb => Box::new(DuckDbSession::connect(&options.endpoint)?),
        })
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
