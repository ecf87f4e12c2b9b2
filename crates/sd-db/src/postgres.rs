//! PostgreSQL session implementation (tokio-postgres on a private runtime)

use crate::dialect::Dialect;
use crate::error::{DbError, DbResult};
use crate::session::{ConnectOptions, Row, Session, SqlParam, SqlValue, FETCH_SIZE};
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::error::Error;
use std::str::FromStr;
use tokio::runtime::Runtime;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use tokio_postgres::{Client, Config as PgConfig, NoTls};

/// PostgreSQL session.
///
/// The driver is async; the session owns a current-thread runtime and blocks
/// on every call, which also drives the background connection task.
pub struct PostgresSession {
    runtime: Runtime,
    client: Option<Client>,
}

impl PostgresSession {
    /// Connect using `postgresql://`, `postgres://` or `jdbc:postgresql://` endpoints.
    pub fn connect(options: &ConnectOptions) -> DbResult<Self> {
        let url = options
            .endpoint
            .trim()
            .strip_prefix("jdbc:")
            .unwrap_or(options.endpoint.trim());
        let mut config =
            PgConfig::from_str(url).map_err(|e| DbError::ConnectionError(e.to_string()))?;
        if !options.user.is_empty() {
            config.user(&options.user);
        }
        if !options.password.is_empty() {
            config.password(&options.password);
        }
        config.connect_timeout(options.login_timeout);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DbError::ConnectionError(format!("failed to start runtime: {e}")))?;

        let timeout = options.login_timeout;
        let client = runtime.block_on(async {
            let (client, connection) = tokio::time::timeout(timeout, config.connect(NoTls))
                .await
                .map_err(|_| DbError::LoginTimeout(timeout.as_secs()))?
                .map_err(|e| DbError::ConnectionError(e.to_string()))?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    log::error!("PostgreSQL connection error: {}", e);
                }
            });
            Ok::<_, DbError>(client)
        })?;

        Ok(Self {
            runtime,
            client: Some(client),
        })
    }
}

impl ToSql for SqlParam {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            SqlParam::Text(s) => s.to_sql_checked(ty, out),
            SqlParam::Int(i) => match ty.name() {
                "int2" => i16::try_from(*i)?.to_sql_checked(ty, out),
                "int4" => i32::try_from(*i)?.to_sql_checked(ty, out),
                _ => i.to_sql_checked(ty, out),
            },
            SqlParam::Bool(b) => b.to_sql_checked(ty, out),
            SqlParam::Timestamp(ts) => match ty.name() {
                "timestamptz" => ts.and_utc().to_sql_checked(ty, out),
                _ => ts.to_sql_checked(ty, out),
            },
            SqlParam::Null => Ok(IsNull::Yes),
        }
    }

    // Each variant checks the concrete column type in `to_sql`.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn params_ref(params: &[SqlParam]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

fn read_value(row: &tokio_postgres::Row, idx: usize) -> DbResult<SqlValue> {
    let err = |e: tokio_postgres::Error| DbError::ValueError {
        column: idx,
        message: e.to_string(),
    };
    let value = match row.columns()[idx].type_().name() {
        "bool" => row.try_get::<_, Option<bool>>(idx).map_err(err)?.map(SqlValue::Bool),
        "int2" => row
            .try_get::<_, Option<i16>>(idx)
            .map_err(err)?
            .map(|v| SqlValue::Int(v.into())),
        "int4" => row
            .try_get::<_, Option<i32>>(idx)
            .map_err(err)?
            .map(|v| SqlValue::Int(v.into())),
        "int8" => row.try_get::<_, Option<i64>>(idx).map_err(err)?.map(SqlValue::Int),
        "float4" => row
            .try_get::<_, Option<f32>>(idx)
            .map_err(err)?
            .map(|v| SqlValue::Float(v.into())),
        "float8" => row.try_get::<_, Option<f64>>(idx).map_err(err)?.map(SqlValue::Float),
        "timestamp" => row
            .try_get::<_, Option<NaiveDateTime>>(idx)
            .map_err(err)?
            .map(SqlValue::Timestamp),
        "timestamptz" => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)
            .map_err(err)?
            .map(|v| SqlValue::Timestamp(v.naive_utc())),
        "date" => row
            .try_get::<_, Option<NaiveDate>>(idx)
            .map_err(err)?
            .map(|d| SqlValue::Timestamp(d.and_time(NaiveTime::MIN))),
        _ => row.try_get::<_, Option<String>>(idx).map_err(err)?.map(SqlValue::Text),
    };
    Ok(value.unwrap_or(SqlValue::Null))
}

fn convert_row(row: &tokio_postgres::Row) -> DbResult<Row> {
    (0..row.len())
        .map(|i| read_value(row, i))
        .collect::<DbResult<Vec<_>>>()
        .map(Row::new)
}

/// Split a script on `;`, ignoring semicolons inside quoted strings,
/// quoted identifiers, dollar-quoted bodies and comments.
pub(crate) fn split_statements(sql: &str) -> Vec<&str> {
    let bytes = sql.as_bytes();
    let mut statements = Vec::new();
    let mut start = 0;
    let mut i = 0;

    // Byte offset just past the first `pat` at or after `from`, or the end.
    let skip_past = |from: usize, pat: &str| {
        sql.get(from..)
            .and_then(|rest| rest.find(pat))
            .map_or(sql.len(), |pos| from + pos + pat.len())
    };

    while i < bytes.len() {
        i = match bytes[i] {
            b'\'' => skip_past(i + 1, "'"),
            b'"' => skip_past(i + 1, "\""),
            b'-' if bytes.get(i + 1) == Some(&b'-') => skip_past(i + 2, "\n"),
            b'/' if bytes.get(i + 1) == Some(&b'*') => skip_past(i + 2, "*/"),
            b'$' => match dollar_tag(&sql[i..]) {
                Some(tag) => skip_past(i + tag.len(), tag),
                None => i + 1,
            },
            b';' => {
                let statement = sql[start..i].trim();
                if !statement.is_empty() {
                    statements.push(statement);
                }
                start = i + 1;
                i + 1
            }
            _ => i + 1,
        };
    }

    let tail = sql.get(start..).unwrap_or("").trim();
    if !tail.is_empty() {
        statements.push(tail);
    }
    statements
}

/// The `$tag$` opening a dollar-quoted string at the start of `s`, if any.
/// `$1` style parameters are not tags.
fn dollar_tag(s: &str) -> Option<&str> {
    let rest = s.get(1..)?;
    let end = rest.find('$')?;
    let tag = &rest[..end];
    let valid = tag.chars().next().map_or(true, |c| c.is_alphabetic() || c == '_')
        && tag.chars().all(|c| c.is_alphanumeric() || c == '_');
    valid.then(|| &s[..end + 2])
}

impl Session for PostgresSession {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn query_rows(
        &mut self,
        sql: &str,
        params: &[SqlParam],
        on_row: &mut dyn FnMut(Row) -> DbResult<()>,
    ) -> DbResult<()> {
        let Self { runtime, client } = self;
        let client = client.as_mut().ok_or(DbError::ConnectionClosed)?;
        let params = params_ref(params);
        let query_err = |e: tokio_postgres::Error| DbError::QueryError(e.to_string());

        // Portals only live inside a transaction; fetch FETCH_SIZE rows at a time.
        runtime.block_on(async {
            let tx = client.transaction().await.map_err(query_err)?;
            let portal = tx.bind(sql, &params).await.map_err(query_err)?;
            loop {
                let batch = tx
                    .query_portal(&portal, FETCH_SIZE as i32)
                    .await
                    .map_err(query_err)?;
                let fetched = batch.len();
                for row in &batch {
                    on_row(convert_row(row)?)?;
                }
                if fetched < FETCH_SIZE {
                    break;
                }
            }
            tx.commit().await.map_err(query_err)
        })
    }

    fn execute(&mut self, sql: &str, params: &[SqlParam]) -> DbResult<u64> {
        let Self { runtime, client } = self;
        let client = client.as_mut().ok_or(DbError::ConnectionClosed)?;
        let params = params_ref(params);
        runtime
            .block_on(client.execute(sql, &params))
            .map_err(|e| DbError::ExecutionError(e.to_string()))
    }

    /// Statements are sent one at a time so each commits on its own, which
    /// also lets `CREATE INDEX CONCURRENTLY` and `VACUUM` run from a script.
    fn execute_script(&mut self, sql: &str) -> DbResult<()> {
        let Self { runtime, client } = self;
        let client = client.as_mut().ok_or(DbError::ConnectionClosed)?;
        runtime.block_on(async {
            for statement in split_statements(sql) {
                client
                    .batch_execute(statement)
                    .await
                    .map_err(|e| DbError::ExecutionError(e.to_string()))?;
            }
            Ok(())
        })
    }

    fn close(&mut self) {
        // Dropping the client ends the background connection task.
        self.client.take();
    }

    fn is_open(&self) -> bool {
        self.client.is_some()
    }
}

impl Drop for PostgresSession {
    fn drop(&mut self) {
        self.close();
    }
}
