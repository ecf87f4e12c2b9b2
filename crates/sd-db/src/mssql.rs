//! SQL Server session implementation (tiberius on a private runtime)

use crate::dialect::Dialect;
use crate::error::{DbError, DbResult};
use crate::session::{ConnectOptions, Row, Session, SqlParam, SqlValue};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use futures_util::TryStreamExt;
use tiberius::{AuthMethod, Client, ColumnData, Config, FromSql, Query};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

type MssqlClient = Client<Compat<TcpStream>>;

/// SQL Server session.
///
/// Rows are read from the TDS stream as they arrive rather than being
/// buffered per result set.
pub struct MssqlSession {
    runtime: Runtime,
    client: Option<MssqlClient>,
}

impl MssqlSession {
    /// Connect using `sqlserver://` or `jdbc:sqlserver://` endpoints.
    pub fn connect(options: &ConnectOptions) -> DbResult<Self> {
        let endpoint = options.endpoint.trim();
        let jdbc = if endpoint.starts_with("jdbc:") {
            endpoint.to_string()
        } else {
            format!("jdbc:{}", endpoint)
        };
        let mut config =
            Config::from_jdbc_string(&jdbc).map_err(|e| DbError::ConnectionError(e.to_string()))?;
        if !options.user.is_empty() {
            config.authentication(AuthMethod::sql_server(&options.user, &options.password));
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DbError::ConnectionError(format!("failed to start runtime: {e}")))?;

        let timeout = options.login_timeout;
        let client = runtime.block_on(async {
            let connect = async {
                let tcp = TcpStream::connect(config.get_addr())
                    .await
                    .map_err(|e| DbError::ConnectionError(e.to_string()))?;
                tcp.set_nodelay(true).ok();
                Client::connect(config, tcp.compat_write())
                    .await
                    .map_err(|e| DbError::ConnectionError(e.to_string()))
            };
            tokio::time::timeout(timeout, connect)
                .await
                .map_err(|_| DbError::LoginTimeout(timeout.as_secs()))?
        })?;

        Ok(Self {
            runtime,
            client: Some(client),
        })
    }
}

fn build_query<'a>(sql: &'a str, params: &'a [SqlParam]) -> Query<'a> {
    let mut query = Query::new(sql);
    for param in params {
        match param {
            SqlParam::Text(s) => query.bind(s.as_str()),
            SqlParam::Int(i) => query.bind(*i),
            SqlParam::Bool(b) => query.bind(*b),
            SqlParam::Timestamp(ts) => query.bind(*ts),
            SqlParam::Null => query.bind(Option::<&str>::None),
        }
    }
    query
}

fn read_value(column: usize, data: &ColumnData<'static>) -> DbResult<SqlValue> {
    let temporal_err = |e: tiberius::error::Error| DbError::ValueError {
        column,
        message: e.to_string(),
    };
    let value = match data {
        ColumnData::U8(v) => v.map(|v| SqlValue::Int(v.into())),
        ColumnData::I16(v) => v.map(|v| SqlValue::Int(v.into())),
        ColumnData::I32(v) => v.map(|v| SqlValue::Int(v.into())),
        ColumnData::I64(v) => v.map(SqlValue::Int),
        ColumnData::F32(v) => v.map(|v| SqlValue::Float(v.into())),
        ColumnData::F64(v) => v.map(SqlValue::Float),
        ColumnData::Bit(v) => v.map(SqlValue::Bool),
        ColumnData::String(v) => v.as_ref().map(|s| SqlValue::Text(s.to_string())),
        ColumnData::Numeric(v) => v
            .as_ref()
            .map(|n| SqlValue::Float(n.value() as f64 / 10f64.powi(i32::from(n.scale())))),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(data)
                .map_err(temporal_err)?
                .map(SqlValue::Timestamp)
        }
        ColumnData::Date(_) => NaiveDate::from_sql(data)
            .map_err(temporal_err)?
            .map(|d| SqlValue::Timestamp(d.and_time(NaiveTime::MIN))),
        other => Some(SqlValue::Text(format!("{:?}", other))),
    };
    Ok(value.unwrap_or(SqlValue::Null))
}

fn convert_row(row: tiberius::Row) -> DbResult<Row> {
    row.into_iter()
        .enumerate()
        .map(|(i, data)| read_value(i, &data))
        .collect::<DbResult<Vec<_>>>()
        .map(Row::new)
}

/// Split a script into batches on lines consisting of `GO`.
pub(crate) fn split_batches(sql: &str) -> Vec<String> {
    let mut batches = Vec::new();
    let mut current = String::new();
    for line in sql.lines() {
        if line.trim().eq_ignore_ascii_case("go") {
            if !current.trim().is_empty() {
                batches.push(std::mem::take(&mut current));
            }
            current.clear();
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    if !current.trim().is_empty() {
        batches.push(current);
    }
    batches
}

impl Session for MssqlSession {
    fn dialect(&self) -> Dialect {
        Dialect::SqlServer
    }

    fn query_rows(
        &mut self,
        sql: &str,
        params: &[SqlParam],
        on_row: &mut dyn FnMut(Row) -> DbResult<()>,
    ) -> DbResult<()> {
        let Self { runtime, client } = self;
        let client = client.as_mut().ok_or(DbError::ConnectionClosed)?;
        let query_err = |e: tiberius::error::Error| DbError::QueryError(e.to_string());

        runtime.block_on(async {
            let stream = build_query(sql, params)
                .query(client)
                .await
                .map_err(query_err)?;
            let mut rows = stream.into_row_stream();
            while let Some(row) = rows.try_next().await.map_err(query_err)? {
                on_row(convert_row(row)?)?;
            }
            Ok(())
        })
    }

    fn execute(&mut self, sql: &str, params: &[SqlParam]) -> DbResult<u64> {
        let Self { runtime, client } = self;
        let client = client.as_mut().ok_or(DbError::ConnectionClosed)?;
        runtime.block_on(async {
            build_query(sql, params)
                .execute(client)
                .await
                .map(|result| result.total())
                .map_err(|e| DbError::ExecutionError(e.to_string()))
        })
    }

    fn execute_script(&mut self, sql: &str) -> DbResult<()> {
        let Self { runtime, client } = self;
        let client = client.as_mut().ok_or(DbError::ConnectionClosed)?;
        let exec_err = |e: tiberius::error::Error| DbError::ExecutionError(e.to_string());
        runtime.block_on(async {
            for batch in split_batches(sql) {
                client
                    .simple_query(batch)
                    .await
                    .map_err(exec_err)?
                    .into_results()
                    .await
                    .map_err(exec_err)?;
            }
            Ok(())
        })
    }

    fn close(&mut self) {
        if let Some(client) = self.client.take() {
            if let Err(e) = self.runtime.block_on(client.close()) {
                log::warn!("Error closing SQL Server connection: {}", e);
            }
        }
    }

    fn is_open(&self) -> bool {
        self.client.is_some()
    }
}

impl Drop for MssqlSession {
    fn drop(&mut self) {
        self.close();
    }
}
