//! sd-db - Database layer for sqldeploy
//!
//! This crate maps connection endpoints to a supported engine, and provides
//! the blocking [`Session`] abstraction with implementations for DuckDB,
//! PostgreSQL (tokio-postgres) and SQL Server (tiberius).

pub mod dialect;
pub mod duckdb;
pub mod error;
pub mod mssql;
pub mod postgres;
pub mod session;

pub use dialect::{resolve, Dialect, DialectInfo};
pub use duckdb::DuckDbSession;
pub use error::{DbError, DbResult};
pub use mssql::MssqlSession;
pub use postgres::PostgresSession;
pub use session::{
    query_map, ConnectOptions, DriverSessionFactory, Row, Session, SessionFactory, SqlParam,
    SqlValue, FETCH_SIZE,
};
