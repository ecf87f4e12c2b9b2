//! Error types for sd-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Login timeout (D002)
    #[error("[D002] Login timeout: no connection after {0}s")]
    LoginTimeout(u64),

    /// Query error (D003)
    #[error("[D003] Query failed: {0}")]
    QueryError(String),

    /// Statement execution error (D004)
    #[error("[D004] SQL execution failed: {0}")]
    ExecutionError(String),

    /// No supported engine matches the endpoint (D005)
    #[error("[D005] Cannot determine driver for url '{endpoint}'. Supported database types: {supported}")]
    UnsupportedDialect { endpoint: String, supported: String },

    /// Session used after `close()` (D006)
    #[error("[D006] Database session is closed")]
    ConnectionClosed,

    /// Column value could not be converted (D007)
    #[error("[D007] Unexpected value in column {column}: {message}")]
    ValueError { column: usize, message: String },
}

impl DbError {
    /// The underlying driver message, without the error code prefix.
    pub fn driver_message(&self) -> String {
        match self {
            DbError::ConnectionError(msg)
            | DbError::QueryError(msg)
            | DbError::ExecutionError(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;
