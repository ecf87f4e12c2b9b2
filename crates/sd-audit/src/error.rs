//! Error types for the audit store.

use sd_db::DbError;
use thiserror::Error;

/// Audit store errors.
#[derive(Error, Debug)]
pub enum AuditError {
    /// An audit table could not be created (A001).
    #[error("[A001] Failed to create audit table {table}: {message}")]
    BootstrapError { table: String, message: String },

    /// No bootstrap script is packaged for the engine (A002).
    #[error("[A002] Bootstrap script not found: {path}")]
    MissingBootstrapScript { path: String },

    /// Registry or execution log query failed (A003).
    #[error("[A003] Audit query failed: {0}")]
    Db(#[from] DbError),

    /// Stored status text is not SUCCESS or ERROR (A004).
    #[error("[A004] Unknown execution status '{0}'")]
    UnknownStatus(String),
}

/// Result type alias for [`AuditError`].
pub type AuditResult<T> = Result<T, AuditError>;
