//! Error types for sd-engine

use sd_audit::AuditError;
use sd_db::DbError;
use thiserror::Error;

/// Errors that abort a whole deployment run.
///
/// Per-script failures are not represented here; they are recorded in the
/// execution log and the run continues.
#[derive(Error, Debug)]
pub enum EngineError {
    /// No session could be opened (G001)
    #[error("[G001] {0}")]
    Connection(#[from] DbError),

    /// The audit tables could not be verified or created (G002)
    #[error("[G002] Audit schema bootstrap failed: {0}")]
    Bootstrap(#[from] AuditError),
}

/// Result type alias for EngineError
pub type EngineResult<T> = Result<T, EngineError>;
