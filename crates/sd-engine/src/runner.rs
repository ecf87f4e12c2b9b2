//! Script execution.
//!
//! SQL scripts are sent to the session as written. FUNCTION scripts are
//! authored with `$BODY$` around the routine body and converted to the
//! target's string-literal quoting before they are sent as one statement.

use sd_core::ScriptType;
use sd_db::{DbError, Session};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Sentinel replaced by a single quote in FUNCTION scripts.
pub const BODY_DELIMITER: &str = "$BODY$";

/// A script that could not be run.
#[derive(Error, Debug)]
pub enum ScriptError {
    /// The script file could not be read (G101)
    #[error("[G101] Failed to read script {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The database rejected the script (G102)
    #[error("[G102] Script {path} failed: {source}")]
    Execution {
        path: PathBuf,
        #[source]
        source: DbError,
    },
}

impl ScriptError {
    /// Text stored as the execution's exit message.
    pub fn cause_message(&self) -> String {
        match self {
            ScriptError::Read { source, .. } => source.to_string(),
            ScriptError::Execution { source, .. } => source.driver_message(),
        }
    }
}

/// Quote a FUNCTION script for execution: double every `'`, then turn every
/// [`BODY_DELIMITER`] into `'`.
pub fn prepare_function_body(source: &str) -> String {
    source.replace('\'', "''").replace(BODY_DELIMITER, "'")
}

/// Runs script files relative to a base directory.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    base_dir: PathBuf,
}

impl ScriptRunner {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Absolute filenames are used as-is; relative ones join the base directory.
    pub fn resolve(&self, filename: &str) -> PathBuf {
        let path = Path::new(filename.trim());
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Execute one script.
    pub fn run(
        &self,
        session: &mut dyn Session,
        script_type: ScriptType,
        filename: &str,
    ) -> Result<(), ScriptError> {
        let path = self.resolve(filename);
        let read_error = |source| ScriptError::Read {
            path: path.clone(),
            source,
        };

        let result = match script_type {
            ScriptType::Sql => {
                let sql = std::fs::read_to_string(&path).map_err(read_error)?;
                session.execute_script(&sql)
            }
            ScriptType::Function => {
                let body = read_lines(&path).map_err(read_error)?;
                session.execute(&prepare_function_body(&body), &[]).map(|_| ())
            }
        };

        result.map_err(|source| ScriptError::Execution { path, source })
    }
}

/// Read a file line by line, terminating every line with `\n`.
fn read_lines(path: &Path) -> io::Result<String> {
    let reader = BufReader::new(File::open(path)?);
    let mut body = String::new();
    for line in reader.lines() {
        body.push_str(&line?);
        body.push('\n');
    }
    Ok(body)
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
