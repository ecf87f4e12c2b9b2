//! Error types for sd-core

use thiserror::Error;

/// Core error type for sqldeploy
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Catalog file not found in any of the searched locations
    #[error("[C001] Catalog file not found (searched: {searched})")]
    CatalogNotFound { searched: String },

    /// C002: Catalog file could not be parsed
    #[error("[C002] Failed to parse catalog {path}: {message}")]
    CatalogParseError { path: String, message: String },

    /// C003: Catalog parsed but failed validation
    #[error("[C003] Invalid catalog: {message}")]
    CatalogInvalid { message: String },

    /// C004: Unknown script type in the catalog
    #[error("[C004] Unknown script type '{value}' (expected SQL or FUNCTION)")]
    UnknownScriptType { value: String },

    /// C005: Config file not found
    #[error("[C005] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C006: Invalid configuration value
    #[error("[C006] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C007: Named target missing from the config
    #[error("[C007] Target '{name}' is not defined in the config (available: {available})")]
    TargetNotFound { name: String, available: String },

    /// C008: IO error with file path context
    #[error("[C008] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// C009: YAML parse error
    #[error("[C009] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
