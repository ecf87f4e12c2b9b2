//! Script catalog: the ordered list of scripts deployed to one database.
//!
//! Catalogs are YAML documents:
//!
//! ```yaml
//! database:
//!   label: billing
//!   scripts:
//!     - filename: scripts/001_tables.sql
//!       type: SQL
//!       label: Base tables
//!       onetime: true
//!     - filename: scripts/fn_totals.sql
//!       type: FUNCTION
//!       label: Totals function
//! ```

use crate::error::{CoreError, CoreResult};
use crate::filename::normalize_filename;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Locations searched, in order, after the explicitly requested path.
const CATALOG_FALLBACKS: &[&str] = &["catalog.yml", "./catalog.yml", "../catalog.yml"];

/// Kind of script body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScriptType {
    /// Plain SQL, executed as written
    #[default]
    Sql,
    /// Function or procedure body using `$BODY$` delimiters
    Function,
}

impl ScriptType {
    /// Value persisted in `catalog_script_sql.object_type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptType::Sql => "SQL",
            ScriptType::Function => "FUNCTION",
        }
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScriptType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SQL" => Ok(ScriptType::Sql),
            "FUNCTION" => Ok(ScriptType::Function),
            _ => Err(CoreError::UnknownScriptType {
                value: s.to_string(),
            }),
        }
    }
}

impl Serialize for ScriptType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ScriptType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One entry of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptDescriptor {
    /// Script kind
    #[serde(rename = "type", default)]
    pub script_type: ScriptType,

    /// Free-text name shown in logs and stored in the registry
    #[serde(default)]
    pub label: String,

    /// Path to the script body, relative to the catalog directory
    pub filename: String,

    /// Run until the first success, then never again
    #[serde(default)]
    pub onetime: bool,
}

impl ScriptDescriptor {
    /// Registry lookup key for this script.
    pub fn key(&self) -> String {
        normalize_filename(&self.filename)
    }
}

/// Target database section of the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatabaseSection {
    label: String,
    #[serde(default)]
    scripts: Vec<ScriptDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    database: DatabaseSection,
}

/// A loaded and validated catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    /// Name of the target database/environment
    pub label: String,

    /// Scripts in declared execution order
    pub scripts: Vec<ScriptDescriptor>,

    /// Directory that relative script filenames resolve against
    pub base_dir: PathBuf,
}

impl Catalog {
    /// Build a catalog in memory (no validation of script files on disk).
    pub fn new(label: impl Into<String>, scripts: Vec<ScriptDescriptor>) -> Self {
        Self {
            label: label.into(),
            scripts,
            base_dir: PathBuf::from("."),
        }
    }

    /// Set the directory relative script paths resolve against.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// Parse a catalog from YAML text.
    pub fn from_yaml(content: &str, origin: &Path) -> CoreResult<Self> {
        let file: CatalogFile =
            serde_yaml::from_str(content).map_err(|e| CoreError::CatalogParseError {
                path: origin.display().to_string(),
                message: e.to_string(),
            })?;

        let base_dir = origin
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let catalog = Self {
            label: file.database.label,
            scripts: file.database.scripts,
            base_dir,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog from `path`, falling back to the default locations.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let resolved = locate(path)?;
        let content = std::fs::read_to_string(&resolved).map_err(|e| CoreError::IoWithPath {
            path: resolved.display().to_string(),
            source: e,
        })?;
        let catalog = Self::from_yaml(&content, &resolved)?;
        log::debug!(
            "catalog loaded successfully with path: {}",
            resolved.display()
        );
        Ok(catalog)
    }

    /// Check catalog-level invariants.
    pub fn validate(&self) -> CoreResult<()> {
        if self.label.trim().is_empty() {
            return Err(CoreError::CatalogInvalid {
                message: "database label must not be empty".to_string(),
            });
        }
        for (idx, script) in self.scripts.iter().enumerate() {
            if script.filename.trim().is_empty() {
                return Err(CoreError::CatalogInvalid {
                    message: format!("script #{} has an empty filename", idx + 1),
                });
            }
            if script.key().is_empty() {
                return Err(CoreError::CatalogInvalid {
                    message: format!(
                        "script #{} filename '{}' has no file name component",
                        idx + 1,
                        script.filename
                    ),
                });
            }
        }
        Ok(())
    }

    /// Number of scripts in the catalog.
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    /// Whether the catalog declares no scripts.
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

/// Find the catalog file: the requested path first, then the fallbacks.
fn locate(path: &Path) -> CoreResult<PathBuf> {
    let mut searched = vec![path.display().to_string()];
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    for candidate in CATALOG_FALLBACKS {
        let candidate = Path::new(candidate);
        if candidate.is_file() {
            return Ok(candidate.to_path_buf());
        }
        searched.push(candidate.display().to_string());
    }
    Err(CoreError::CatalogNotFound {
        searched: searched.join(", "),
    })
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
