//! Filename keys for the audit tables.
//!
//! Scripts are identified in the registry by their base name, upper-cased,
//! so `dir\A.sql`, `dir/A.sql` and `A.SQL` all refer to the same row.

/// Strip any directory components (either separator style) from `path`.
pub fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Normalize a catalog filename into the registry lookup key.
///
/// Idempotent: `normalize_filename(&normalize_filename(x)) == normalize_filename(x)`.
pub fn normalize_filename(path: &str) -> String {
    base_name(path.trim()).to_uppercase()
}

#[cfg(test)]
#[path = "filename_test.rs"]
mod tests;
