//! sd-core - Core library for sqldeploy
//!
//! This crate provides the script catalog model, catalog loading and
//! validation, the normalized filename key used by the audit tables, and the
//! `sqldeploy.yml` configuration shared by the other sqldeploy crates.

pub mod catalog;
pub mod config;
pub mod error;
pub mod filename;

pub use catalog::{Catalog, ScriptDescriptor, ScriptType};
pub use config::{Config, TargetConfig, TargetEndpoint};
pub use error::{CoreError, CoreResult};
pub use filename::{base_name, normalize_filename};
