//! CLI command implementations

pub(crate) mod common;
pub(crate) mod deploy;
pub(crate) mod history;
pub(crate) mod status;
