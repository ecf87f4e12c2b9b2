//! sd-engine - Deployment engine for sqldeploy
//!
//! [`ScriptRunner`] executes one script file against a session.
//! [`Deployer`] drives a whole catalog: connect, bootstrap the audit tables,
//! decide and run each script in order, record every attempt, disconnect.

pub mod error;
pub mod orchestrator;
pub mod runner;

pub use error::{EngineError, EngineResult};
pub use orchestrator::{Deployer, RunSummary};
pub use runner::{prepare_function_body, ScriptError, ScriptRunner, BODY_DELIMITER};
