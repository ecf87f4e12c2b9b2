//! Per-script run decision.
//!
//! A script never seen before is registered and run. A known script has its
//! stored one-time policy replaced by the catalog's current value, then runs
//! unless it is one-time and already has a successful execution.

use crate::error::AuditResult;
use crate::store::AuditStore;
use sd_core::ScriptDescriptor;

/// Why a script is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunReason {
    /// No registry row existed; one was just created
    FirstSeen,
    /// Registered and not one-time
    Repeatable,
    /// One-time with no successful execution yet
    PendingSuccess,
}

/// What to do with one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Run { catalog_id: String, reason: RunReason },
    Skip { catalog_id: String },
}

impl Decision {
    pub fn catalog_id(&self) -> &str {
        match self {
            Decision::Run { catalog_id, .. } | Decision::Skip { catalog_id } => catalog_id,
        }
    }

    pub fn should_run(&self) -> bool {
        matches!(self, Decision::Run { .. })
    }
}

/// Decide whether `script` runs, registering it when first seen.
pub fn decide(store: &mut AuditStore<'_>, script: &ScriptDescriptor) -> AuditResult<Decision> {
    let key = script.key();

    let Some(registration) = store.find_registration(&key)? else {
        let catalog_id =
            store.register_new(script.script_type, &script.label, &key, script.onetime)?;
        return Ok(Decision::Run {
            catalog_id,
            reason: RunReason::FirstSeen,
        });
    };

    if registration.one_time != script.onetime {
        log::info!(
            "one-time policy of {} changed from {} to {}",
            key,
            registration.one_time,
            script.onetime
        );
    }
    store.update_policy(&key, script.onetime)?;

    let catalog_id = registration.catalog_id;
    if !script.onetime {
        return Ok(Decision::Run {
            catalog_id,
            reason: RunReason::Repeatable,
        });
    }
    if store.has_successful_execution(&key)? {
        Ok(Decision::Skip { catalog_id })
    } else {
        Ok(Decision::Run {
            catalog_id,
            reason: RunReason::PendingSuccess,
        })
    }
}

#[cfg(test)]
#[path = "decision_test.rs"]
mod tests;
