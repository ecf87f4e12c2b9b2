use super::*;
use crate::store::ExecutionStatus;
use sd_core::ScriptType;
use sd_db::DuckDbSession;

fn script(filename: &str, onetime: bool) -> ScriptDescriptor {
    ScriptDescriptor {
        script_type: ScriptType::Sql,
        label: "test".to_string(),
        filename: filename.to_string(),
        onetime,
    }
}

fn bootstrapped() -> DuckDbSession {
    let mut db = DuckDbSession::in_memory().unwrap();
    AuditStore::new(&mut db).bootstrap().unwrap();
    db
}

#[test]
fn test_first_seen_registers_and_runs() {
    let mut db = bootstrapped();
    let mut store = AuditStore::new(&mut db);

    let decision = decide(&mut store, &script("scripts/001_init.sql", true)).unwrap();
    match &decision {
        Decision::Run { reason, .. } => assert_eq!(*reason, RunReason::FirstSeen),
        other => panic!("expected run, got {:?}", other),
    }
    assert_eq!(
        store.find_catalog_id("001_INIT.SQL").unwrap().as_deref(),
        Some(decision.catalog_id())
    );
}

#[test]
fn test_one_time_skipped_after_success() {
    let mut db = bootstrapped();
    let mut store = AuditStore::new(&mut db);
    let entry = script("001_init.sql", true);

    let first = decide(&mut store, &entry).unwrap();
    store.record_execution(first.catalog_id(), 3, ExecutionStatus::Success, "");

    let second = decide(&mut store, &entry).unwrap();
    assert_eq!(
        second,
        Decision::Skip {
            catalog_id: first.catalog_id().to_string()
        }
    );
    assert!(!second.should_run());
}

#[test]
fn test_one_time_rerun_until_success() {
    let mut db = bootstrapped();
    let mut store = AuditStore::new(&mut db);
    let entry = script("001_init.sql", true);

    let first = decide(&mut store, &entry).unwrap();
    store.record_execution(first.catalog_id(), 3, ExecutionStatus::Error, "bad");

    let second = decide(&mut store, &entry).unwrap();
    assert!(matches!(
        second,
        Decision::Run {
            reason: RunReason::PendingSuccess,
            ..
        }
    ));
}

#[test]
fn test_repeatable_always_runs() {
    let mut db = bootstrapped();
    let mut store = AuditStore::new(&mut db);
    let entry = script("views.sql", false);

    let first = decide(&mut store, &entry).unwrap();
    store.record_execution(first.catalog_id(), 1, ExecutionStatus::Success, "");

    let second = decide(&mut store, &entry).unwrap();
    assert!(matches!(
        second,
        Decision::Run {
            reason: RunReason::Repeatable,
            ..
        }
    ));
    assert_eq!(second.catalog_id(), first.catalog_id());
}

#[test]
fn test_policy_follows_catalog() {
    let mut db = bootstrapped();
    let mut store = AuditStore::new(&mut db);

    let first = decide(&mut store, &script("seed.sql", false)).unwrap();
    store.record_execution(first.catalog_id(), 1, ExecutionStatus::Success, "");

    // switching to one-time after a success skips from then on
    let second = decide(&mut store, &script("seed.sql", true)).unwrap();
    assert!(!second.should_run());
    assert!(store.find_registration("SEED.SQL").unwrap().unwrap().one_time);

    // and switching back runs again, storing the current value
    let third = decide(&mut store, &script("seed.sql", false)).unwrap();
    assert!(third.should_run());
    assert!(!store.find_registration("SEED.SQL").unwrap().unwrap().one_time);
}

#[test]
fn test_paths_with_same_base_name_share_registration() {
    let mut db = bootstrapped();
    let mut store = AuditStore::new(&mut db);

    let a = decide(&mut store, &script("a/x.sql", false)).unwrap();
    let b = decide(&mut store, &script("B\\X.SQL", false)).unwrap();
    assert_eq!(a.catalog_id(), b.catalog_id());
    assert_eq!(store.script_states().unwrap().len(), 1);
}
