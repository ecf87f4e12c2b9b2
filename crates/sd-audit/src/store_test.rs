use super::*;
use sd_db::DuckDbSession;

fn bootstrapped() -> DuckDbSession {
    let mut db = DuckDbSession::in_memory().unwrap();
    AuditStore::new(&mut db).bootstrap().unwrap();
    db
}

#[test]
fn test_bootstrap_creates_both_tables_once() {
    let mut db = DuckDbSession::in_memory().unwrap();
    let mut store = AuditStore::new(&mut db);

    assert_eq!(store.table_presence(REGISTRY_TABLE), TablePresence::Missing);

    let first = store.bootstrap().unwrap();
    assert_eq!(first.created, vec![REGISTRY_TABLE, EXECUTION_TABLE]);
    assert_eq!(store.table_presence(REGISTRY_TABLE), TablePresence::Exists);
    assert_eq!(store.table_presence(EXECUTION_TABLE), TablePresence::Exists);

    let second = store.bootstrap().unwrap();
    assert!(second.is_noop());
}

#[test]
fn test_bootstrap_creates_only_missing_table() {
    let mut db = bootstrapped();
    db.execute_script("DROP TABLE catalog_script_sql_execution")
        .unwrap();

    let report = AuditStore::new(&mut db).bootstrap().unwrap();
    assert_eq!(report.created, vec![EXECUTION_TABLE]);
}

#[test]
fn test_table_presence_is_case_insensitive() {
    let mut db = bootstrapped();
    let mut store = AuditStore::new(&mut db);
    assert_eq!(
        store.table_presence("catalog_script_sql"),
        TablePresence::Exists
    );
    assert_eq!(store.table_presence("NO_SUCH_TABLE"), TablePresence::Missing);
}

#[test]
fn test_every_dialect_has_bootstrap_scripts() {
    for dialect in Dialect::all() {
        let info = dialect.info();
        for script in [REGISTRY_SCRIPT, EXECUTION_SCRIPT] {
            let path = format!("{}{}", info.schema_path, script);
            assert!(bootstrap_script(&path).is_some(), "missing {}", path);
        }
    }
}

#[test]
fn test_register_and_find() {
    let mut db = bootstrapped();
    let mut store = AuditStore::new(&mut db);

    assert_eq!(store.find_catalog_id("001_TABLES.SQL").unwrap(), None);

    let id = store
        .register_new(ScriptType::Sql, "Tables", "001_TABLES.SQL", true)
        .unwrap();
    let registration = store.find_registration("001_TABLES.SQL").unwrap().unwrap();
    assert_eq!(registration.catalog_id, id);
    assert!(registration.one_time);
    assert_eq!(store.find_catalog_id("001_tables.sql").unwrap(), Some(id));
}

#[test]
fn test_store_normalizes_filename_keys() {
    let mut db = bootstrapped();
    let mut store = AuditStore::new(&mut db);

    let id = store
        .register_new(ScriptType::Sql, "", r"dir\A.sql", true)
        .unwrap();
    assert_eq!(store.find_catalog_id("A.SQL").unwrap(), Some(id.clone()));
    assert_eq!(store.find_catalog_id("dir/A.sql").unwrap(), Some(id.clone()));
    assert_eq!(store.script_states().unwrap()[0].filename, "A.SQL");

    assert_eq!(store.update_policy("other/a.sql", false).unwrap(), 1);
    assert!(!store.find_registration("A.SQL").unwrap().unwrap().one_time);

    store.record_execution(&id, 3, ExecutionStatus::Success, "");
    assert!(store.has_successful_execution(r"x\a.SQL").unwrap());
    assert_eq!(store.list_executions(Some("dir/a.sql"), 10).unwrap().len(), 1);
}

#[test]
fn test_catalog_id_format() {
    let id = new_catalog_id();
    let (millis, uuid) = id.split_once('_').unwrap();
    assert!(millis.parse::<i64>().unwrap() > 0);
    assert!(Uuid::parse_str(uuid).is_ok());
    assert_ne!(new_catalog_id(), id);
}

#[test]
fn test_update_policy() {
    let mut db = bootstrapped();
    let mut store = AuditStore::new(&mut db);
    store
        .register_new(ScriptType::Function, "Fn", "FN_TOTALS.SQL", false)
        .unwrap();

    assert_eq!(store.update_policy("FN_TOTALS.SQL", true).unwrap(), 1);
    assert!(store.find_registration("FN_TOTALS.SQL").unwrap().unwrap().one_time);

    store.update_policy("FN_TOTALS.SQL", false).unwrap();
    assert!(!store.find_registration("FN_TOTALS.SQL").unwrap().unwrap().one_time);

    assert_eq!(store.update_policy("UNKNOWN.SQL", true).unwrap(), 0);
}

#[test]
fn test_execution_queries() {
    let mut db = bootstrapped();
    let mut store = AuditStore::new(&mut db);
    let id = store
        .register_new(ScriptType::Sql, "Seed", "SEED.SQL", true)
        .unwrap();

    assert!(!store.has_any_execution("SEED.SQL").unwrap());
    assert!(!store.has_successful_execution("SEED.SQL").unwrap());

    assert!(store.record_execution(&id, 12, ExecutionStatus::Error, "syntax error"));
    assert!(store.has_any_execution("SEED.SQL").unwrap());
    assert!(!store.has_successful_execution("SEED.SQL").unwrap());

    assert!(store.record_execution(&id, 5, ExecutionStatus::Success, ""));
    assert!(store.has_successful_execution("SEED.SQL").unwrap());
}

#[test]
fn test_record_execution_failure_is_not_propagated() {
    let mut db = bootstrapped();
    db.execute_script("DROP TABLE catalog_script_sql_execution")
        .unwrap();

    let mut store = AuditStore::new(&mut db);
    assert!(!store.record_execution("1_x", 1, ExecutionStatus::Success, ""));
}

#[test]
fn test_list_executions_with_filter_and_limit() {
    let mut db = bootstrapped();
    let mut store = AuditStore::new(&mut db);
    let a = store
        .register_new(ScriptType::Sql, "A", "A.SQL", false)
        .unwrap();
    let b = store
        .register_new(ScriptType::Sql, "B", "B.SQL", false)
        .unwrap();
    for _ in 0..3 {
        store.record_execution(&a, 1, ExecutionStatus::Success, "");
    }
    store.record_execution(&b, 2, ExecutionStatus::Error, "boom");

    assert_eq!(store.list_executions(None, 100).unwrap().len(), 4);
    assert_eq!(store.list_executions(None, 2).unwrap().len(), 2);
    assert_eq!(store.list_executions(None, usize::MAX).unwrap().len(), 4);
    assert!(store.list_executions(None, 0).unwrap().is_empty());
    assert_eq!(store.list_executions(Some("A.SQL"), 2).unwrap().len(), 2);

    let only_b = store.list_executions(Some("B.SQL"), 100).unwrap();
    assert_eq!(only_b.len(), 1);
    assert_eq!(only_b[0].status, ExecutionStatus::Error);
    assert_eq!(only_b[0].exit_message.as_deref(), Some("boom"));
    assert_eq!(only_b[0].label.as_deref(), Some("B"));
    assert_eq!(only_b[0].milliseconds, 2);
    assert!(only_b[0].execution_date.is_some());
}

#[test]
fn test_script_states() {
    let mut db = bootstrapped();
    let mut store = AuditStore::new(&mut db);
    let a = store
        .register_new(ScriptType::Sql, "A", "A.SQL", true)
        .unwrap();
    store
        .register_new(ScriptType::Function, "B", "B.SQL", false)
        .unwrap();
    store.record_execution(&a, 1, ExecutionStatus::Error, "e");
    store.record_execution(&a, 1, ExecutionStatus::Success, "");

    let states = store.script_states().unwrap();
    assert_eq!(states.len(), 2);

    assert_eq!(states[0].filename, "A.SQL");
    assert_eq!(states[0].attempts, 2);
    assert_eq!(states[0].successes, 1);
    assert!(states[0].last_run.is_some());
    assert!(states[0].is_settled());

    assert_eq!(states[1].filename, "B.SQL");
    assert_eq!(states[1].object_type, "FUNCTION");
    assert_eq!(states[1].attempts, 0);
    assert_eq!(states[1].last_run, None);
    assert!(!states[1].is_settled());
}

#[test]
fn test_status_parsing() {
    assert_eq!(
        "SUCCESS".parse::<ExecutionStatus>().unwrap(),
        ExecutionStatus::Success
    );
    assert_eq!(
        "ERROR".parse::<ExecutionStatus>().unwrap(),
        ExecutionStatus::Error
    );
    assert!(matches!(
        "DONE".parse::<ExecutionStatus>(),
        Err(AuditError::UnknownStatus(_))
    ));
}
