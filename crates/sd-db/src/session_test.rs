use super::*;
use chrono::NaiveDate;

#[test]
fn test_param_conversions() {
    assert_eq!(SqlParam::from("a"), SqlParam::Text("a".to_string()));
    assert_eq!(SqlParam::from(7_i64), SqlParam::Int(7));
    assert_eq!(SqlParam::from(true), SqlParam::Bool(true));
    assert_eq!(SqlParam::from(None::<String>), SqlParam::Null);
    assert_eq!(
        SqlParam::from(Some("x".to_string())),
        SqlParam::Text("x".to_string())
    );
}

#[test]
fn test_row_getters() {
    let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let row = Row::new(vec![
        SqlValue::Int(42),
        SqlValue::Text(" 17 ".to_string()),
        SqlValue::Null,
        SqlValue::Timestamp(ts),
    ]);
    assert_eq!(row.get_i64(0).unwrap(), Some(42));
    assert_eq!(row.get_i64(1).unwrap(), Some(17));
    assert_eq!(row.get_i64(2).unwrap(), None);
    assert_eq!(row.get_string(0).unwrap().as_deref(), Some("42"));
    assert_eq!(row.get_timestamp(3).unwrap(), Some(ts));
    assert!(row.get_timestamp(0).is_err());
    assert!(row.get(4).is_err());
}

#[test]
fn test_row_rejects_non_numeric_text() {
    let row = Row::new(vec![SqlValue::Text("abc".to_string())]);
    assert!(matches!(
        row.get_i64(0).unwrap_err(),
        DbError::ValueError { column: 0, .. }
    ));
}

#[test]
fn test_factory_opens_duckdb() {
    let session = DriverSessionFactory
        .open(&ConnectOptions::new("duckdb::memory:"))
        .unwrap();
    assert_eq!(session.dialect(), Dialect::DuckDb);
    assert!(session.is_open());
}

#[test]
fn test_factory_rejects_unsupported_endpoint() {
    let err = DriverSessionFactory
        .open(&ConnectOptions::new("jdbc:oracle:thin:@db:1521:XE"))
        .err()
        .unwrap();
    assert!(matches!(err, DbError::UnsupportedDialect { .. }));
}

#[test]
fn test_scalar_helpers_on_trait_object() {
    let mut session = DriverSessionFactory
        .open(&ConnectOptions::new("duckdb::memory:"))
        .unwrap();
    assert_eq!(session.query_scalar_int("SELECT 41 + 1", &[]).unwrap(), 42);
    assert_eq!(
        session
            .query_scalar_string("SELECT 'x' || ?", &["y".into()])
            .unwrap()
            .as_deref(),
        Some("xy")
    );
    let doubled = query_map(
        session.as_mut(),
        "SELECT n * 2 FROM range(3) t(n) ORDER BY n",
        &[],
        |row| row.get_i64(0),
    )
    .unwrap();
    assert_eq!(doubled, vec![Some(0), Some(2), Some(4)]);
}

#[test]
fn test_connect_options_debug_hides_password() {
    let options = ConnectOptions::new("duckdb::memory:").with_credentials("u", "hunter2");
    assert!(!format!("{options:?}").contains("hunter2"));
    assert_eq!(options.login_timeout, DEFAULT_LOGIN_TIMEOUT);
}
