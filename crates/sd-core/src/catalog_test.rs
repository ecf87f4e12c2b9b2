use super::*;

const SAMPLE: &str = r#"
database:
  label: billing
  scripts:
    - filename: scripts/001_tables.sql
      type: SQL
      label: Base tables
      onetime: true
    - filename: scripts\fn_totals.sql
      type: function
      label: Totals function
    - filename: 002_seed.sql
"#;

#[test]
fn test_parse_catalog_preserves_order() {
    let catalog = Catalog::from_yaml(SAMPLE, Path::new("deploy/catalog.yml")).unwrap();
    assert_eq!(catalog.label, "billing");
    assert_eq!(catalog.len(), 3);
    let names: Vec<&str> = catalog.scripts.iter().map(|s| s.filename.as_str()).collect();
    assert_eq!(
        names,
        vec!["scripts/001_tables.sql", r"scripts\fn_totals.sql", "002_seed.sql"]
    );
    assert_eq!(catalog.base_dir, PathBuf::from("deploy"));
}

#[test]
fn test_parse_catalog_defaults() {
    let catalog = Catalog::from_yaml(SAMPLE, Path::new("catalog.yml")).unwrap();
    let seed = &catalog.scripts[2];
    assert_eq!(seed.script_type, ScriptType::Sql);
    assert!(!seed.onetime);
    assert_eq!(seed.label, "");
    assert_eq!(catalog.base_dir, PathBuf::from("."));
}

#[test]
fn test_script_type_is_case_insensitive() {
    let catalog = Catalog::from_yaml(SAMPLE, Path::new("catalog.yml")).unwrap();
    assert_eq!(catalog.scripts[1].script_type, ScriptType::Function);
    assert_eq!("Sql".parse::<ScriptType>().unwrap(), ScriptType::Sql);
}

#[test]
fn test_unknown_script_type_rejected() {
    let yaml = r#"
database:
  label: billing
  scripts:
    - filename: a.sql
      type: TRIGGER
"#;
    let err = Catalog::from_yaml(yaml, Path::new("catalog.yml")).unwrap_err();
    assert!(matches!(err, CoreError::CatalogParseError { .. }));
    assert!(err.to_string().contains("TRIGGER"));
}

#[test]
fn test_unknown_field_rejected() {
    let yaml = r#"
database:
  label: billing
  scripts:
    - filename: a.sql
      run_always: true
"#;
    assert!(Catalog::from_yaml(yaml, Path::new("catalog.yml")).is_err());
}

#[test]
fn test_empty_label_rejected() {
    let yaml = "database:\n  label: \"  \"\n  scripts: []\n";
    let err = Catalog::from_yaml(yaml, Path::new("catalog.yml")).unwrap_err();
    assert!(matches!(err, CoreError::CatalogInvalid { .. }));
}

#[test]
fn test_empty_filename_rejected() {
    let yaml = "database:\n  label: billing\n  scripts:\n    - filename: \"\"\n";
    let err = Catalog::from_yaml(yaml, Path::new("catalog.yml")).unwrap_err();
    assert!(err.to_string().contains("script #1"));
}

#[test]
fn test_directory_only_filename_rejected() {
    let yaml = "database:\n  label: billing\n  scripts:\n    - filename: scripts/\n";
    let err = Catalog::from_yaml(yaml, Path::new("catalog.yml")).unwrap_err();
    assert!(err.to_string().contains("no file name component"));
}

#[test]
fn test_descriptor_key_is_normalized() {
    let catalog = Catalog::from_yaml(SAMPLE, Path::new("catalog.yml")).unwrap();
    assert_eq!(catalog.scripts[0].key(), "001_TABLES.SQL");
    assert_eq!(catalog.scripts[1].key(), "FN_TOTALS.SQL");
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.yml");
    std::fs::write(&path, SAMPLE).unwrap();

    let catalog = Catalog::load(&path).unwrap();
    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog.base_dir, dir.path());
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Catalog::load(&dir.path().join("nope.yml")).unwrap_err();
    match err {
        CoreError::CatalogNotFound { searched } => assert!(searched.contains("nope.yml")),
        other => panic!("unexpected error: {other}"),
    }
}
