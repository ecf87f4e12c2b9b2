use super::*;
use sd_core::TargetConfig;

fn global() -> GlobalArgs {
    GlobalArgs {
        verbose: false,
        project_dir: ".".to_string(),
        config: None,
        target: None,
        url: None,
        user: None,
        password: None,
        login_timeout: None,
    }
}

fn project_with_targets() -> Project {
    let mut config = Config::default();
    config.default_target = Some("dev".to_string());
    config.targets.insert(
        "dev".to_string(),
        TargetConfig {
            url: Some("duckdb:dev.duckdb".to_string()),
            ..Default::default()
        },
    );
    config.targets.insert(
        "prod".to_string(),
        TargetConfig {
            dialect: Some("postgres".to_string()),
            host: Some("db.internal".to_string()),
            database: Some("billing".to_string()),
            user: Some("deployer".to_string()),
            password_env: Some("SQLDEPLOY_COMMON_TEST_PASSWORD".to_string()),
            ..Default::default()
        },
    );
    Project {
        root: PathBuf::from("."),
        config,
    }
}

#[test]
fn test_default_target_is_used() {
    let project = project_with_targets();
    let options = project.connect_options(&global()).unwrap();
    assert_eq!(options.endpoint, "duckdb:dev.duckdb");
    assert_eq!(options.login_timeout, Duration::from_secs(30));
}

#[test]
fn test_target_parts_and_password_env() {
    std::env::set_var("SQLDEPLOY_COMMON_TEST_PASSWORD", "s3cret");
    let project = project_with_targets();
    let mut args = global();
    args.target = Some("prod".to_string());
    args.login_timeout = Some(5);

    let options = project.connect_options(&args).unwrap();
    assert_eq!(options.endpoint, "postgresql://db.internal:5432/billing");
    assert_eq!(options.user, "deployer");
    assert_eq!(options.password, "s3cret");
    assert_eq!(options.login_timeout, Duration::from_secs(5));
}

#[test]
fn test_url_flag_overrides_target() {
    let project = project_with_targets();
    let mut args = global();
    args.url = Some("sqlserver://localhost:1433;databaseName=app".to_string());
    args.user = Some("sa".to_string());

    let options = project.connect_options(&args).unwrap();
    assert_eq!(options.endpoint, "sqlserver://localhost:1433;databaseName=app");
    assert_eq!(options.user, "sa");
}

#[test]
fn test_missing_endpoint_is_an_error() {
    let project = Project {
        root: PathBuf::from("."),
        config: Config::default(),
    };
    let err = project.connect_options(&global()).unwrap_err();
    assert!(err.to_string().contains("No database endpoint"));
}

#[test]
fn test_unknown_target_is_an_error() {
    let project = project_with_targets();
    let mut args = global();
    args.target = Some("staging".to_string());
    assert!(project.connect_options(&args).is_err());
}

#[test]
fn test_load_catalog_from_config_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("catalog.yml"),
        "database:\n  label: app\n  scripts:\n    - filename: 001_init.sql\n      onetime: true\n",
    )
    .unwrap();
    let project = Project {
        root: dir.path().to_path_buf(),
        config: Config::default(),
    };
    let catalog = project.load_catalog(None).unwrap();
    assert_eq!(catalog.label, "app");
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.base_dir, dir.path());
}

#[test]
fn test_explicit_config_resolves_catalog_next_to_it() {
    let dir = tempfile::tempdir().unwrap();
    let conf_dir = dir.path().join("deploy");
    std::fs::create_dir_all(&conf_dir).unwrap();
    std::fs::write(conf_dir.join("other.yml"), "catalog: scripts.yml\n").unwrap();
    std::fs::write(
        conf_dir.join("scripts.yml"),
        "database:\n  label: nested\n  scripts: []\n",
    )
    .unwrap();

    let mut args = global();
    args.project_dir = dir.path().display().to_string();
    args.config = Some(conf_dir.join("other.yml").display().to_string());

    let project = Project::load(&args).unwrap();
    assert_eq!(project.root, conf_dir);
    let catalog = project.load_catalog(None).unwrap();
    assert_eq!(catalog.label, "nested");
    assert_eq!(catalog.base_dir, conf_dir);
}
