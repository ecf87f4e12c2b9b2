use super::*;
use clap::CommandFactory;

#[test]
fn verify_cli_args() {
    // Validates the entire command tree: short flag conflicts,
    // duplicate args, and other clap definition errors.
    Cli::command().debug_assert();
}

#[test]
fn test_history_defaults() {
    let cli = Cli::try_parse_from(["sqldeploy", "history"]).unwrap();
    match cli.command {
        Commands::History(args) => {
            assert_eq!(args.limit, 20);
            assert!(!args.json);
            assert!(args.script.is_none());
        }
        other => panic!("expected history, got {:?}", other),
    }
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "sqldeploy",
        "deploy",
        "--url",
        "duckdb:app.duckdb",
        "-u",
        "deployer",
        "--catalog",
        "db/catalog.yml",
        "--verbose",
    ])
    .unwrap();
    assert_eq!(cli.global.url.as_deref(), Some("duckdb:app.duckdb"));
    assert_eq!(cli.global.user.as_deref(), Some("deployer"));
    assert!(cli.global.verbose);
    match cli.command {
        Commands::Deploy(args) => assert_eq!(args.catalog.as_deref(), Some("db/catalog.yml")),
        other => panic!("expected deploy, got {:?}", other),
    }
}
