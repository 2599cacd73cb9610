use super::*;
use clap::Parser;

#[test]
fn test_run_defaults() {
    let cli = Cli::try_parse_from(["dw", "run"]).unwrap();
    assert_eq!(cli.global.project_dir, ".");
    assert!(cli.global.target.is_none());
    assert!(!cli.global.verbose);
    match cli.command {
        Commands::Run(args) => assert!(!args.dry_run),
        other => panic!("expected run, got {:?}", other),
    }
}

#[test]
fn test_global_args_after_subcommand() {
    let cli = Cli::try_parse_from(["dw", "run", "--dry-run", "-p", "deploy", "-t", "prod"]).unwrap();
    assert_eq!(cli.global.project_dir, "deploy");
    assert_eq!(cli.global.target.as_deref(), Some("prod"));
    match cli.command {
        Commands::Run(args) => assert!(args.dry_run),
        other => panic!("expected run, got {:?}", other),
    }
}

#[test]
fn test_ls_output_formats() {
    let cli = Cli::try_parse_from(["dw", "ls", "--output", "json"]).unwrap();
    match cli.command {
        Commands::Ls(args) => assert_eq!(args.output, LsOutput::Json),
        other => panic!("expected ls, got {:?}", other),
    }

    let cli = Cli::try_parse_from(["dw", "ls"]).unwrap();
    match cli.command {
        Commands::Ls(args) => assert_eq!(args.output, LsOutput::Table),
        other => panic!("expected ls, got {:?}", other),
    }
}

#[test]
fn test_init_requires_name() {
    assert!(Cli::try_parse_from(["dw", "init"]).is_err());

    let cli = Cli::try_parse_from(["dw", "init", "my-deploy"]).unwrap();
    match cli.command {
        Commands::Init(args) => {
            assert_eq!(args.name, "my-deploy");
            assert_eq!(args.database_path, "target/driftway.duckdb");
        }
        other => panic!("expected init, got {:?}", other),
    }
}

#[test]
fn test_unknown_subcommand_rejected() {
    assert!(Cli::try_parse_from(["dw", "frobnicate"]).is_err());
}
