use super::*;
use clap::CommandFactory;
use std::path::PathBuf;
use webdev_config::CompilerKind;

#[test]
fn test_cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn test_dev_options_become_overrides() {
    let cli = Cli::try_parse_from([
        "webdev", "dev", "--port", "9000", "--host", "0.0.0.0", "--root", "web", "--root",
        "shared", "--compiler", "sass-cli", "--minify",
    ])
    .unwrap();

    let Command::Dev(args) = cli.command else {
        panic!("expected dev command");
    };
    let overrides = args.overrides();
    assert_eq!(overrides.port, Some(9000));
    assert_eq!(overrides.host.as_deref(), Some("0.0.0.0"));
    assert_eq!(
        overrides.resource_roots,
        vec![PathBuf::from("web"), PathBuf::from("shared")]
    );
    assert_eq!(overrides.compiler, Some(CompilerKind::SassCli));
    assert_eq!(overrides.minify, Some(true));
}

#[test]
fn test_unset_flags_leave_config_alone() {
    let cli = Cli::try_parse_from(["webdev", "build"]).unwrap();
    let Command::Build(args) = cli.command else {
        panic!("expected build command");
    };

    let overrides = args.build.overrides();
    assert!(overrides.resource_roots.is_empty());
    assert_eq!(overrides.minify, None);
    assert_eq!(overrides.compiler, None);
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from(["webdev", "build", "--verbose", "--no-color"]).unwrap();
    assert!(cli.verbose);
    assert!(cli.no_color);

    assert!(Cli::try_parse_from(["webdev", "-v", "-q", "build"]).is_err());
}

#[test]
fn test_build_rejects_server_flags() {
    assert!(Cli::try_parse_from(["webdev", "build", "--port", "80"]).is_err());
}
