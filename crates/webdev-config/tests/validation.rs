use std::path::PathBuf;

use webdev_config::{CompilerKind, ConfigError, WebdevConfig};

fn field_of(err: ConfigError) -> String {
    match err {
        ConfigError::InvalidValue { field, .. } | ConfigError::MissingField { field, .. } => field,
        other => panic!("unexpected error: {other}"),
    }
}

fn rejected(config: WebdevConfig) -> String {
    field_of(config.validate().unwrap_err())
}

#[test]
fn empty_namespace_is_missing() {
    let config = WebdevConfig {
        namespace: "  ".to_string(),
        ..WebdevConfig::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::MissingField { .. })));
}

#[test]
fn namespace_with_slashes_is_invalid() {
    for namespace in ["/web-bundler", "web-bundler/"] {
        let config = WebdevConfig {
            namespace: namespace.to_string(),
            ..WebdevConfig::default()
        };
        assert_eq!(rejected(config), "namespace");
    }
}

#[test]
fn nested_namespace_is_allowed() {
    let config = WebdevConfig {
        namespace: "tools/web".to_string(),
        ..WebdevConfig::default()
    };
    config.validate().unwrap();
    assert_eq!(config.live_path(), "/tools/web/live");
}

#[test]
fn resource_roots_are_required() {
    let config = WebdevConfig {
        resource_roots: Vec::new(),
        ..WebdevConfig::default()
    };
    assert_eq!(rejected(config), "resource_roots");

    let config = WebdevConfig {
        resource_roots: vec![PathBuf::new()],
        ..WebdevConfig::default()
    };
    assert_eq!(rejected(config), "resource_roots");
}

#[test]
fn live_limits_must_be_positive() {
    let mut config = WebdevConfig::default();
    config.live.max_connections = 0;
    assert_eq!(rejected(config), "live.max_connections");

    let mut config = WebdevConfig::default();
    config.live.heartbeat_secs = 0;
    assert_eq!(rejected(config), "live.heartbeat_secs");
}

#[test]
fn live_path_must_be_absolute() {
    let mut config = WebdevConfig::default();
    config.live.path = Some("live".to_string());
    assert_eq!(rejected(config), "live.path");
}

#[test]
fn sass_cli_needs_a_binary() {
    let config = WebdevConfig {
        compiler: CompilerKind::SassCli,
        sass_binary: String::new(),
        ..WebdevConfig::default()
    };
    assert_eq!(rejected(config), "sass_binary");
}

#[test]
fn errors_carry_hints() {
    let mut config = WebdevConfig::default();
    config.live.max_connections = 0;
    let message = config.validate().unwrap_err().to_string();

    assert!(message.contains("live.max_connections"));
    assert!(message.contains("Hint:"));
}
