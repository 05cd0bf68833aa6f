//! Default values, shared by serde and the `Default` impls.

use std::path::PathBuf;

pub const DEFAULT_NAMESPACE: &str = "web-bundler";

pub fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

pub fn default_resource_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("src/main/resources/web")]
}

pub fn default_classes_dir() -> PathBuf {
    PathBuf::from("target/classes")
}

pub fn default_excluded_suffixes() -> Vec<String> {
    vec![".map".to_string()]
}

pub fn default_sass_binary() -> String {
    "sass".to_string()
}

pub fn default_max_connections() -> usize {
    2
}

pub fn default_heartbeat_secs() -> u64 {
    30
}

pub fn default_retry_window_ms() -> u64 {
    5_000
}

pub fn default_retry_interval_ms() -> u64 {
    50
}

pub fn default_settle_interval_ms() -> u64 {
    1_000
}

pub fn default_settle_attempts() -> u32 {
    10
}

pub fn default_host() -> String {
    "127.0.0.1".to_string()
}

pub fn default_port() -> u16 {
    8080
}

pub fn default_debounce_ms() -> u64 {
    100
}

/// Editor swap files and dependency trees.
pub fn default_ignore() -> Vec<String> {
    vec![
        "**/*.swp".to_string(),
        "**/*~".to_string(),
        "**/node_modules/**".to_string(),
    ]
}
