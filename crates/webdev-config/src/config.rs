//! Configuration types.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults::*;
use crate::error::ConfigError;

/// Top-level settings of a webdev project.
///
/// Relative directories are relative to the project root until
/// [`resolve`](Self::resolve) is called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebdevConfig {
    /// Prefix of the sentinel keys and of the default live endpoint.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Source directories holding stylesheets and static resources.
    #[serde(default = "default_resource_roots")]
    pub resource_roots: Vec<PathBuf>,

    /// Output directory served to the browser.
    #[serde(default = "default_classes_dir")]
    pub classes_dir: PathBuf,

    /// Secondary output directory cleaned alongside `classes_dir`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_dir: Option<PathBuf>,

    /// Outputs with these suffixes never produce change events.
    #[serde(default = "default_excluded_suffixes")]
    pub excluded_suffixes: Vec<String>,

    #[serde(default)]
    pub compiler: CompilerKind,

    /// Executable used by the `sass-cli` compiler.
    #[serde(default = "default_sass_binary")]
    pub sass_binary: String,

    #[serde(default)]
    pub minify: bool,

    #[serde(default)]
    pub live: LiveConfig,

    #[serde(default)]
    pub delete: DeleteConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub watch: WatchConfig,
}

impl Default for WebdevConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            resource_roots: default_resource_roots(),
            classes_dir: default_classes_dir(),
            build_dir: None,
            excluded_suffixes: default_excluded_suffixes(),
            compiler: CompilerKind::default(),
            sass_binary: default_sass_binary(),
            minify: false,
            live: LiveConfig::default(),
            delete: DeleteConfig::default(),
            server: ServerConfig::default(),
            watch: WatchConfig::default(),
        }
    }
}

impl WebdevConfig {
    /// Path of the event stream endpoint: `live.path`, or `/<namespace>/live`.
    pub fn live_path(&self) -> String {
        match &self.live.path {
            Some(path) => path.clone(),
            None => format!("/{}/live", self.namespace.trim_matches('/')),
        }
    }

    /// Make every relative directory absolute against `base`.
    pub fn resolve(mut self, base: &Path) -> Self {
        let absolute = |path: PathBuf| {
            if path.is_absolute() {
                path
            } else {
                base.join(path)
            }
        };

        self.resource_roots = self.resource_roots.into_iter().map(absolute).collect();
        self.classes_dir = absolute(self.classes_dir);
        self.build_dir = self.build_dir.map(absolute);
        self
    }
}

/// Which stylesheet compiler rebuilds use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompilerKind {
    /// Built-in: import inlining plus `lightningcss`. SCSS syntax only.
    #[default]
    Inline,
    /// The external `sass` executable.
    SassCli,
}

impl CompilerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::SassCli => "sass-cli",
        }
    }
}

impl fmt::Display for CompilerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompilerKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "inline" => Ok(Self::Inline),
            "sass-cli" => Ok(Self::SassCli),
            other => Err(ConfigError::invalid(
                "compiler",
                other,
                "expected 'inline' or 'sass-cli'",
            )),
        }
    }
}

/// Browser push connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LiveConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,

    /// Endpoint override; derived from the namespace when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            heartbeat_secs: default_heartbeat_secs(),
            path: None,
        }
    }
}

impl LiveConfig {
    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }
}

/// Retry and settle timing for output deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteConfig {
    #[serde(default = "default_retry_window_ms")]
    pub retry_window_ms: u64,

    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    #[serde(default = "default_settle_interval_ms")]
    pub settle_interval_ms: u64,

    #[serde(default = "default_settle_attempts")]
    pub settle_attempts: u32,
}

impl Default for DeleteConfig {
    fn default() -> Self {
        Self {
            retry_window_ms: default_retry_window_ms(),
            retry_interval_ms: default_retry_interval_ms(),
            settle_interval_ms: default_settle_interval_ms(),
            settle_attempts: default_settle_attempts(),
        }
    }
}

impl DeleteConfig {
    pub fn retry_window(&self) -> Duration {
        Duration::from_millis(self.retry_window_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// File watching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// Quiet period before a batch of file events is processed.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Glob patterns, matched against paths relative to a resource root.
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            ignore: default_ignore(),
        }
    }
}

impl WatchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
