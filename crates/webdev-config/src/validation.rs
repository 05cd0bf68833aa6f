//! Schema-level checks. No filesystem access.

use crate::config::{CompilerKind, WebdevConfig};
use crate::error::{ConfigError, Result};

impl WebdevConfig {
    /// Reject settings the server cannot run with.
    ///
    /// # Errors
    ///
    /// The first offending field as `MissingField` or `InvalidValue`.
    pub fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "namespace".to_string(),
                hint: "set a namespace such as \"web-bundler\"".to_string(),
            });
        }
        if self.namespace.starts_with('/') || self.namespace.ends_with('/') {
            return Err(ConfigError::invalid(
                "namespace",
                &self.namespace,
                "remove the leading and trailing '/'",
            ));
        }

        if self.resource_roots.is_empty() {
            return Err(ConfigError::MissingField {
                field: "resource_roots".to_string(),
                hint: "list at least one source directory".to_string(),
            });
        }
        if let Some(empty) = self.resource_roots.iter().find(|root| root.as_os_str().is_empty()) {
            return Err(ConfigError::invalid(
                "resource_roots",
                empty.display(),
                "resource roots must not be empty paths",
            ));
        }

        if self.live.max_connections < 1 {
            return Err(ConfigError::invalid(
                "live.max_connections",
                self.live.max_connections,
                "at least one browser connection must be allowed",
            ));
        }
        if self.live.heartbeat_secs < 1 {
            return Err(ConfigError::invalid(
                "live.heartbeat_secs",
                self.live.heartbeat_secs,
                "use a heartbeat of one second or more",
            ));
        }
        let live_path = self.live_path();
        if !live_path.starts_with('/') {
            return Err(ConfigError::invalid(
                "live.path",
                live_path,
                "the endpoint path must start with '/'",
            ));
        }

        if self.compiler == CompilerKind::SassCli && self.sass_binary.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "sass_binary".to_string(),
                hint: "the sass-cli compiler needs an executable name or path".to_string(),
            });
        }
        if self.delete.retry_interval_ms == 0 {
            return Err(ConfigError::invalid(
                "delete.retry_interval_ms",
                0,
                "use a retry interval of at least 1 ms",
            ));
        }

        Ok(())
    }
}
