//! File-based config discovery.

use std::path::{Path, PathBuf};

use crate::config::WebdevConfig;
use crate::error::{ConfigError, Result};

/// File names looked up in the project root, in this order.
pub const CONFIG_FILE_NAMES: &[&str] = &["webdev.toml", "webdev.json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Format of `path`, judged by its extension.
    ///
    /// # Errors
    ///
    /// `ConfigError::UnsupportedFormat` for anything but `.toml` and `.json`.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Ok(Self::Toml),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Self::Json),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Finds and reads a single config file, without the environment layer.
///
/// ```no_run
/// use webdev_config::ConfigDiscovery;
///
/// let config = ConfigDiscovery::new(".").load()?;
/// # Ok::<(), webdev_config::ConfigError>(())
/// ```
pub struct ConfigDiscovery {
    root: PathBuf,
}

impl ConfigDiscovery {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// First of [`CONFIG_FILE_NAMES`] present in the root.
    pub fn find(&self) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| self.root.join(name))
            .find(|path| path.is_file())
    }

    /// Load the discovered file.
    ///
    /// # Errors
    ///
    /// `ConfigError::NotFound` if the root holds no config file.
    pub fn load(&self) -> Result<WebdevConfig> {
        let path = self
            .find()
            .ok_or_else(|| ConfigError::NotFound(self.root.join(CONFIG_FILE_NAMES[0])))?;
        self.load_from(&path)
    }

    /// Load a specific file. Missing keys take their defaults.
    pub fn load_from(&self, path: &Path) -> Result<WebdevConfig> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), ?format, "reading config file");

        match format {
            ConfigFormat::Toml => toml::from_str(&content).map_err(|err| {
                ConfigError::invalid(path.display().to_string(), err.message(), "check TOML syntax")
            }),
            ConfigFormat::Json => serde_json::from_str(&content).map_err(|err| {
                ConfigError::invalid(path.display().to_string(), err, "check JSON syntax")
            }),
        }
    }
}
