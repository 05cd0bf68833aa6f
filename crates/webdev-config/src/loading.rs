//! Layered loading with figment.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml};

use crate::config::{CompilerKind, WebdevConfig};
use crate::discovery::{ConfigDiscovery, ConfigFormat};
use crate::error::{ConfigError, Result};

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "WEBDEV_";

/// Values given on the command line. `None` (or empty) leaves a key alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub resource_roots: Vec<PathBuf>,
    pub classes_dir: Option<PathBuf>,
    pub compiler: Option<CompilerKind>,
    pub minify: Option<bool>,
}

impl ConfigOverrides {
    fn apply(&self, mut figment: Figment) -> Figment {
        if let Some(host) = &self.host {
            figment = figment.merge(Serialized::default("server.host", host));
        }
        if let Some(port) = self.port {
            figment = figment.merge(Serialized::default("server.port", port));
        }
        if !self.resource_roots.is_empty() {
            figment = figment.merge(Serialized::default("resource_roots", &self.resource_roots));
        }
        if let Some(classes_dir) = &self.classes_dir {
            figment = figment.merge(Serialized::default("classes_dir", classes_dir));
        }
        if let Some(compiler) = self.compiler {
            figment = figment.merge(Serialized::default("compiler", compiler));
        }
        if let Some(minify) = self.minify {
            figment = figment.merge(Serialized::default("minify", minify));
        }
        figment
    }
}

/// Builds a [`WebdevConfig`] for a project root.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    root: PathBuf,
    file: Option<PathBuf>,
    env_prefix: String,
    overrides: ConfigOverrides,
}

impl ConfigLoader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            file: None,
            env_prefix: ENV_PREFIX.to_string(),
            overrides: ConfigOverrides::default(),
        }
    }

    /// Use this file instead of discovering one. Relative to the root.
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// The config file that will be read, if any.
    ///
    /// # Errors
    ///
    /// `ConfigError::NotFound` when an explicit file does not exist.
    pub fn config_file(&self) -> Result<Option<PathBuf>> {
        match &self.file {
            Some(file) => {
                let path = if file.is_absolute() {
                    file.clone()
                } else {
                    self.root.join(file)
                };
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path));
                }
                Ok(Some(path))
            }
            None => Ok(ConfigDiscovery::new(&self.root).find()),
        }
    }

    /// All layers, unextracted.
    pub fn figment(&self) -> Result<Figment> {
        let mut figment = Figment::new().merge(Serialized::defaults(WebdevConfig::default()));

        if let Some(path) = self.config_file()? {
            tracing::debug!(path = %path.display(), "using config file");
            figment = match ConfigFormat::from_path(&path)? {
                ConfigFormat::Toml => figment.merge(Toml::file(&path)),
                ConfigFormat::Json => figment.merge(Json::file(&path)),
            };
        }

        figment = figment.merge(Env::prefixed(&self.env_prefix).split("__"));
        Ok(self.overrides.apply(figment))
    }

    /// Extract, validate and resolve against the root.
    ///
    /// # Errors
    ///
    /// Parse failures, type mismatches, unknown keys and validation failures.
    pub fn load(&self) -> Result<WebdevConfig> {
        let config: WebdevConfig = self.figment()?.extract()?;
        config.validate()?;
        Ok(config.resolve(&self.root))
    }
}
