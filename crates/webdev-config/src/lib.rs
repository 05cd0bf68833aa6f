//! Configuration for the webdev live reload server.
//!
//! Settings are layered with `figment`, lowest precedence first:
//!
//! 1. built-in defaults ([`WebdevConfig::default`])
//! 2. `webdev.toml` or `webdev.json` in the project root, or an explicit file
//! 3. `WEBDEV_*` environment variables, `__` separating nested keys
//!    (`WEBDEV_SERVER__PORT=9000`, `WEBDEV_LIVE__MAX_CONNECTIONS=4`)
//! 4. command line overrides ([`ConfigOverrides`])
//!
//! ```no_run
//! use webdev_config::ConfigLoader;
//!
//! let config = ConfigLoader::new(".").load()?;
//! println!("serving {} on port {}", config.classes_dir.display(), config.server.port);
//! # Ok::<(), webdev_config::ConfigError>(())
//! ```

pub mod config;
pub mod defaults;
mod discovery;
pub mod error;
mod loading;
mod validation;

pub use config::{CompilerKind, DeleteConfig, LiveConfig, ServerConfig, WatchConfig, WebdevConfig};
pub use defaults::DEFAULT_NAMESPACE;
pub use discovery::{ConfigDiscovery, ConfigFormat, CONFIG_FILE_NAMES};
pub use error::{ConfigError, Result};
pub use loading::{ConfigLoader, ConfigOverrides, ENV_PREFIX};
