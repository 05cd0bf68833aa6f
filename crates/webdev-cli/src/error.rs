//! Errors of the webdev CLI.
//!
//! [`CliError`] wraps the library errors via `#[from]` and adds the failures
//! only the CLI can hit: binding the server, watching roots, joining tasks.
//! `main` renders it through [`to_report`].

use miette::{Diagnostic, Report};
use std::path::PathBuf;
use thiserror::Error;
use webdev_config::ConfigError;
use webdev_live::LiveError;

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(webdev::config),
        help("check webdev.toml, WEBDEV_* environment variables and command line flags")
    )]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Live(#[from] LiveError),

    #[error("Resource root not found: {}", .0.display())]
    #[diagnostic(
        code(webdev::root_not_found),
        help("pass --root or set resource_roots in webdev.toml")
    )]
    RootNotFound(PathBuf),

    #[error("Invalid watch ignore pattern '{pattern}': {source}")]
    #[diagnostic(code(webdev::watch::pattern))]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Server error: {0}")]
    #[diagnostic(code(webdev::server))]
    Server(String),

    #[error("File watcher error: {0}")]
    #[diagnostic(code(webdev::watch))]
    Watch(#[from] notify::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Render a CLI error as a miette report for `main`.
pub fn to_report(err: CliError) -> Report {
    Report::new(err)
}
