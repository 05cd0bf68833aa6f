//! Error types for the live reload engine.
//!
//! Only conditions that would leave the on-disk and in-memory state
//! inconsistent surface here. Per-connection teardown races and first-time
//! snapshot misses are absorbed where they happen, and protocol problems
//! (missing `Accept`, too many sessions) are answered with a status code by
//! the endpoint instead of an error.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::compiler::CompileFailure;

/// Result alias using [`LiveError`].
pub type Result<T, E = LiveError> = std::result::Result<T, E>;

/// Errors raised by the snapshot store and the rebuild trigger.
#[derive(Debug, Error, Diagnostic)]
pub enum LiveError {
    /// The tracked root directory does not exist.
    #[error("tracked directory {} should exist on disk", .0.display())]
    #[diagnostic(
        code(webdev::live::root_missing),
        help("run a full build first so the classes directory is created")
    )]
    RootMissing(PathBuf),

    /// Reading metadata, reading or writing a file failed.
    #[error("I/O error on {}: {source}", .path.display())]
    #[diagnostic(code(webdev::live::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stale output could not be removed within the retry window.
    #[error("failed to delete {} after retrying for {window_ms}ms: {source}", .path.display())]
    #[diagnostic(
        code(webdev::live::delete_failed),
        help("another process may keep the file open; close it and save the source again")
    )]
    DeleteFailed {
        path: PathBuf,
        window_ms: u128,
        #[source]
        source: std::io::Error,
    },

    /// One or more stylesheets failed to compile during a full build.
    #[error("{} stylesheet(s) failed to compile", .failures.len())]
    #[diagnostic(code(webdev::live::build_failed))]
    BuildFailed {
        #[related]
        failures: Vec<CompileFailure>,
    },
}

impl LiveError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
