//! The stylesheet compiler seam.
//!
//! A [`Compiler`] turns one source file into CSS and reports every file the
//! result depends on through a [`DependencySink`]. Two implementations ship
//! with the crate and are picked when the pipeline is assembled:
//!
//! - [`InlineCompiler`] inlines imported partials in process and prints the
//!   result with lightningcss
//! - [`SassCliCompiler`] shells out to a Dart Sass binary
//!
//! Any `Fn(&CompileUnit, &mut dyn DependencySink) -> Result<String, CompileError>`
//! is a compiler too; wrap closures in [`from_fn`] to pin down their signature.

pub mod imports;
mod inline;
mod sass_cli;

pub use inline::InlineCompiler;
pub use sass_cli::SassCliCompiler;

use miette::Diagnostic;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// One source file handed to a compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileUnit {
    /// Absolute path of the source on disk.
    pub absolute_path: PathBuf,
    /// Source key relative to `root` (`css/styles.scss`).
    pub relative_path: String,
    /// Resource root the source was found in.
    pub root: PathBuf,
}

impl CompileUnit {
    pub fn new(
        absolute_path: impl Into<PathBuf>,
        relative_path: impl Into<String>,
        root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            absolute_path: absolute_path.into(),
            relative_path: relative_path.into(),
            root: root.into(),
        }
    }
}

/// Receives `(source, affected)` edges discovered while compiling.
pub trait DependencySink {
    fn record(&mut self, source: &str, affected: &str);
}

impl DependencySink for Vec<(String, String)> {
    fn record(&mut self, source: &str, affected: &str) {
        self.push((source.to_string(), affected.to_string()));
    }
}

/// Compiles one stylesheet.
pub trait Compiler: Send + Sync {
    fn compile(
        &self,
        unit: &CompileUnit,
        dependencies: &mut dyn DependencySink,
    ) -> Result<String, CompileError>;
}

impl<F> Compiler for F
where
    F: Fn(&CompileUnit, &mut dyn DependencySink) -> Result<String, CompileError> + Send + Sync,
{
    fn compile(
        &self,
        unit: &CompileUnit,
        dependencies: &mut dyn DependencySink,
    ) -> Result<String, CompileError> {
        self(unit, dependencies)
    }
}

/// Identity helper that lets closure arguments infer as a [`Compiler`].
pub fn from_fn<F>(f: F) -> F
where
    F: Fn(&CompileUnit, &mut dyn DependencySink) -> Result<String, CompileError> + Send + Sync,
{
    f
}

/// Why a compile did not produce CSS.
#[derive(Debug, Error, Diagnostic)]
pub enum CompileError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Failed(#[from] CompileFailure),

    #[error("failed to read {}: {source}", .path.display())]
    #[diagnostic(code(webdev::compile::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A stylesheet the compiler rejected, with the location it pointed at.
#[derive(Debug, Clone, PartialEq, Eq, Diagnostic)]
#[diagnostic(code(webdev::compile::failed))]
pub struct CompileFailure {
    pub message: String,
    pub file: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl CompileFailure {
    pub fn new(message: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            file: file.into(),
            line: None,
            column: None,
        }
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

impl fmt::Display for CompileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => {
                write!(f, "{}:{}:{}: {}", self.file, line, column, self.message)
            }
            (Some(line), None) => write!(f, "{}:{}: {}", self.file, line, self.message),
            _ => write!(f, "{}: {}", self.file, self.message),
        }
    }
}

impl std::error::Error for CompileFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_display_with_location() {
        let failure = CompileFailure::new("expected `;`", "styles.scss").at(3, 14);
        assert_eq!(failure.to_string(), "styles.scss:3:14: expected `;`");
        assert_eq!(
            CompileFailure::new("boom", "a.scss").to_string(),
            "a.scss: boom"
        );
    }

    #[test]
    fn test_closure_is_a_compiler() {
        let compiler = from_fn(|unit: &CompileUnit, deps: &mut dyn DependencySink| {
            deps.record(&unit.relative_path, &unit.relative_path);
            Ok(format!("/* {} */", unit.relative_path))
        });

        let unit = CompileUnit::new("/web/a.scss", "a.scss", "/web");
        let mut edges = Vec::new();
        let css = compiler.compile(&unit, &mut edges).unwrap();

        assert_eq!(css, "/* a.scss */");
        assert_eq!(edges, vec![("a.scss".to_string(), "a.scss".to_string())]);
    }

    #[test]
    fn test_compile_error_wraps_failure() {
        let err: CompileError = CompileFailure::new("bad", "x.scss").into();
        assert!(matches!(err, CompileError::Failed(ref failure) if failure.message == "bad"));
        assert_eq!(err.to_string(), "x.scss: bad");
    }
}
