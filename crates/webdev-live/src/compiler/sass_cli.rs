use regex::Regex;
use std::path::PathBuf;
use std::process::Command;
use std::sync::LazyLock;

use super::imports::collect_dependencies;
use super::{CompileError, CompileFailure, CompileUnit, Compiler, DependencySink};

/// `  styles.scss 3:10  root stylesheet`
static TRACE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]+(\S+)[ \t]+(\d+):(\d+)[ \t]").expect("trace line pattern is valid")
});

/// Compiles through an external Dart Sass binary.
///
/// The binary runs once per stylesheet with `--load-path` pointing at the
/// unit's root. Dependencies are discovered by scanning imports, which
/// matches what Sass itself loads for `@import`, `@use` and `@forward`.
#[derive(Debug, Clone)]
pub struct SassCliCompiler {
    binary: PathBuf,
    minify: bool,
}

impl Default for SassCliCompiler {
    fn default() -> Self {
        Self::new("sass")
    }
}

impl SassCliCompiler {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            minify: false,
        }
    }

    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    pub fn binary(&self) -> &std::path::Path {
        &self.binary
    }

    fn command(&self, unit: &CompileUnit) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .arg("--no-source-map")
            .arg(if self.minify {
                "--style=compressed"
            } else {
                "--style=expanded"
            })
            .arg(format!("--load-path={}", unit.root.display()))
            .arg(&unit.absolute_path);
        command
    }
}

impl Compiler for SassCliCompiler {
    fn compile(
        &self,
        unit: &CompileUnit,
        dependencies: &mut dyn DependencySink,
    ) -> Result<String, CompileError> {
        collect_dependencies(unit, dependencies)?;

        let output = self
            .command(unit)
            .output()
            .map_err(|err| CompileError::io(&self.binary, err))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(parse_failure(&stderr, &unit.relative_path).into());
        }

        tracing::debug!(
            source = %unit.relative_path,
            binary = %self.binary.display(),
            bytes = output.stdout.len(),
            "compiled stylesheet"
        );
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Turn Dart Sass stderr into a failure located at the first trace line.
fn parse_failure(stderr: &str, fallback_file: &str) -> CompileFailure {
    let message = stderr
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.strip_prefix("Error: ").unwrap_or(line).to_string())
        .unwrap_or_else(|| "sass exited with an error".to_string());

    let location = TRACE_LINE.captures(stderr).and_then(|captures| {
        let file = captures.get(1)?.as_str().to_string();
        let line = captures.get(2)?.as_str().parse().ok()?;
        let column = captures.get(3)?.as_str().parse().ok()?;
        Some((file, line, column))
    });

    match location {
        Some((file, line, column)) => CompileFailure::new(message, file).at(line, column),
        None => CompileFailure::new(message, fallback_file),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_failure_reads_trace_location() {
        let stderr = "Error: Undefined variable.\n  \u{2577}\n3 \u{2502}   color: $c;\n  \u{2502}          ^^\n  \u{2575}\n  css/styles.scss 3:10  root stylesheet\n";
        let failure = parse_failure(stderr, "fallback.scss");

        assert_eq!(failure.message, "Undefined variable.");
        assert_eq!(failure.file, "css/styles.scss");
        assert_eq!((failure.line, failure.column), (Some(3), Some(10)));
    }

    #[test]
    fn test_parse_failure_without_trace() {
        let failure = parse_failure("\n", "a.scss");
        assert_eq!(failure.message, "sass exited with an error");
        assert_eq!(failure.file, "a.scss");
        assert_eq!(failure.line, None);
    }

    #[test]
    fn test_command_line() {
        let unit = CompileUnit::new("/web/styles.scss", "styles.scss", "/web");
        let command = SassCliCompiler::new("/opt/sass").command(&unit);
        let args: Vec<_> = command
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();

        assert_eq!(command.get_program(), "/opt/sass");
        assert_eq!(
            args,
            vec![
                "--no-source-map",
                "--style=expanded",
                "--load-path=/web",
                "/web/styles.scss"
            ]
        );
    }

    #[test]
    fn test_missing_binary_is_io() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("styles.scss");
        fs::write(&source, ".a { color: red; }\n").unwrap();

        let compiler = SassCliCompiler::new(temp.path().join("no-such-sass"));
        let unit = CompileUnit::new(&source, "styles.scss", temp.path());
        let err = compiler.compile(&unit, &mut Vec::new()).unwrap_err();

        assert!(matches!(err, CompileError::Io { .. }));
    }
}
