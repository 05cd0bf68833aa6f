use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};
use std::fs;
use std::path::{Path, PathBuf};

use super::imports::{dependency_key, resolve, scan, unresolved};
use super::{CompileError, CompileFailure, CompileUnit, Compiler, DependencySink};
use crate::path::is_indented_syntax;

/// In-process compiler for the CSS-compatible subset of SCSS.
///
/// ```text
/// styles.scss ──inline partials──▶ one CSS text ──lightningcss──▶ output
/// ```
///
/// Imports are replaced by the content of the file they resolve to, so
/// partials can split a stylesheet into pieces. Sass-only features such as
/// variables, mixins or functions are not evaluated; use [`SassCliCompiler`]
/// for those.
///
/// [`SassCliCompiler`]: super::SassCliCompiler
#[derive(Debug, Clone, Default)]
pub struct InlineCompiler {
    minify: bool,
}

impl InlineCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    fn inline(
        &self,
        file: &Path,
        unit: &CompileUnit,
        stack: &mut Vec<PathBuf>,
        dependencies: &mut dyn DependencySink,
    ) -> Result<String, CompileError> {
        let source = fs::read_to_string(file).map_err(|err| CompileError::io(file, err))?;
        let mut output = String::with_capacity(source.len());
        let mut cursor = 0;

        for statement in scan(&source) {
            output.push_str(&strip_line_comments(&source[cursor..statement.span.start]));
            cursor = statement.span.end;

            if statement.external {
                // Plain CSS imports stay for the browser; built-in modules have no output.
                if !source[statement.span.clone()].contains("sass:") {
                    output.push_str(&source[statement.span.clone()]);
                }
                continue;
            }

            for url in &statement.urls {
                let resolved = resolve(url, file, &unit.root)
                    .ok_or_else(|| unresolved(url, file, &unit.root, &statement))?;

                if stack.contains(&resolved) {
                    let chain: Vec<String> = stack
                        .iter()
                        .chain(std::iter::once(&resolved))
                        .map(|path| dependency_key(path, &unit.root))
                        .collect();
                    return Err(CompileFailure::new(
                        format!("import cycle: {}", chain.join(" -> ")),
                        dependency_key(file, &unit.root),
                    )
                    .at(statement.line, statement.column)
                    .into());
                }

                dependencies.record(&dependency_key(&resolved, &unit.root), &unit.relative_path);
                stack.push(resolved.clone());
                let inlined = self.inline(&resolved, unit, stack, dependencies)?;
                stack.pop();

                output.push_str(&inlined);
                output.push('\n');
            }
        }

        output.push_str(&strip_line_comments(&source[cursor..]));
        Ok(output)
    }

    fn print(&self, unit: &CompileUnit, css: &str) -> Result<String, CompileError> {
        let mut stylesheet = StyleSheet::parse(
            css,
            ParserOptions {
                filename: unit.relative_path.clone(),
                ..Default::default()
            },
        )
        .map_err(|err| located(unit, err.kind.to_string(), err.loc))?;

        if self.minify {
            stylesheet
                .minify(MinifyOptions::default())
                .map_err(|err| located(unit, err.kind.to_string(), err.loc))?;
        }

        let result = stylesheet
            .to_css(PrinterOptions {
                minify: self.minify,
                ..Default::default()
            })
            .map_err(|err| located(unit, err.kind.to_string(), err.loc))?;

        Ok(result.code)
    }
}

impl Compiler for InlineCompiler {
    fn compile(
        &self,
        unit: &CompileUnit,
        dependencies: &mut dyn DependencySink,
    ) -> Result<String, CompileError> {
        if is_indented_syntax(&unit.relative_path) {
            return Err(CompileFailure::new(
                "the indented .sass syntax needs the sass-cli compiler",
                unit.relative_path.clone(),
            )
            .into());
        }

        dependencies.record(&unit.relative_path, &unit.relative_path);
        let mut stack = vec![unit.absolute_path.clone()];
        let css = self.inline(&unit.absolute_path, unit, &mut stack, dependencies)?;
        let printed = self.print(unit, &css)?;

        tracing::debug!(
            source = %unit.relative_path,
            bytes = printed.len(),
            minify = self.minify,
            "compiled stylesheet"
        );
        Ok(printed)
    }
}

fn located(
    unit: &CompileUnit,
    message: String,
    location: Option<lightningcss::error::ErrorLocation>,
) -> CompileError {
    let failure = CompileFailure::new(message, unit.relative_path.clone());
    let failure = match location {
        // lightningcss lines are 0-based, columns 1-based
        Some(location) => failure.at(location.line + 1, location.column),
        None => failure,
    };
    failure.into()
}

/// Drop whole-line `//` comments, which plain CSS does not understand.
fn strip_line_comments(chunk: &str) -> String {
    let mut kept = String::with_capacity(chunk.len());
    for line in chunk.split_inclusive('\n') {
        if !line.trim_start().starts_with("//") {
            kept.push_str(line);
        }
    }
    kept
}
