//! Discovery and resolution of `@import`, `@use` and `@forward` statements.

use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use super::{CompileError, CompileFailure, CompileUnit, DependencySink};
use crate::path::{is_indented_syntax, source_key};

static STATEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*@(import|use|forward)\b([^;\n]*);?")
        .expect("import statement pattern is valid")
});

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)"|'([^']*)'"#).expect("quoted url pattern is valid"));

/// One import statement found in a stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    /// Byte range of the whole statement, terminator included.
    pub span: Range<usize>,
    /// 1-based line of the `@`.
    pub line: u32,
    /// 1-based column of the `@`.
    pub column: u32,
    /// URLs that name a stylesheet to load.
    pub urls: Vec<String>,
    /// The statement only references plain CSS or remote URLs.
    pub external: bool,
}

/// Find every import statement in `source`, in order.
pub fn scan(source: &str) -> Vec<ImportStatement> {
    let (statement, quoted) = (&*STATEMENT, &*QUOTED);

    statement
        .captures_iter(source)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            let keyword = captures.get(1)?.as_str();
            let arguments = captures.get(2)?.as_str().trim();
            let at = whole.start() + whole.as_str().find('@')?;

            let mut urls: Vec<String> = quoted
                .captures_iter(arguments)
                .filter_map(|quote| quote.get(1).or_else(|| quote.get(2)))
                .map(|url| url.as_str().to_string())
                .collect();
            if keyword != "import" {
                urls.truncate(1);
            }

            let external = arguments.starts_with("url(") || urls.iter().all(|url| is_external(url));
            urls.retain(|url| !is_external(url));

            let (line, column) = line_column(source, at);
            Some(ImportStatement {
                span: at..whole.end(),
                line,
                column,
                urls,
                external,
            })
        })
        .collect()
}

/// URLs that the compiler leaves alone instead of loading.
pub fn is_external(url: &str) -> bool {
    url.starts_with("sass:")
        || url.starts_with("http://")
        || url.starts_with("https://")
        || url.starts_with("//")
        || url.ends_with(".css")
}

/// Resolve an import URL the way Sass does.
///
/// Tries the importer's directory first, then `root`. For each base the
/// `_`-prefixed partial wins over the plain name, the importer's own syntax
/// wins over the other one, and a directory falls back to its `_index` file.
pub fn resolve(url: &str, importer: &Path, root: &Path) -> Option<PathBuf> {
    let indented = importer
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(is_indented_syntax);
    let extensions: [&str; 2] = if indented { ["sass", "scss"] } else { ["scss", "sass"] };

    let (dir, name) = match url.rsplit_once('/') {
        Some((dir, name)) => (dir, name),
        None => ("", url),
    };
    let has_extension = name.ends_with(".scss") || name.ends_with(".sass");

    let mut bases = Vec::with_capacity(2);
    if let Some(parent) = importer.parent() {
        bases.push(parent.join(dir));
    }
    bases.push(root.join(dir));

    for base in &bases {
        let mut candidates = Vec::new();
        if has_extension {
            candidates.push(base.join(format!("_{name}")));
            candidates.push(base.join(name));
        } else {
            for extension in extensions {
                candidates.push(base.join(format!("_{name}.{extension}")));
                candidates.push(base.join(format!("{name}.{extension}")));
            }
            for extension in extensions {
                candidates.push(base.join(name).join(format!("_index.{extension}")));
                candidates.push(base.join(name).join(format!("index.{extension}")));
            }
        }
        if let Some(found) = candidates.into_iter().find(|candidate| candidate.is_file()) {
            return Some(found);
        }
    }
    None
}

/// Logical key of a resolved import, relative to the unit's root when possible.
pub fn dependency_key(path: &Path, root: &Path) -> String {
    source_key(path, root).unwrap_or_else(|| path.to_string_lossy().replace('\\', "/"))
}

/// Record the unit itself and every stylesheet it transitively imports.
///
/// # Errors
///
/// Fails on unreadable files and on imports that resolve to nothing.
pub fn collect_dependencies(
    unit: &CompileUnit,
    sink: &mut dyn DependencySink,
) -> Result<(), CompileError> {
    sink.record(&unit.relative_path, &unit.relative_path);

    let mut visited = HashSet::new();
    let mut pending = vec![unit.absolute_path.clone()];
    visited.insert(unit.absolute_path.clone());

    while let Some(file) = pending.pop() {
        let source = fs::read_to_string(&file).map_err(|err| CompileError::io(&file, err))?;
        for statement in scan(&source) {
            for url in &statement.urls {
                let resolved = resolve(url, &file, &unit.root)
                    .ok_or_else(|| unresolved(url, &file, &unit.root, &statement))?;
                if visited.insert(resolved.clone()) {
                    sink.record(&dependency_key(&resolved, &unit.root), &unit.relative_path);
                    pending.push(resolved);
                }
            }
        }
    }
    Ok(())
}

pub(crate) fn unresolved(
    url: &str,
    importer: &Path,
    root: &Path,
    statement: &ImportStatement,
) -> CompileFailure {
    CompileFailure::new(
        format!("can't find stylesheet to import: \"{url}\""),
        dependency_key(importer, root),
    )
    .at(statement.line, statement.column)
}

fn line_column(source: &str, offset: usize) -> (u32, u32) {
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(newline) => before[newline + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (
        u32::try_from(line).unwrap_or(u32::MAX),
        u32::try_from(column).unwrap_or(u32::MAX),
    )
}
