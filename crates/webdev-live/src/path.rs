//! Path normalization shared by the snapshot store, the graph, and the rebuild trigger.
//!
//! Two kinds of names circulate:
//!
//! - **resource keys** (`/styles.css`) identify served web resources; they always
//!   start with `/` and use forward slashes.
//! - **source keys** (`css/_base.scss`) identify sources relative to the resource
//!   root they were found in; no leading separator.

use serde::Serialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Normalized identifier of a tracked web resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Normalize any path-like name into a resource key.
    ///
    /// ```
    /// use webdev_live::ResourceKey;
    ///
    /// assert_eq!(ResourceKey::new("css\\app.css").as_str(), "/css/app.css");
    /// assert_eq!(ResourceKey::new("//app.css").as_str(), "/app.css");
    /// ```
    pub fn new(name: impl AsRef<str>) -> Self {
        let mut key = String::with_capacity(name.as_ref().len() + 1);
        for segment in name
            .as_ref()
            .split(['/', '\\'])
            .filter(|segment| !segment.is_empty())
        {
            key.push('/');
            key.push_str(segment);
        }
        if key.is_empty() {
            key.push('/');
        }
        Self(key)
    }

    /// Build the key of a file located under `root`.
    ///
    /// Returns `None` when `path` is not inside `root`.
    pub fn from_path(path: &Path, root: &Path) -> Option<Self> {
        let relative = path.strip_prefix(root).ok()?;
        Some(Self::new(join_components(relative)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The key without its leading separator.
    pub fn relative(&self) -> &str {
        &self.0[1..]
    }

    /// Resolve the key against a directory.
    pub fn resolve(&self, root: &Path) -> PathBuf {
        root.join(self.relative())
    }

    /// Case-insensitive suffix check.
    pub fn matches_suffix<S: AsRef<str>>(&self, suffixes: &[S]) -> bool {
        let lower = self.0.to_lowercase();
        suffixes
            .iter()
            .any(|suffix| lower.ends_with(&suffix.as_ref().to_lowercase()))
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Source key of `path` relative to `root`, forward slashes, no leading separator.
pub fn source_key(path: &Path, root: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let key = join_components(relative);
    (!key.is_empty()).then_some(key)
}

/// Output name of a compiled source (`app/main.scss` → `app/main.css`).
pub fn output_name(source_key: &str) -> String {
    if ends_with_ignore_case(source_key, ".scss") || ends_with_ignore_case(source_key, ".sass") {
        format!("{}.css", &source_key[..source_key.len() - 5])
    } else {
        source_key.to_string()
    }
}

/// True for stylesheets compiled on their own: not a `_partial`, `.scss` or `.sass`.
pub fn is_compiled_source(file_name: &str) -> bool {
    !file_name.starts_with('_') && is_sass_file(file_name)
}

/// True for any `.scss` or `.sass` file, partials included.
pub fn is_sass_file(file_name: &str) -> bool {
    ends_with_ignore_case(file_name, ".scss") || ends_with_ignore_case(file_name, ".sass")
}

/// True for the indented `.sass` syntax.
pub fn is_indented_syntax(file_name: &str) -> bool {
    ends_with_ignore_case(file_name, ".sass")
}

fn ends_with_ignore_case(value: &str, suffix: &str) -> bool {
    value.len() >= suffix.len()
        && value
            .get(value.len() - suffix.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix))
}

/// File name part of a source key.
pub fn file_name(key: &str) -> &str {
    key.rsplit(['/', '\\']).next().unwrap_or(key)
}

fn join_components(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
