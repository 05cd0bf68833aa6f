//! Reverse source dependencies for selective stylesheet rebuilds.
//!
//! ```text
//! DependencyGraph
//! └── edges: source → [affected, affected, ...]
//!
//! _base.scss  → [styles.scss, admin.scss]
//! styles.scss → [styles.scss]
//! ```
//!
//! Compiles record every transitive import as a direct edge, so resolution is
//! a single lookup. Lists are append-only within a build generation and may
//! hold duplicates; consumers resolve into a set.

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};

use crate::compiler::DependencySink;
use crate::path::{file_name, is_compiled_source};

/// Thread-safe reverse dependency graph keyed by source key.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    edges: RwLock<HashMap<String, Vec<String>>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a change to `source` requires rebuilding `affected`.
    pub fn add_dependency(&self, source: impl Into<String>, affected: impl Into<String>) {
        self.edges
            .write()
            .entry(source.into())
            .or_default()
            .push(affected.into());
    }

    /// Expand changed source keys into the set of files to recompile.
    ///
    /// A key without edges that names a compiled stylesheet is treated as a
    /// newly discovered source and affects itself. Anything else without edges
    /// (an orphaned partial, a plain asset) resolves to nothing.
    pub fn resolve_affected<I, S>(&self, changed: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let edges = self.edges.read();
        let mut affected = BTreeSet::new();

        for key in changed {
            let key = key.as_ref();
            match edges.get(key) {
                Some(list) if !list.is_empty() => affected.extend(list.iter().cloned()),
                _ if is_compiled_source(file_name(key)) => {
                    affected.insert(key.to_string());
                }
                _ => {}
            }
        }

        affected
    }

    /// Drop `affected` from every list before it is compiled again.
    pub fn forget_affected(&self, affected: &str) {
        let mut edges = self.edges.write();
        for list in edges.values_mut() {
            list.retain(|entry| entry != affected);
        }
    }

    /// Files recorded as affected by `source`, duplicates included.
    pub fn dependents(&self, source: &str) -> Vec<String> {
        self.edges.read().get(source).cloned().unwrap_or_default()
    }

    /// Wipe every edge. Called before the first compile of a full build.
    pub fn clear(&self) {
        self.edges.write().clear();
    }

    /// Number of sources with an edge list.
    pub fn len(&self) -> usize {
        self.edges.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.read().values().all(Vec::is_empty)
    }
}

impl DependencySink for &DependencyGraph {
    fn record(&mut self, source: &str, affected: &str) {
        self.add_dependency(source, affected);
    }
}
