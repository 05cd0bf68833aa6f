//! File system watcher over the resource roots, with debouncing.
//!
//! Raw `notify` events are filtered and mapped to source keys on the watcher
//! thread, then collected into batches: a batch is sent once no new change
//! arrived for the debounce window.

use glob::Pattern;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::{CliError, Result};

/// Decides which paths matter and what their source key is.
#[derive(Debug, Clone)]
pub struct WatchFilter {
    roots: Vec<PathBuf>,
    ignore: Vec<Pattern>,
    excluded_dirs: Vec<PathBuf>,
}

impl WatchFilter {
    /// # Errors
    ///
    /// `CliError::InvalidPattern` for a malformed glob.
    pub fn new(roots: Vec<PathBuf>, patterns: &[String]) -> Result<Self> {
        let ignore = patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|source| CliError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            roots: roots.iter().map(|root| canonical(root)).collect(),
            ignore,
            excluded_dirs: Vec::new(),
        })
    }

    /// Never report paths under `dir`, e.g. an output directory inside a root.
    pub fn excluding(mut self, dir: &Path) -> Self {
        self.excluded_dirs.push(canonical(dir));
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Source key of `path` relative to the first root holding it.
    ///
    /// `None` for paths outside every root, inside an excluded directory,
    /// hidden (any component starting with `.`), or matching an ignore pattern.
    pub fn source_key(&self, path: &Path) -> Option<String> {
        if self.excluded_dirs.iter().any(|dir| path.starts_with(dir)) {
            return None;
        }

        let root = self.roots.iter().find(|root| path.starts_with(root))?;
        let relative = path.strip_prefix(root).ok()?;

        let hidden = relative
            .components()
            .filter_map(|component| component.as_os_str().to_str())
            .any(|name| name.starts_with('.'));
        if hidden {
            return None;
        }

        let key = webdev_live::path::source_key(path, root)?;
        let name = webdev_live::path::file_name(&key);
        if self
            .ignore
            .iter()
            .any(|pattern| pattern.matches(&key) || pattern.matches(name))
        {
            return None;
        }
        Some(key)
    }
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Recursive watcher over every root of a [`WatchFilter`].
///
/// Dropping it stops watching; the batch channel then closes.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    roots: Vec<PathBuf>,
}

impl FileWatcher {
    /// Start watching. Must be called within a tokio runtime.
    ///
    /// Returns the watcher and the receiver of debounced key batches.
    ///
    /// # Errors
    ///
    /// `CliError::RootNotFound` for a missing root, `CliError::Watch` when
    /// the platform watcher cannot be set up.
    pub fn new(filter: WatchFilter, debounce: Duration) -> Result<(Self, mpsc::Receiver<Vec<String>>)> {
        for root in filter.roots() {
            if !root.is_dir() {
                return Err(CliError::RootNotFound(root.clone()));
            }
        }

        let roots = filter.roots().to_vec();
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (batch_tx, batch_rx) = mpsc::channel(16);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) {
                    return;
                }
                for path in &event.paths {
                    if let Some(key) = filter.source_key(path) {
                        let _ = raw_tx.send(key);
                    }
                }
            }
            Err(err) => tracing::warn!(error = %err, "file watcher error"),
        })?;

        for root in &roots {
            watcher.watch(root, RecursiveMode::Recursive)?;
            tracing::debug!(root = %root.display(), "watching resource root");
        }

        tokio::spawn(debounce_batches(raw_rx, batch_tx, debounce));

        Ok((
            Self {
                _watcher: watcher,
                roots,
            },
            batch_rx,
        ))
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

/// Collect keys until `window` passes without a new one, then send the batch.
pub(crate) async fn debounce_batches(
    mut raw: mpsc::UnboundedReceiver<String>,
    batches: mpsc::Sender<Vec<String>>,
    window: Duration,
) {
    while let Some(first) = raw.recv().await {
        let mut batch = BTreeSet::from([first]);
        let mut open = true;
        while open {
            match tokio::time::timeout(window, raw.recv()).await {
                Ok(Some(key)) => {
                    batch.insert(key);
                }
                Ok(None) => open = false,
                Err(_) => break,
            }
        }

        tracing::debug!(changed = batch.len(), "debounced file changes");
        if batches.send(batch.into_iter().collect()).await.is_err() || !open {
            return;
        }
    }
}
