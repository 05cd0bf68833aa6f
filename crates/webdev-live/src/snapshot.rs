//! Last-known modification times of tracked web resources.
//!
//! The store is shared between the notification path (which diffs against it
//! on every build) and the addition path (which starts tracking new keys).
//! Every mutation goes through a single [`DashMap`] entry, so concurrent
//! cycles never lose each other's updates.

use dashmap::DashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{LiveError, Result};
use crate::path::ResourceKey;

/// Recorded state of one tracked resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stamp {
    /// Tracked but never observed on disk.
    Unobserved,
    /// Last modification time seen.
    Seen(SystemTime),
    /// Seen before, absent from disk on the last cycle.
    Removed,
}

impl Stamp {
    pub fn time(&self) -> Option<SystemTime> {
        match self {
            Stamp::Seen(time) => Some(*time),
            _ => None,
        }
    }
}

/// Snapshot of every tracked resource under one root directory.
#[derive(Debug)]
pub struct SnapshotStore {
    root: PathBuf,
    excluded_suffixes: Vec<String>,
    entries: DashMap<ResourceKey, Stamp>,
}

impl SnapshotStore {
    /// Record the current modification time of every resource that exists.
    ///
    /// Resources whose file is missing or not a regular file are left out, as
    /// are names ending with one of `excluded_suffixes`.
    ///
    /// # Errors
    ///
    /// Returns [`LiveError::RootMissing`] when `root` is not a directory, and
    /// [`LiveError::Io`] when an existing file's metadata cannot be read.
    pub fn initialize<I, S>(
        root: impl Into<PathBuf>,
        resources: I,
        excluded_suffixes: &[S],
    ) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        S: AsRef<str>,
    {
        let root = root.into();
        if !root.is_dir() {
            return Err(LiveError::RootMissing(root));
        }

        let store = Self {
            root,
            excluded_suffixes: excluded_suffixes
                .iter()
                .map(|suffix| suffix.as_ref().to_string())
                .collect(),
            entries: DashMap::new(),
        };

        for name in resources {
            let key = ResourceKey::new(name.as_ref());
            if store.is_excluded(&key) {
                continue;
            }
            let file = key.resolve(&store.root);
            if let Some(modified) = regular_file_mtime(&file)? {
                store.entries.insert(key, Stamp::Seen(modified));
            }
        }

        tracing::debug!(
            root = %store.root.display(),
            tracked = store.entries.len(),
            "initialized resource snapshot"
        );
        Ok(store)
    }

    /// [`initialize`](Self::initialize) with every file currently under `root`.
    ///
    /// # Errors
    ///
    /// As for `initialize`, plus directory walk failures.
    pub fn scan<S: AsRef<str>>(root: impl Into<PathBuf>, excluded_suffixes: &[S]) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(LiveError::RootMissing(root));
        }

        let mut resources = Vec::new();
        for entry in walkdir::WalkDir::new(&root).sort_by_file_name() {
            let entry = entry.map_err(|err| {
                let path = err.path().unwrap_or(root.as_path()).to_path_buf();
                LiveError::io(path, err.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(key) = ResourceKey::from_path(entry.path(), &root) {
                resources.push(key.into_string());
            }
        }

        Self::initialize(root, resources, excluded_suffixes)
    }

    /// Start tracking `key` without a timestamp.
    ///
    /// Returns `true` when the key was not tracked before. Excluded names are
    /// ignored.
    pub fn track(&self, key: impl Into<ResourceKey>) -> bool {
        let key = key.into();
        if self.is_excluded(&key) {
            return false;
        }
        let mut inserted = false;
        self.entries.entry(key).or_insert_with(|| {
            inserted = true;
            Stamp::Unobserved
        });
        inserted
    }

    pub fn stamp(&self, key: &ResourceKey) -> Option<Stamp> {
        self.entries.get(key).map(|entry| *entry.value())
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Tracked keys in sorted order.
    pub fn keys(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<_> = self.entries.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_excluded(&self, key: &ResourceKey) -> bool {
        key.matches_suffix(&self.excluded_suffixes)
    }

    /// Apply `update` to the entry of `key` while holding its lock.
    ///
    /// Returns `None` when the key is not tracked.
    pub(crate) fn update<R>(
        &self,
        key: &ResourceKey,
        update: impl FnOnce(&mut Stamp) -> R,
    ) -> Option<R> {
        self.entries.get_mut(key).map(|mut entry| update(entry.value_mut()))
    }
}

/// Modification time of a regular file, `None` if it is absent or not a file.
pub(crate) fn regular_file_mtime(path: &Path) -> Result<Option<SystemTime>> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => metadata
            .modified()
            .map(Some)
            .map_err(|source| LiveError::io(path, source)),
        Ok(_) => Ok(None),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(LiveError::io(path, source)),
    }
}
