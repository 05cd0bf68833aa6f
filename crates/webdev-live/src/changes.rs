//! Added/removed/updated diffs against the resource snapshot.

use serde::Serialize;
use std::fmt;

use crate::error::Result;
use crate::snapshot::{regular_file_mtime, SnapshotStore, Stamp};

/// Changes detected in one notification cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub updated: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "added={:?} removed={:?} updated={:?}",
            self.added, self.removed, self.updated
        )
    }
}

/// What happened to one key during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Unchanged,
    Removed,
    Updated,
}

/// Diff every tracked resource against the disk and advance the snapshot.
///
/// `added` is always empty: new resources come in through
/// [`SnapshotStore::track`], not through this diff. A deleted file keeps its
/// entry as [`Stamp::Removed`], so re-creating it later reports `updated`.
///
/// Every key is read before any entry is advanced, so a failed pass leaves
/// the snapshot as it was and the next pass reports the same changes.
///
/// # Errors
///
/// Returns [`LiveError::Io`](crate::LiveError::Io) when an existing file's
/// metadata cannot be read.
pub fn compute_changes(store: &SnapshotStore) -> Result<ChangeSet> {
    let observed = store
        .keys()
        .into_iter()
        .map(|key| {
            let current = regular_file_mtime(&key.resolve(store.root()))?;
            Ok((key, current))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut changes = ChangeSet::default();
    for (key, current) in observed {
        match store.update(&key, |stamp| advance(stamp, current)) {
            Some(Transition::Removed) => changes.removed.push(key.into_string()),
            Some(Transition::Updated) => changes.updated.push(key.into_string()),
            Some(Transition::Unchanged) | None => {}
        }
    }

    Ok(changes)
}

fn advance(stamp: &mut Stamp, current: Option<std::time::SystemTime>) -> Transition {
    match (*stamp, current) {
        (Stamp::Unobserved, Some(modified)) => {
            *stamp = Stamp::Seen(modified);
            Transition::Unchanged
        }
        (Stamp::Unobserved | Stamp::Removed, None) => Transition::Unchanged,
        (Stamp::Seen(_), None) => {
            *stamp = Stamp::Removed;
            Transition::Removed
        }
        (Stamp::Removed, Some(modified)) => {
            *stamp = Stamp::Seen(modified);
            Transition::Updated
        }
        (Stamp::Seen(previous), Some(modified)) if modified > previous => {
            *stamp = Stamp::Seen(modified);
            Transition::Updated
        }
        (Stamp::Seen(_), Some(_)) => Transition::Unchanged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::ResourceKey;
    use std::fs;
    use std::path::Path;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn set_mtime(path: &Path, time: SystemTime) {
        fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    fn store_with(root: &Path, names: &[&str]) -> SnapshotStore {
        for name in names {
            fs::write(root.join(name.trim_start_matches('/')), "a{}").unwrap();
        }
        SnapshotStore::initialize(root, names.iter().copied(), &[".map"]).unwrap()
    }

    #[test]
    fn test_no_mutation_yields_empty_changes() {
        let temp = TempDir::new().unwrap();
        let store = store_with(temp.path(), &["/a.css", "/b.css"]);

        assert!(compute_changes(&store).unwrap().is_empty());
        assert!(compute_changes(&store).unwrap().is_empty());
    }

    #[test]
    fn test_newer_mtime_is_reported_once() {
        let temp = TempDir::new().unwrap();
        let store = store_with(temp.path(), &["/a.css", "/b.css"]);
        let file = temp.path().join("a.css");
        set_mtime(&file, SystemTime::now() + Duration::from_secs(5));

        let changes = compute_changes(&store).unwrap();
        assert_eq!(changes.updated, vec!["/a.css"]);
        assert!(changes.removed.is_empty());
        assert!(changes.added.is_empty());

        assert!(compute_changes(&store).unwrap().is_empty());
    }

    #[test]
    fn test_older_mtime_does_not_rewind_snapshot() {
        let temp = TempDir::new().unwrap();
        let store = store_with(temp.path(), &["/a.css"]);
        let key = ResourceKey::new("/a.css");
        let before = store.stamp(&key).and_then(|stamp| stamp.time()).unwrap();

        set_mtime(&temp.path().join("a.css"), before - Duration::from_secs(60));

        assert!(compute_changes(&store).unwrap().is_empty());
        assert_eq!(store.stamp(&key), Some(Stamp::Seen(before)));
    }

    #[test]
    fn test_deleted_file_is_removed_then_recreated_as_updated() {
        let temp = TempDir::new().unwrap();
        let store = store_with(temp.path(), &["/a.css"]);
        let file = temp.path().join("a.css");

        fs::remove_file(&file).unwrap();
        let changes = compute_changes(&store).unwrap();
        assert_eq!(changes.removed, vec!["/a.css"]);
        assert_eq!(store.stamp(&ResourceKey::new("/a.css")), Some(Stamp::Removed));

        // Second pass: still gone, nothing new to report.
        assert!(compute_changes(&store).unwrap().is_empty());

        fs::write(&file, "b{}").unwrap();
        let changes = compute_changes(&store).unwrap();
        assert_eq!(changes.updated, vec!["/a.css"]);
    }

    #[test]
    fn test_first_observation_is_silent() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::initialize(temp.path(), Vec::<String>::new(), &[".map"]).unwrap();
        store.track("/late.css");

        assert!(compute_changes(&store).unwrap().is_empty());

        fs::write(temp.path().join("late.css"), "a{}").unwrap();
        assert!(compute_changes(&store).unwrap().is_empty());
        assert!(matches!(
            store.stamp(&ResourceKey::new("/late.css")),
            Some(Stamp::Seen(_))
        ));
    }

    #[test]
    fn test_failed_pass_leaves_snapshot_untouched() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("sub")).unwrap();
        let store = store_with(temp.path(), &["/a.css", "/sub/x.css"]);
        let key = ResourceKey::new("/a.css");
        let before = store.stamp(&key).unwrap();

        set_mtime(&temp.path().join("a.css"), SystemTime::now() + Duration::from_secs(5));
        // A file where a directory was makes the nested path unreadable.
        fs::remove_dir_all(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("sub"), "").unwrap();

        assert!(compute_changes(&store).is_err());
        assert_eq!(store.stamp(&key), Some(before));

        fs::remove_file(temp.path().join("sub")).unwrap();
        fs::create_dir_all(temp.path().join("sub")).unwrap();
        let nested = temp.path().join("sub/x.css");
        fs::write(&nested, "b{}").unwrap();
        set_mtime(&nested, SystemTime::now() + Duration::from_secs(5));

        let changes = compute_changes(&store).unwrap();
        assert_eq!(changes.updated, vec!["/a.css", "/sub/x.css"]);
    }

    #[test]
    fn test_change_set_display() {
        let changes = ChangeSet {
            added: vec![],
            removed: vec!["/old.css".into()],
            updated: vec![],
        };
        assert_eq!(
            changes.to_string(),
            r#"added=[] removed=["/old.css"] updated=[]"#
        );
        assert!(!changes.is_empty());
    }
}
