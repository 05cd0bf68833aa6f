//! Turns build notifications into browser events.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::{Arc, Weak};

use crate::changes::{compute_changes, ChangeSet};
use crate::error::Result;
use crate::hub::LiveHub;
use crate::notify::{BuildOutcome, NotificationSource, Registration, Sentinel};
use crate::snapshot::SnapshotStore;
use crate::DEFAULT_NAMESPACE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveSettings {
    /// Namespace of the sentinel keys.
    pub namespace: String,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

/// Listens for build notifications, diffs the snapshot and pushes the result.
///
/// Notifications without a sentinel key are ignored. Other keys in a
/// notification are resource keys of outputs the build touched; unknown ones
/// start being tracked, which is how new files enter the snapshot.
pub struct LiveReload {
    inner: Arc<ReloadInner>,
    registration: Mutex<Option<Registration>>,
}

struct ReloadInner {
    sentinel: Sentinel,
    snapshot: Arc<SnapshotStore>,
    hub: LiveHub,
}

impl LiveReload {
    /// Register on `source` and start reacting to its notifications.
    pub fn new(
        settings: LiveSettings,
        snapshot: Arc<SnapshotStore>,
        hub: LiveHub,
        source: &dyn NotificationSource,
    ) -> Self {
        let inner = Arc::new(ReloadInner {
            sentinel: Sentinel::new(&settings.namespace),
            snapshot,
            hub,
        });

        let weak: Weak<ReloadInner> = Arc::downgrade(&inner);
        let registration = source.subscribe(Arc::new(move |keys: &HashSet<String>| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if let Err(err) = inner.handle(keys) {
                tracing::error!(error = %err, "failed to compute live reload changes");
            }
        }));

        Self {
            inner,
            registration: Mutex::new(Some(registration)),
        }
    }

    /// Process one notification. Returns the change set when it was acted on.
    ///
    /// # Errors
    ///
    /// Propagates metadata read failures from the diff.
    pub fn handle(&self, keys: &HashSet<String>) -> Result<Option<ChangeSet>> {
        self.inner.handle(keys)
    }

    pub fn hub(&self) -> &LiveHub {
        &self.inner.hub
    }

    pub fn snapshot(&self) -> &Arc<SnapshotStore> {
        &self.inner.snapshot
    }

    /// Stop listening and close every browser connection.
    pub fn shutdown(&self) {
        if let Some(mut registration) = self.registration.lock().take() {
            registration.cancel();
        }
        self.inner.hub.shutdown();
    }
}

impl Drop for LiveReload {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl ReloadInner {
    fn handle(&self, keys: &HashSet<String>) -> Result<Option<ChangeSet>> {
        let Some(outcome) = self.sentinel.classify(keys) else {
            return Ok(None);
        };

        for key in keys.iter().filter(|key| !self.sentinel.is_sentinel(key)) {
            if self.snapshot.track(key.as_str()) {
                tracing::debug!(key = %key, "tracking new resource");
            }
        }

        let changes = compute_changes(&self.snapshot)?;
        if !changes.is_empty() {
            tracing::info!(%changes, "resources changed");
        }

        match outcome {
            BuildOutcome::Error => {
                let notified = self.hub.notify_build_error();
                tracing::info!(notified, "reported build error to live reload clients");
            }
            BuildOutcome::Success => {
                let notified = self.hub.notify_changes(&changes);
                if notified > 0 {
                    tracing::debug!(notified, "pushed changes to live reload clients");
                }
            }
        }
        Ok(Some(changes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ChangeBus;
    use std::fs;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;
    use tokio_stream::StreamExt;

    fn keys(items: &[&str]) -> HashSet<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    fn setup() -> (TempDir, ChangeBus, LiveReload) {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("app.css");
        fs::write(&file, "a{}").unwrap();
        fs::File::options()
            .write(true)
            .open(&file)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(60))
            .unwrap();

        let snapshot =
            Arc::new(SnapshotStore::initialize(temp.path(), ["/app.css"], &[".map"]).unwrap());
        let bus = ChangeBus::new();
        let reload = LiveReload::new(LiveSettings::default(), snapshot, LiveHub::default(), &bus);
        (temp, bus, reload)
    }

    #[tokio::test]
    async fn test_notification_without_sentinel_is_ignored() {
        let (temp, _bus, reload) = setup();
        fs::write(temp.path().join("app.css"), "b{}").unwrap();

        assert_eq!(reload.handle(&keys(&["/app.css"])).unwrap(), None);
    }

    #[tokio::test]
    async fn test_build_success_pushes_changes() {
        let (temp, bus, reload) = setup();
        let mut subscription = reload.hub().open().unwrap();
        subscription.next().await.unwrap();

        fs::write(temp.path().join("app.css"), "b{}").unwrap();
        bus.publish(&keys(&["web-bundler/build-success"]));

        let frame = subscription.next().await.unwrap();
        assert!(frame.contains("event: change"));
        assert!(frame.contains(r#""updated":["/app.css"]"#));
    }

    #[tokio::test]
    async fn test_new_output_is_tracked_silently() {
        let (temp, _bus, reload) = setup();
        fs::write(temp.path().join("new.css"), "n{}").unwrap();

        let changes = reload
            .handle(&keys(&["web-bundler/build-success", "/new.css"]))
            .unwrap()
            .unwrap();

        assert!(changes.is_empty());
        assert!(reload.snapshot().contains(&"/new.css".into()));
    }

    #[tokio::test]
    async fn test_build_error_sends_only_bundling_error() {
        let (temp, bus, reload) = setup();
        let mut subscription = reload.hub().open().unwrap();
        subscription.next().await.unwrap();

        fs::write(temp.path().join("app.css"), "b{}").unwrap();
        bus.publish(&keys(&["web-bundler/build-error"]));

        assert_eq!(
            subscription.next().await.unwrap(),
            "id: 1\nevent: bundling-error\n\n"
        );
        assert!(subscription.next().await.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_unregisters_and_closes() {
        let (_temp, bus, reload) = setup();
        let mut subscription = reload.hub().open().unwrap();
        assert_eq!(bus.listener_count(), 1);

        reload.shutdown();

        assert_eq!(bus.listener_count(), 0);
        subscription.next().await.unwrap();
        assert!(subscription.next().await.is_none());
    }
}
