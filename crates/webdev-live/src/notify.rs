//! Change notifications between the build side and the live reload side.
//!
//! Listeners are registered on a [`NotificationSource`] handed over at
//! assembly time. Each notification is the set of logical keys that changed;
//! two reserved [`Sentinel`] keys report the outcome of the build itself.

use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::DEFAULT_NAMESPACE;

/// Callback invoked with every published key set.
pub type Listener = Arc<dyn Fn(&HashSet<String>) + Send + Sync>;

/// Something that delivers change notifications.
pub trait NotificationSource: Send + Sync {
    fn subscribe(&self, listener: Listener) -> Registration;
}

/// Handle to a registered listener. Dropping it unregisters the listener.
#[must_use = "dropping a registration unregisters its listener"]
pub struct Registration {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Registration {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A registration with nothing to undo.
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    /// Unregister the listener. Later calls do nothing.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("active", &self.is_active())
            .finish()
    }
}

/// In-process notification source. Cheap to clone.
#[derive(Clone, Default)]
pub struct ChangeBus {
    inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    listeners: RwLock<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `keys` to every listener. Returns how many were called.
    ///
    /// Listeners run on the calling thread, outside the registry lock, so they
    /// may subscribe or cancel while being notified.
    pub fn publish(&self, keys: &HashSet<String>) -> usize {
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in &listeners {
            listener(keys);
        }
        listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().len()
    }
}

impl std::fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl NotificationSource for ChangeBus {
    fn subscribe(&self, listener: Listener) -> Registration {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.write().push((id, listener));

        let inner = Arc::downgrade(&self.inner);
        Registration::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.listeners.write().retain(|(entry, _)| *entry != id);
            }
        })
    }
}

/// Outcome carried by a sentinel key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    Success,
    Error,
}

/// Reserved keys `<namespace>/build-success` and `<namespace>/build-error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentinel {
    success: String,
    error: String,
}

impl Sentinel {
    pub fn new(namespace: &str) -> Self {
        let namespace = namespace.trim_matches('/');
        Self {
            success: format!("{namespace}/build-success"),
            error: format!("{namespace}/build-error"),
        }
    }

    pub fn success_key(&self) -> &str {
        &self.success
    }

    pub fn error_key(&self) -> &str {
        &self.error
    }

    /// The build outcome a notification reports, if any. Errors win.
    pub fn classify(&self, keys: &HashSet<String>) -> Option<BuildOutcome> {
        if keys.contains(&self.error) {
            Some(BuildOutcome::Error)
        } else if keys.contains(&self.success) {
            Some(BuildOutcome::Success)
        } else {
            None
        }
    }

    /// True for the two reserved keys.
    pub fn is_sentinel(&self, key: &str) -> bool {
        key == self.success || key == self.error
    }
}

impl Default for Sentinel {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}
