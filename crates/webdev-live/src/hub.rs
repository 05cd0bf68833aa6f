//! Long-lived push connections to browsers.
//!
//! Connection lifecycle:
//!
//! ```text
//! open() ──cap ok──▶ Open ──client gone / bundling-error / shutdown──▶ Closed
//!    │
//!    └──cap reached──▶ HubError::TooManyConnections
//! ```
//!
//! The connection list is copy-on-write: broadcasts iterate the snapshot that
//! was current when they started, while opens and closes swap in a new list.
//! Every connection owns a bounded channel feeding its response body; slow
//! readers lose events instead of stalling the broadcaster.

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::AbortHandle;
use tokio_stream::Stream;
use tokio_stream::wrappers::ReceiverStream;

use crate::changes::ChangeSet;
use crate::event::LiveEvent;

/// Default number of concurrent sessions.
pub const DEFAULT_MAX_CONNECTIONS: usize = 2;

/// Default heartbeat period.
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(30);

const DEFAULT_BUFFER: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HubError {
    #[error("too many live reload connections (limit is {max})")]
    TooManyConnections { max: usize },
}

/// Fan-out point for live reload events. Cheap to clone.
#[derive(Clone)]
pub struct LiveHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    connections: ArcSwap<Vec<Arc<Connection>>>,
    next_id: AtomicU64,
    max_connections: usize,
    heartbeat: Duration,
    buffer: usize,
}

struct Connection {
    id: u64,
    events: AtomicU64,
    closed: AtomicBool,
    sender: Mutex<Option<mpsc::Sender<String>>>,
    heartbeat: Mutex<Option<AbortHandle>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Sent,
    Dropped,
    Closed,
}

impl Connection {
    fn send(&self, event: &LiveEvent) -> Delivery {
        if self.closed.load(Ordering::Acquire) {
            return Delivery::Closed;
        }
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            return Delivery::Closed;
        };
        let id = self.events.fetch_add(1, Ordering::SeqCst);
        match sender.try_send(event.encode(id)) {
            Ok(()) => Delivery::Sent,
            Err(TrySendError::Full(_)) => Delivery::Dropped,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Runs the teardown once; later calls return `false`.
    fn teardown(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Some(heartbeat) = self.heartbeat.lock().take() {
            heartbeat.abort();
        }
        // Dropping the sender ends the response body after buffered frames.
        self.sender.lock().take();
        true
    }
}

impl Default for LiveHub {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONNECTIONS, DEFAULT_HEARTBEAT)
    }
}

impl std::fmt::Debug for LiveHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveHub")
            .field("connections", &self.connection_count())
            .field("max_connections", &self.inner.max_connections)
            .field("heartbeat", &self.inner.heartbeat)
            .finish()
    }
}

impl LiveHub {
    pub fn new(max_connections: usize, heartbeat: Duration) -> Self {
        Self {
            inner: Arc::new(HubInner {
                connections: ArcSwap::from_pointee(Vec::new()),
                next_id: AtomicU64::new(0),
                max_connections,
                heartbeat,
                buffer: DEFAULT_BUFFER,
            }),
        }
    }

    /// Per-connection event buffer; events beyond it are dropped.
    pub fn with_buffer(self, buffer: usize) -> Self {
        let inner = HubInner {
            connections: ArcSwap::from_pointee(Vec::new()),
            next_id: AtomicU64::new(0),
            max_connections: self.inner.max_connections,
            heartbeat: self.inner.heartbeat,
            buffer: buffer.max(1),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Open a session: queue the `connect` event and start its heartbeat.
    ///
    /// The heartbeat is only scheduled when called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// [`HubError::TooManyConnections`] when the cap is reached; nothing is
    /// registered in that case.
    pub fn open(&self) -> Result<Subscription, HubError> {
        let (sender, receiver) = mpsc::channel(self.inner.buffer);
        let connection = Arc::new(Connection {
            id: self.inner.next_id.fetch_add(1, Ordering::Relaxed),
            events: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            sender: Mutex::new(Some(sender)),
            heartbeat: Mutex::new(None),
        });
        // Queued before the connection becomes visible to broadcasts, so it gets id 0.
        connection.send(&LiveEvent::Connect);

        let max = self.inner.max_connections;
        let mut accepted = false;
        self.inner.connections.rcu(|current| {
            accepted = current.len() < max;
            if accepted {
                let mut next = Vec::with_capacity(current.len() + 1);
                next.extend(current.iter().cloned());
                next.push(Arc::clone(&connection));
                Arc::new(next)
            } else {
                Arc::clone(current)
            }
        });

        if !accepted {
            tracing::debug!(max, "rejected live reload connection");
            return Err(HubError::TooManyConnections { max });
        }

        self.start_heartbeat(&connection);
        tracing::debug!(
            id = connection.id,
            open = self.connection_count(),
            "live reload connection opened"
        );

        Ok(Subscription {
            id: connection.id,
            receiver: ReceiverStream::new(receiver),
            hub: Arc::downgrade(&self.inner),
        })
    }

    fn start_heartbeat(&self, connection: &Arc<Connection>) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(id = connection.id, "no runtime, heartbeat disabled");
            return;
        };
        let period = self.inner.heartbeat;
        let hub = Arc::downgrade(&self.inner);
        let weak = Arc::downgrade(connection);

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let (Some(hub), Some(connection)) = (hub.upgrade(), weak.upgrade()) else {
                    break;
                };
                match connection.send(&LiveEvent::Ping) {
                    Delivery::Sent | Delivery::Dropped => {}
                    Delivery::Closed => {
                        LiveHub { inner: hub }.close(connection.id);
                        break;
                    }
                }
            }
        });
        *connection.heartbeat.lock() = Some(task.abort_handle());

        // Closed while the task was being spawned.
        if connection.closed.load(Ordering::Acquire) {
            if let Some(heartbeat) = connection.heartbeat.lock().take() {
                heartbeat.abort();
            }
        }
    }

    /// Send `event` to every open connection. Returns how many received it.
    pub fn broadcast(&self, event: &LiveEvent) -> usize {
        let connections = self.inner.connections.load_full();
        let mut delivered = 0;

        for connection in connections.iter() {
            match connection.send(event) {
                Delivery::Sent => delivered += 1,
                Delivery::Dropped => {
                    tracing::warn!(
                        id = connection.id,
                        event = event.name(),
                        "live reload client is not reading, event dropped"
                    );
                }
                Delivery::Closed => {
                    self.close(connection.id);
                }
            }
        }
        delivered
    }

    /// Broadcast a `change` event unless `changes` is empty.
    pub fn notify_changes(&self, changes: &ChangeSet) -> usize {
        if changes.is_empty() {
            return 0;
        }
        self.broadcast(&LiveEvent::Change(changes.clone()))
    }

    /// Send `bundling-error` to every connection, then close them all.
    pub fn notify_build_error(&self) -> usize {
        let delivered = self.broadcast(&LiveEvent::BundlingError);
        self.close_all();
        delivered
    }

    /// Close one connection. Returns `false` when it was already closed.
    pub fn close(&self, id: u64) -> bool {
        let connections = self.inner.connections.load_full();
        let torn_down = connections
            .iter()
            .find(|connection| connection.id == id)
            .is_some_and(|connection| connection.teardown());

        self.inner.connections.rcu(|current| {
            Arc::new(
                current
                    .iter()
                    .filter(|connection| connection.id != id)
                    .cloned()
                    .collect::<Vec<_>>(),
            )
        });

        if torn_down {
            tracing::debug!(id, open = self.connection_count(), "live reload connection closed");
        }
        torn_down
    }

    /// Close every connection.
    pub fn shutdown(&self) {
        let closed = self.close_all();
        tracing::debug!(closed, "live reload hub shut down");
    }

    fn close_all(&self) -> usize {
        let connections = self.inner.connections.swap(Arc::new(Vec::new()));
        connections
            .iter()
            .filter(|connection| connection.teardown())
            .count()
    }

    pub fn connection_count(&self) -> usize {
        self.inner.connections.load().len()
    }

    pub fn is_full(&self) -> bool {
        self.connection_count() >= self.inner.max_connections
    }

    pub fn max_connections(&self) -> usize {
        self.inner.max_connections
    }
}

/// The receiving end of one session: a stream of encoded frames.
///
/// Dropping it closes the connection.
pub struct Subscription {
    id: u64,
    receiver: ReceiverStream<String>,
    hub: Weak<HubInner>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Stream for Subscription {
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_next(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.hub.upgrade() {
            LiveHub { inner }.close(self.id);
        }
    }
}
