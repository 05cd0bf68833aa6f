//! Development-mode live reload and incremental stylesheet rebuilds.
//!
//! This crate contains the engine that sits between a file watcher and the
//! browser during development:
//!
//! - [`snapshot`] - last-known modification times of every tracked web resource
//! - [`changes`] - added/removed/updated diffs against that snapshot
//! - [`graph`] - reverse source dependencies (partial → stylesheets importing it)
//! - [`compiler`] - the `Compiler` seam plus the in-process and Sass CLI implementations
//! - [`rebuild`] - recompiles affected stylesheets and removes stale outputs
//! - [`hub`] / [`event`] - long-lived push connections and their wire format
//! - [`server`] - the axum routes serving the event stream and the browser client
//! - [`notify`] / [`reload`] / [`pipeline`] - wiring the pieces together
//!
//! # Control flow
//!
//! ```text
//! watcher ──keys──▶ SassPipeline ──resolve──▶ DependencyGraph
//!                       │
//!                       ├──rebuild──▶ Rebuilder ──compile──▶ Compiler
//!                       │
//!                       └──sentinel──▶ ChangeBus ──▶ LiveReload ──diff──▶ SnapshotStore
//!                                                       │
//!                                                       └──events──▶ LiveHub ──SSE──▶ browsers
//! ```

pub mod changes;
pub mod compiler;
pub mod error;
pub mod event;
pub mod graph;
pub mod hub;
pub mod notify;
pub mod path;
pub mod pipeline;
pub mod rebuild;
pub mod reload;
pub mod server;
pub mod snapshot;

pub use changes::{compute_changes, ChangeSet};
pub use compiler::{
    from_fn, CompileError, CompileFailure, CompileUnit, Compiler, DependencySink, InlineCompiler,
    SassCliCompiler,
};
pub use error::{LiveError, Result};
pub use event::LiveEvent;
pub use graph::DependencyGraph;
pub use hub::{HubError, LiveHub, Subscription, DEFAULT_HEARTBEAT, DEFAULT_MAX_CONNECTIONS};
pub use notify::{BuildOutcome, ChangeBus, Listener, NotificationSource, Registration, Sentinel};
pub use path::ResourceKey;
pub use pipeline::SassPipeline;
pub use rebuild::{DeletePolicy, RebuildOptions, RebuildReport, Rebuilder};
pub use reload::{LiveReload, LiveSettings};
pub use server::{live_router, LiveRoutes};
pub use snapshot::{SnapshotStore, Stamp};

/// Default namespace used for sentinel keys and endpoint paths.
pub const DEFAULT_NAMESPACE: &str = "web-bundler";

/// Suffixes that are never tracked (generated source maps).
pub const DEFAULT_EXCLUDED_SUFFIXES: &[&str] = &[".map"];
