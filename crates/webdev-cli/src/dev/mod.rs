//! Runtime behind `webdev dev`.
//!
//! - [`FileWatcher`] - `notify` watcher over every resource root, batching
//!   changes into source keys
//! - [`server`] - axum router: live routes plus the classes directory
//! - [`DevSession`] - wires both to the Sass pipeline and live reload

pub mod server;
mod session;
mod watcher;

pub use session::DevSession;
pub use watcher::{FileWatcher, WatchFilter};
