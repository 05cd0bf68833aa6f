//! Command line interface of the webdev live reload server.
//!
//! - [`cli`] - argument definitions
//! - `commands` - `dev` and `build`
//! - `dev` - file watching and the HTTP server behind `webdev dev`
//! - [`error`] - CLI errors and their miette rendering
//! - [`logger`] - tracing setup
//! - [`ui`] - status lines on stderr

pub mod cli;
pub mod commands;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result};
