//! Command implementations.
//!
//! - [`build`] - one full build
//! - [`dev`] - live reload server with watch mode
//!
//! Each command exposes an `execute` function taking its parsed arguments.

pub mod build;
pub mod dev;
pub(crate) mod utils;

pub use build::execute as build_execute;
pub use dev::execute as dev_execute;
