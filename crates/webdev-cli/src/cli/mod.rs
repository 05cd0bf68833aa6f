//! Command-line interface definition.
//!
//! - `webdev dev` - initial build, live reload server and watch mode
//! - `webdev build` - one full build

mod commands;
pub mod enums;
#[cfg(test)]
mod tests;

use clap::Parser;

pub use commands::{BuildArgs, BuildOptions, Command, DevArgs};
pub use enums::CompilerArg;

/// webdev - Sass dev server with live reload
#[derive(Parser, Debug)]
#[command(
    name = "webdev",
    version,
    about = "Sass dev server with incremental rebuilds and live reload",
    long_about = "webdev compiles the stylesheets of a web resource tree, recompiles only\n\
                  what a change affects, and pushes change events to connected browsers."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}
