//! webdev - Sass dev server with incremental rebuilds and live reload.
//!
//! Parses the command line, sets up logging and dispatches to a command.

use clap::Parser;
use miette::Result;
use webdev_cli::{cli, commands, error, logger, ui};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    let result = match args.command {
        cli::Command::Dev(dev_args) => commands::dev_execute(dev_args).await,
        cli::Command::Build(build_args) => commands::build_execute(build_args).await,
    };

    result.map_err(error::to_report)
}
