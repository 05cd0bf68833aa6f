//! `webdev build`: compile every stylesheet once.

use std::time::Instant;

use crate::cli::BuildArgs;
use crate::commands::utils;
use crate::error::Result;
use crate::ui;

/// Execute the build command.
///
/// # Errors
///
/// Configuration and I/O failures, and `BuildFailed` when any stylesheet
/// did not compile. Outputs of the stylesheets that did compile are kept.
pub async fn execute(args: BuildArgs) -> Result<()> {
    let config = utils::load_config(&args.build, args.build.overrides())?;
    let rebuilder = utils::rebuilder(&config);
    ui::info(&format!(
        "Compiling stylesheets with the {} compiler",
        config.compiler
    ));

    let started = Instant::now();
    let report = tokio::task::spawn_blocking(move || rebuilder.full_build()).await??;
    ui::print_build_summary(&report, started.elapsed(), &config.classes_dir);

    report.into_result()?;
    Ok(())
}
