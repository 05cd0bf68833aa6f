//! `webdev dev`: live reload server with watch mode.
//!
//! 1. load and validate the configuration
//! 2. full build, failures reported but not fatal
//! 3. snapshot the classes directory
//! 4. serve the live routes and the classes directory
//! 5. rebuild on debounced changes until Ctrl+C

use tokio::signal;

use crate::cli::DevArgs;
use crate::commands::utils;
use crate::dev::DevSession;
use crate::error::Result;
use crate::ui;

/// Execute the dev command.
///
/// # Errors
///
/// Invalid configuration, a missing resource root, a port already in use,
/// or a watcher that cannot be set up.
pub async fn execute(args: DevArgs) -> Result<()> {
    ui::info("Starting webdev dev server...");
    let config = utils::load_config(&args.build, args.overrides())?;
    ui::info(&format!(
        "Compiler: {} | classes: {}",
        config.compiler,
        config.classes_dir.display()
    ));

    let session = DevSession::start(config).await?;
    let addr = session.local_addr();
    ui::success(&format!("Dev server running at http://{addr}"));
    ui::info(&format!(
        "Add <script src=\"http://{addr}{}\"></script> to your pages",
        session.routes().script_path
    ));
    ui::info("Press Ctrl+C to stop");

    session
        .run_until(async {
            if let Err(err) = signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
            ui::info("Shutting down dev server...");
        })
        .await?;

    ui::success("Dev server stopped");
    Ok(())
}
