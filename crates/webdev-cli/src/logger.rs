//! Logging setup on top of `tracing-subscriber`.
//!
//! The filter is chosen in this order:
//! 1. `--verbose`: debug for the webdev crates
//! 2. `--quiet`: errors only
//! 3. `RUST_LOG`
//! 4. info for the webdev crates

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const CRATES: &[&str] = &["webdev", "webdev_cli", "webdev_config", "webdev_live"];

/// Filter directives for the given flags, `None` when `RUST_LOG` decides.
pub fn directives(verbose: bool, quiet: bool) -> Option<String> {
    if verbose {
        Some(directives_at("debug"))
    } else if quiet {
        Some(directives_at("error"))
    } else {
        None
    }
}

fn directives_at(level: &str) -> String {
    CRATES
        .iter()
        .map(|name| format!("{name}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = match directives(verbose, quiet) {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(directives_at("info"))),
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && crate::ui::should_use_color())
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
