//! HTTP server of the dev session.
//!
//! The live routes are mounted first; every other request is served from the
//! classes directory. CORS is open because pages are usually served by
//! another server on another port.

use axum::Router;
use std::future::Future;
use std::path::Path;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use webdev_live::{LiveHub, LiveRoutes, live_router};

use crate::error::{CliError, Result};

pub fn router(hub: LiveHub, routes: &LiveRoutes, classes_dir: &Path) -> Router {
    live_router(hub, routes)
        .fallback_service(ServeDir::new(classes_dir))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Serve `app` until `shutdown` resolves and open connections finish.
///
/// # Errors
///
/// `CliError::Server` when accepting connections fails.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|err| CliError::Server(err.to_string()))
}
