//! One running dev session: build, snapshot, serve, watch.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use webdev_config::WebdevConfig;
use webdev_live::{
    ChangeBus, LiveHub, LiveReload, LiveRoutes, LiveSettings, SassPipeline, SnapshotStore,
};

use crate::commands::utils;
use crate::dev::server;
use crate::dev::watcher::{FileWatcher, WatchFilter};
use crate::error::{CliError, Result};
use crate::ui;

/// A started dev session.
///
/// Startup order matters: the full build runs before the snapshot is taken,
/// so the first browser event only reports what changed after startup.
pub struct DevSession {
    addr: SocketAddr,
    routes: LiveRoutes,
    classes_dir: PathBuf,
    pipeline: Arc<SassPipeline>,
    reload: LiveReload,
    server: JoinHandle<Result<()>>,
    stop_server: oneshot::Sender<()>,
    _watcher: FileWatcher,
    batches: mpsc::Receiver<Vec<String>>,
}

impl DevSession {
    /// Build everything, then start the server and the watcher.
    ///
    /// Compile failures of the initial build are printed, not returned, so the
    /// browser can pick up the fix on the next save.
    ///
    /// # Errors
    ///
    /// I/O failures of the build or the snapshot, binding the listener, and
    /// setting up the watcher.
    pub async fn start(config: WebdevConfig) -> Result<Self> {
        tokio::fs::create_dir_all(&config.classes_dir).await?;

        let bus = ChangeBus::new();
        let pipeline = Arc::new(SassPipeline::new(
            utils::rebuilder(&config),
            bus.clone(),
            &config.namespace,
        ));

        ui::info("Performing initial build...");
        let started = Instant::now();
        let report = {
            let pipeline = Arc::clone(&pipeline);
            tokio::task::spawn_blocking(move || pipeline.full_build()).await??
        };
        ui::print_failures(&report);
        ui::print_build_summary(&report, started.elapsed(), &config.classes_dir);

        let snapshot = Arc::new(SnapshotStore::scan(
            &config.classes_dir,
            &config.excluded_suffixes,
        )?);
        tracing::debug!(tracked = snapshot.len(), "snapshot taken");

        let hub = LiveHub::new(config.live.max_connections, config.live.heartbeat());
        let reload = LiveReload::new(
            LiveSettings {
                namespace: config.namespace.clone(),
            },
            snapshot,
            hub.clone(),
            &bus,
        );

        let routes = LiveRoutes::for_namespace(&config.namespace).with_live_path(config.live_path());
        let app = server::router(hub, &routes, &config.classes_dir);
        let (host, port) = (config.server.host.as_str(), config.server.port);
        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|err| CliError::Server(format!("Failed to bind to {host}:{port}: {err}")))?;
        let addr = listener.local_addr()?;

        let (stop_server, stopped) = oneshot::channel::<()>();
        let server = tokio::spawn(server::serve(listener, app, async move {
            let _ = stopped.await;
        }));

        let filter = WatchFilter::new(config.resource_roots.clone(), &config.watch.ignore)?
            .excluding(&config.classes_dir);
        let (watcher, batches) = FileWatcher::new(filter, config.watch.debounce())?;

        Ok(Self {
            addr,
            routes,
            classes_dir: config.classes_dir,
            pipeline,
            reload,
            server,
            stop_server,
            _watcher: watcher,
            batches,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn routes(&self) -> &LiveRoutes {
        &self.routes
    }

    pub fn live_reload(&self) -> &LiveReload {
        &self.reload
    }

    /// Process change batches until `stop` resolves, then shut down.
    ///
    /// Browser connections are closed before the server stops, which lets
    /// the graceful shutdown finish.
    ///
    /// # Errors
    ///
    /// A server that failed on its own.
    pub async fn run_until<F>(mut self, stop: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(stop);
        let mut finished = None;

        loop {
            tokio::select! {
                Some(batch) = self.batches.recv() => self.rebuild(batch).await,
                () = &mut stop => break,
                result = &mut self.server => {
                    finished = Some(result);
                    break;
                }
            }
        }

        self.reload.shutdown();
        let _ = self.stop_server.send(());
        let result = match finished {
            Some(result) => {
                ui::warning("Server stopped unexpectedly");
                result
            }
            None => self.server.await,
        };
        result?
    }

    async fn rebuild(&self, batch: Vec<String>) {
        ui::info(&format!("Changed: {}", batch.join(", ")));
        let pipeline = Arc::clone(&self.pipeline);
        let started = Instant::now();

        match tokio::task::spawn_blocking(move || pipeline.on_sources_changed(&batch)).await {
            Ok(Ok(report)) => {
                ui::print_failures(&report);
                let touched = !report.written.is_empty()
                    || !report.copied.is_empty()
                    || !report.deleted.is_empty();
                if touched || !report.is_success() {
                    ui::print_build_summary(&report, started.elapsed(), &self.classes_dir);
                }
            }
            Ok(Err(err)) => ui::error(&format!("Rebuild failed: {err}")),
            Err(err) => ui::error(&format!("Rebuild task failed: {err}")),
        }
    }
}
