//! Wiring from raw source changes to rebuilds and build notifications.
//!
//! ```text
//! Sass keys  ──▶ DependencyGraph::resolve_affected ──▶ Rebuilder::rebuild ─────┐
//! plain keys ──────────────────────────────────────▶ Rebuilder::sync_resources ┤
//!                                                                              │
//!     ChangeBus ◀──────────────── output keys + build-success / build-error ───┘
//! ```

use std::collections::{BTreeSet, HashSet};
use std::time::Instant;

use crate::error::Result;
use crate::notify::{ChangeBus, Sentinel};
use crate::path::{file_name, is_sass_file, ResourceKey};
use crate::rebuild::{RebuildReport, Rebuilder};

/// Incremental Sass rebuilds driven by file watcher events.
///
/// Runs synchronously; async callers should use `spawn_blocking`.
#[derive(Debug)]
pub struct SassPipeline {
    rebuilder: Rebuilder,
    bus: ChangeBus,
    sentinel: Sentinel,
}

impl SassPipeline {
    pub fn new(rebuilder: Rebuilder, bus: ChangeBus, namespace: &str) -> Self {
        Self {
            rebuilder,
            bus,
            sentinel: Sentinel::new(namespace),
        }
    }

    pub fn rebuilder(&self) -> &Rebuilder {
        &self.rebuilder
    }

    /// Stylesheets a change to `changed` would recompile.
    pub fn plan<I, S>(&self, changed: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.rebuilder.graph().resolve_affected(changed)
    }

    /// Rebuild everything affected by `changed`, mirror changed plain
    /// resources, and publish the outcome.
    ///
    /// A cycle with nothing to rebuild still publishes `build-success`, so
    /// outputs changed by other tools reach the browser too.
    ///
    /// # Errors
    ///
    /// I/O failures from the rebuild; `build-error` is published first.
    pub fn on_sources_changed<I, S>(&self, changed: I) -> Result<RebuildReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let (sass, plain): (Vec<String>, Vec<String>) = changed
            .into_iter()
            .map(|key| key.as_ref().to_string())
            .partition(|key| is_sass_file(file_name(key)));

        let affected = self.plan(&sass);
        if affected.is_empty() && plain.is_empty() {
            tracing::debug!("no stylesheet affected");
            self.publish(&RebuildReport::default());
            return Ok(RebuildReport::default());
        }

        let started = Instant::now();
        match self.rebuild_all(&affected, &plain) {
            Ok(report) => {
                tracing::info!(
                    written = report.written.len(),
                    copied = report.copied.len(),
                    deleted = report.deleted.len(),
                    failed = report.failures.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "incremental rebuild finished"
                );
                self.publish(&report);
                Ok(report)
            }
            Err(err) => {
                self.publish_error();
                Err(err)
            }
        }
    }

    /// Full build with the same notification as an incremental one.
    ///
    /// # Errors
    ///
    /// I/O failures from the build; `build-error` is published first.
    pub fn full_build(&self) -> Result<RebuildReport> {
        match self.rebuilder.full_build() {
            Ok(report) => {
                self.publish(&report);
                Ok(report)
            }
            Err(err) => {
                self.publish_error();
                Err(err)
            }
        }
    }

    fn rebuild_all(&self, affected: &BTreeSet<String>, plain: &[String]) -> Result<RebuildReport> {
        let mut report = if plain.is_empty() {
            RebuildReport::default()
        } else {
            tracing::info!(resources = ?plain, "syncing changed resources");
            self.rebuilder.sync_resources(plain)?
        };
        if !affected.is_empty() {
            tracing::info!(affected = ?affected, "stylesheets affected by change");
            let rebuilt = self.rebuilder.rebuild(affected)?;
            report.written.extend(rebuilt.written);
            report.copied.extend(rebuilt.copied);
            report.deleted.extend(rebuilt.deleted);
            report.failures.extend(rebuilt.failures);
        }
        Ok(report)
    }

    fn publish(&self, report: &RebuildReport) {
        let classes_dir = &self.rebuilder.options().classes_dir;
        let mut keys: HashSet<String> = report
            .written
            .iter()
            .chain(&report.copied)
            .chain(&report.deleted)
            .filter_map(|output| ResourceKey::from_path(output, classes_dir))
            .map(ResourceKey::into_string)
            .collect();

        let sentinel = if report.is_success() {
            self.sentinel.success_key()
        } else {
            self.sentinel.error_key()
        };
        keys.insert(sentinel.to_string());
        self.bus.publish(&keys);
    }

    fn publish_error(&self) {
        let keys = HashSet::from([self.sentinel.error_key().to_string()]);
        self.bus.publish(&keys);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::InlineCompiler;
    use crate::graph::DependencyGraph;
    use crate::notify::NotificationSource;
    use crate::rebuild::RebuildOptions;
    use parking_lot::Mutex;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
        pipeline: SassPipeline,
        published: Arc<Mutex<Vec<HashSet<String>>>>,
        _registration: crate::notify::Registration,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let web = temp.path().join("web");
        let classes = temp.path().join("classes");
        fs::create_dir_all(&web).unwrap();
        fs::create_dir_all(&classes).unwrap();

        let rebuilder = Rebuilder::new(
            RebuildOptions::new(vec![web], classes),
            Arc::new(InlineCompiler::new()),
            Arc::new(DependencyGraph::new()),
        );
        let bus = ChangeBus::new();
        let published = Arc::new(Mutex::new(Vec::new()));
        let sink = published.clone();
        let registration = bus.subscribe(Arc::new(move |keys: &HashSet<String>| {
            sink.lock().push(keys.clone());
        }));

        Fixture {
            temp,
            pipeline: SassPipeline::new(rebuilder, bus, "web-bundler"),
            published,
            _registration: registration,
        }
    }

    #[test]
    fn test_partial_change_rebuilds_importer_and_publishes_output() {
        let fx = fixture();
        let web = fx.temp.path().join("web");
        fs::write(web.join("styles.scss"), "@import \"base\";\n.s { color: red; }\n").unwrap();
        fs::write(web.join("_base.scss"), "body { margin: 0; }\n").unwrap();
        fx.pipeline.full_build().unwrap();

        let report = fx.pipeline.on_sources_changed(["_base.scss"]).unwrap();

        assert_eq!(report.written, vec![fx.temp.path().join("classes/styles.css")]);
        let published = fx.published.lock();
        let last = published.last().unwrap();
        assert!(last.contains("/styles.css"));
        assert!(last.contains("web-bundler/build-success"));
    }

    #[test]
    fn test_compile_failure_publishes_build_error() {
        let fx = fixture();
        fs::write(fx.temp.path().join("web/broken.scss"), "..x { color: red; }\n").unwrap();

        let report = fx.pipeline.on_sources_changed(["broken.scss"]).unwrap();

        assert_eq!(report.failures.len(), 1);
        let published = fx.published.lock();
        assert!(published.last().unwrap().contains("web-bundler/build-error"));
    }

    #[test]
    fn test_plain_resource_change_is_copied_and_published() {
        let fx = fixture();
        fs::write(fx.temp.path().join("web/app.js"), "run()").unwrap();

        let report = fx.pipeline.on_sources_changed(["app.js"]).unwrap();

        assert_eq!(report.copied, vec![fx.temp.path().join("classes/app.js")]);
        let published = fx.published.lock();
        assert_eq!(
            published.last().unwrap(),
            &HashSet::from(["/app.js".to_string(), "web-bundler/build-success".to_string()])
        );
    }

    #[test]
    fn test_unaffected_change_still_publishes_success() {
        let fx = fixture();
        let report = fx.pipeline.on_sources_changed(["logo.png"]).unwrap();

        assert!(report.written.is_empty());
        let published = fx.published.lock();
        assert_eq!(
            published.last().unwrap(),
            &HashSet::from(["web-bundler/build-success".to_string()])
        );
    }
}
