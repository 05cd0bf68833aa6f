//! Recompiles affected stylesheets, mirrors plain resources, and removes
//! outputs whose source is gone.
//!
//! Everything here is blocking on purpose: a stale output may still be
//! streaming to a browser while it is deleted, so deletion retries with
//! sleeps. Async callers run the rebuilder on `spawn_blocking`.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use walkdir::WalkDir;

use crate::compiler::{CompileError, CompileFailure, CompileUnit, Compiler};
use crate::error::{LiveError, Result};
use crate::graph::DependencyGraph;
use crate::path::{file_name, is_compiled_source, is_sass_file, output_name, source_key};

/// Timing of the race-tolerant delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletePolicy {
    /// How long a failing delete keeps retrying.
    pub retry_window: Duration,
    /// Pause between delete attempts.
    pub retry_interval: Duration,
    /// Pause before each check of the parent directory's mtime.
    pub settle_interval: Duration,
    /// Number of mtime checks before giving up with a warning.
    pub settle_attempts: u32,
}

impl Default for DeletePolicy {
    fn default() -> Self {
        Self {
            retry_window: Duration::from_secs(5),
            retry_interval: Duration::from_millis(50),
            settle_interval: Duration::from_secs(1),
            settle_attempts: 10,
        }
    }
}

/// Where sources are looked up and outputs are written.
#[derive(Debug, Clone)]
pub struct RebuildOptions {
    /// Source roots, searched in order.
    pub resource_roots: Vec<PathBuf>,
    /// Runtime output directory.
    pub classes_dir: PathBuf,
    /// Build-tool output directory holding copies that must be cleaned on delete.
    pub build_dir: Option<PathBuf>,
    pub delete: DeletePolicy,
}

impl RebuildOptions {
    pub fn new(resource_roots: Vec<PathBuf>, classes_dir: impl Into<PathBuf>) -> Self {
        Self {
            resource_roots,
            classes_dir: classes_dir.into(),
            build_dir: None,
            delete: DeletePolicy::default(),
        }
    }

    pub fn with_build_dir(mut self, build_dir: impl Into<PathBuf>) -> Self {
        self.build_dir = Some(build_dir.into());
        self
    }

    pub fn with_delete_policy(mut self, delete: DeletePolicy) -> Self {
        self.delete = delete;
        self
    }
}

/// Outcome of one rebuild or full build.
#[derive(Debug, Default)]
pub struct RebuildReport {
    /// Stylesheets written, absolute.
    pub written: Vec<PathBuf>,
    /// Plain resources copied unchanged, absolute.
    pub copied: Vec<PathBuf>,
    /// Outputs deleted, absolute.
    pub deleted: Vec<PathBuf>,
    /// Sources the compiler rejected.
    pub failures: Vec<CompileFailure>,
}

impl RebuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Turn collected compile failures into [`LiveError::BuildFailed`].
    pub fn into_result(self) -> Result<Self> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(LiveError::BuildFailed {
                failures: self.failures,
            })
        }
    }
}

/// Compiles sources into the classes directory.
pub struct Rebuilder {
    options: RebuildOptions,
    compiler: Arc<dyn Compiler>,
    graph: Arc<DependencyGraph>,
}

impl std::fmt::Debug for Rebuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rebuilder")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Rebuilder {
    pub fn new(
        options: RebuildOptions,
        compiler: Arc<dyn Compiler>,
        graph: Arc<DependencyGraph>,
    ) -> Self {
        Self {
            options,
            compiler,
            graph,
        }
    }

    pub fn options(&self) -> &RebuildOptions {
        &self.options
    }

    pub fn graph(&self) -> &Arc<DependencyGraph> {
        &self.graph
    }

    /// Output location of a source key under the classes directory.
    pub fn output_path(&self, source: &str) -> PathBuf {
        self.options.classes_dir.join(output_name(source))
    }

    /// Recompile `sources`, deleting the outputs of those that no longer exist.
    ///
    /// Every source is attempted; compile failures are collected in the report.
    ///
    /// # Errors
    ///
    /// I/O failures abort immediately, including a delete that keeps failing
    /// past [`DeletePolicy::retry_window`].
    pub fn rebuild<I, S>(&self, sources: I) -> Result<RebuildReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sources: Vec<String> = sources
            .into_iter()
            .map(|source| source.as_ref().to_string())
            .collect();
        for source in &sources {
            self.graph.forget_affected(source);
        }

        tracing::info!(sources = ?sources, "rebuilding stylesheets");

        let mut report = RebuildReport::default();
        for source in &sources {
            match self.locate(source) {
                Some(root) => self.compile_into(source, &root, &mut report)?,
                None => self.delete_outputs(source, &mut report)?,
            }
        }
        Ok(report)
    }

    /// Copy changed plain resources (`app.js`, `logo.svg`) into the classes
    /// directory, deleting the copies of those that no longer exist.
    ///
    /// Sass files are skipped, as is a `.css` file that a stylesheet of the
    /// same name compiles to.
    ///
    /// # Errors
    ///
    /// I/O failures abort immediately.
    pub fn sync_resources<I, S>(&self, keys: I) -> Result<RebuildReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = RebuildReport::default();
        for key in keys {
            let key = key.as_ref();
            if is_sass_file(file_name(key)) || self.is_compiled_output(key) {
                continue;
            }
            match self.locate(key) {
                Some(root) => self.copy_into(key, &root, &mut report)?,
                None => self.delete_outputs(key, &mut report)?,
            }
        }
        Ok(report)
    }

    /// Clear the graph, then compile every stylesheet and copy every plain
    /// resource under every root. Partials produce nothing.
    ///
    /// A source key present in several roots is taken from the first one.
    ///
    /// # Errors
    ///
    /// I/O failures abort; compile failures are collected in the report.
    pub fn full_build(&self) -> Result<RebuildReport> {
        self.graph.clear();
        let started = Instant::now();
        let mut report = RebuildReport::default();
        let mut seen = HashSet::new();

        for root in &self.options.resource_roots {
            if !root.is_dir() {
                tracing::debug!(root = %root.display(), "skipping missing resource root");
                continue;
            }
            let walk = WalkDir::new(root)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| !self.is_output_dir(entry.path()));
            for entry in walk {
                let entry = entry.map_err(|err| {
                    let path = err.path().unwrap_or(root.as_path()).to_path_buf();
                    LiveError::io(path, err.into())
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let Some(key) = source_key(entry.path(), root) else {
                    continue;
                };
                let name = file_name(&key);
                if is_sass_file(name) && !is_compiled_source(name) {
                    continue;
                }
                if !seen.insert(key.clone()) {
                    continue;
                }
                if is_compiled_source(name) {
                    self.compile_into(&key, root, &mut report)?;
                } else if !self.is_compiled_output(&key) {
                    self.copy_into(&key, root, &mut report)?;
                }
            }
        }

        tracing::info!(
            written = report.written.len(),
            copied = report.copied.len(),
            failed = report.failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "full stylesheet build finished"
        );
        Ok(report)
    }

    fn locate(&self, source: &str) -> Option<PathBuf> {
        self.options
            .resource_roots
            .iter()
            .find(|root| root.join(source).is_file())
            .cloned()
    }

    /// Output directories nested in a resource root are not sources.
    fn is_output_dir(&self, path: &Path) -> bool {
        path == self.options.classes_dir || self.options.build_dir.as_deref() == Some(path)
    }

    /// True when `key` is the `.css` output of a stylesheet in some root.
    fn is_compiled_output(&self, key: &str) -> bool {
        match key.rsplit_once('.') {
            Some((stem, ext)) if ext.eq_ignore_ascii_case("css") => ["scss", "sass"]
                .iter()
                .any(|ext| self.locate(&format!("{stem}.{ext}")).is_some()),
            _ => false,
        }
    }

    fn copy_into(&self, key: &str, root: &Path, report: &mut RebuildReport) -> Result<()> {
        let source = root.join(key);
        let output = self.options.classes_dir.join(key);
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(|err| LiveError::io(parent, err))?;
        }
        fs::copy(&source, &output).map_err(|err| LiveError::io(&source, err))?;
        tracing::debug!(key, output = %output.display(), "copied resource");
        report.copied.push(output);
        Ok(())
    }

    fn compile_into(&self, source: &str, root: &Path, report: &mut RebuildReport) -> Result<()> {
        let unit = CompileUnit::new(root.join(source), source, root);
        let mut sink = &*self.graph;

        match self.compiler.compile(&unit, &mut sink) {
            Ok(css) => {
                let output = self.output_path(source);
                if let Some(parent) = output.parent() {
                    fs::create_dir_all(parent).map_err(|err| LiveError::io(parent, err))?;
                }
                fs::write(&output, css).map_err(|err| LiveError::io(&output, err))?;
                tracing::debug!(source, output = %output.display(), "wrote stylesheet");
                report.written.push(output);
                Ok(())
            }
            Err(CompileError::Failed(failure)) => {
                tracing::warn!(source, error = %failure, "stylesheet failed to compile");
                report.failures.push(failure);
                Ok(())
            }
            Err(CompileError::Io { path, source }) => Err(LiveError::Io { path, source }),
        }
    }

    fn delete_outputs(&self, source: &str, report: &mut RebuildReport) -> Result<()> {
        let name = output_name(source);
        let dirs = std::iter::once(&self.options.classes_dir).chain(self.options.build_dir.as_ref());

        for dir in dirs {
            let output = dir.join(&name);
            if delete_file(&output, &self.options.delete)? {
                tracing::info!(source, output = %output.display(), "deleted stale output");
                report.deleted.push(output);
            }
        }
        Ok(())
    }
}

/// Delete `path`, retrying while the file is busy, then wait for its parent
/// directory's mtime to move past the deletion.
///
/// Returns `false` when there was nothing to delete.
pub(crate) fn delete_file(path: &Path, policy: &DeletePolicy) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }

    let parent = path.parent().map(Path::to_path_buf);
    let before = parent.as_deref().and_then(dir_mtime);
    let deadline = Instant::now() + policy.retry_window;

    loop {
        match fs::remove_file(path) {
            Ok(()) => break,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(source) if Instant::now() >= deadline => {
                return Err(LiveError::DeleteFailed {
                    path: path.to_path_buf(),
                    window_ms: policy.retry_window.as_millis(),
                    source,
                });
            }
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "delete failed, retrying");
                thread::sleep(policy.retry_interval);
            }
        }
    }

    if let Some(parent) = parent {
        settle(&parent, before, policy);
    }
    Ok(true)
}

/// Make sure the directory mtime moved past `before` after a delete.
///
/// Returns at once when the delete itself advanced it. Otherwise polls,
/// touching the directory, until its mtime is later than both `before` and
/// the moment polling started.
fn settle(dir: &Path, before: Option<SystemTime>, policy: &DeletePolicy) {
    let current = dir_mtime(dir);
    if matches!((before, current), (Some(before), Some(current)) if current > before) {
        return;
    }

    let now = SystemTime::now();
    let target = [before, current].into_iter().flatten().fold(now, SystemTime::max);

    for _ in 0..policy.settle_attempts {
        thread::sleep(policy.settle_interval);
        if let Err(err) = touch_dir(dir) {
            // Some platforms cannot open a directory for writing its times.
            tracing::warn!(dir = %dir.display(), error = %err, "could not touch directory after delete");
            return;
        }
        if dir_mtime(dir).is_some_and(|mtime| mtime > target) {
            return;
        }
    }

    tracing::warn!(
        dir = %dir.display(),
        attempts = policy.settle_attempts,
        "directory mtime did not advance after delete; watchers may miss it"
    );
}

fn touch_dir(dir: &Path) -> std::io::Result<()> {
    fs::File::open(dir)?.set_modified(SystemTime::now())
}

fn dir_mtime(dir: &Path) -> Option<SystemTime> {
    fs::metadata(dir).and_then(|metadata| metadata.modified()).ok()
}
