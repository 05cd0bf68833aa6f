//! Project setup shared by the commands.

use std::path::PathBuf;
use std::sync::Arc;

use webdev_config::{CompilerKind, ConfigLoader, ConfigOverrides, WebdevConfig};
use webdev_live::{
    Compiler, DeletePolicy, DependencyGraph, InlineCompiler, RebuildOptions, Rebuilder,
    SassCliCompiler,
};

use crate::cli::BuildOptions;
use crate::error::{CliError, Result};

/// Directory the project lives in: `--cwd` or the current directory.
pub(crate) fn project_dir(options: &BuildOptions) -> Result<PathBuf> {
    match &options.cwd {
        Some(cwd) if cwd.is_absolute() => Ok(cwd.clone()),
        Some(cwd) => Ok(std::env::current_dir()?.join(cwd)),
        None => Ok(std::env::current_dir()?),
    }
}

/// Load, validate and resolve the configuration of the project.
pub(crate) fn load_config(
    options: &BuildOptions,
    overrides: ConfigOverrides,
) -> Result<WebdevConfig> {
    let root = project_dir(options)?;
    let mut loader = ConfigLoader::new(&root).with_overrides(overrides);
    if let Some(file) = &options.config {
        loader = loader.with_file(file);
    }
    if let Some(file) = loader.config_file()? {
        tracing::debug!(path = %file.display(), "loading config");
    }

    let config = loader.load()?;
    for root in &config.resource_roots {
        if !root.is_dir() {
            return Err(CliError::RootNotFound(root.clone()));
        }
    }
    Ok(config)
}

pub(crate) fn compiler(config: &WebdevConfig) -> Arc<dyn Compiler> {
    match config.compiler {
        CompilerKind::Inline => Arc::new(InlineCompiler::new().with_minify(config.minify)),
        CompilerKind::SassCli => {
            Arc::new(SassCliCompiler::new(&config.sass_binary).with_minify(config.minify))
        }
    }
}

pub(crate) fn rebuild_options(config: &WebdevConfig) -> RebuildOptions {
    let delete = DeletePolicy {
        retry_window: config.delete.retry_window(),
        retry_interval: config.delete.retry_interval(),
        settle_interval: config.delete.settle_interval(),
        settle_attempts: config.delete.settle_attempts,
    };
    let options = RebuildOptions::new(config.resource_roots.clone(), &config.classes_dir)
        .with_delete_policy(delete);
    match &config.build_dir {
        Some(build_dir) => options.with_build_dir(build_dir),
        None => options,
    }
}

pub(crate) fn rebuilder(config: &WebdevConfig) -> Rebuilder {
    Rebuilder::new(
        rebuild_options(config),
        compiler(config),
        Arc::new(DependencyGraph::new()),
    )
}
