use clap::{Args, Subcommand};
use std::path::PathBuf;
use webdev_config::ConfigOverrides;

use crate::cli::enums::CompilerArg;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the live reload server with watch mode
    ///
    /// Builds every stylesheet, serves the classes directory, and recompiles
    /// the stylesheets a changed file affects.
    Dev(DevArgs),

    /// Compile every stylesheet once
    Build(BuildArgs),
}

/// Options shared by every command that builds.
#[derive(Args, Debug, Clone, Default)]
pub struct BuildOptions {
    /// Config file (TOML or JSON). Defaults to webdev.toml or webdev.json
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Resource root holding stylesheets (repeatable)
    #[arg(short, long = "root", value_name = "DIR")]
    pub roots: Vec<PathBuf>,

    /// Output directory for compiled stylesheets
    #[arg(long, value_name = "DIR")]
    pub classes_dir: Option<PathBuf>,

    /// Stylesheet compiler
    #[arg(long, value_enum)]
    pub compiler: Option<CompilerArg>,

    /// Minify compiled CSS
    #[arg(long)]
    pub minify: bool,

    /// Project directory (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,
}

impl BuildOptions {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            resource_roots: self.roots.clone(),
            classes_dir: self.classes_dir.clone(),
            compiler: self.compiler.map(Into::into),
            minify: self.minify.then_some(true),
            ..ConfigOverrides::default()
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct DevArgs {
    #[command(flatten)]
    pub build: BuildOptions,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,
}

impl DevArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            ..self.build.overrides()
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub build: BuildOptions,
}
