use clap::ValueEnum;
use webdev_config::CompilerKind;

/// Stylesheet compiler
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum CompilerArg {
    /// Built-in import inlining plus lightningcss (SCSS syntax only)
    #[value(name = "inline")]
    Inline,

    /// External `sass` executable
    #[value(name = "sass-cli")]
    SassCli,
}

impl From<CompilerArg> for CompilerKind {
    fn from(value: CompilerArg) -> Self {
        match value {
            CompilerArg::Inline => CompilerKind::Inline,
            CompilerArg::SassCli => CompilerKind::SassCli,
        }
    }
}
