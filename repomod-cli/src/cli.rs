use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use repomod_core::SharedDepPolicy;

#[derive(Debug, Parser)]
#[command(name = "repomod", version, about = "Project-wide rename/move refactoring for module-based scripting projects")]
pub struct Cli {
    /// Project root the target and all paths are resolved against.
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Source file extension, without the leading dot.
    #[arg(long, global = true, default_value = "py")]
    pub extension: String,

    /// Show the unified diff instead of writing to disk.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormatArg::Text)]
    pub format: OutputFormatArg,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormatArg {
    Text,
    Json,
}

impl From<OutputFormatArg> for repomod_core::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Text => Self::Text,
            OutputFormatArg::Json => Self::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SharedDepPolicyArg {
    Reject,
    PullIn,
    Extract,
}

impl From<SharedDepPolicyArg> for SharedDepPolicy {
    fn from(arg: SharedDepPolicyArg) -> Self {
        match arg {
            SharedDepPolicyArg::Reject => Self::Reject,
            SharedDepPolicyArg::PullIn => Self::PullIn,
            SharedDepPolicyArg::Extract => Self::Extract,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Renames a top-level symbol and every reference to it.
    RenameSymbol {
        /// `path::name` or `path:line:col`.
        target: String,
        new_name: String,
    },

    /// Moves one or more top-level symbols (and their dependency closure)
    /// to another file.
    MoveSymbol {
        /// `path::name`, `path::name,name,...`, or `path:line:col`.
        target: String,
        dest_file: PathBuf,

        /// How to handle a dependency still used by a symbol left behind.
        #[arg(long, value_enum, default_value_t = SharedDepPolicyArg::Reject)]
        policy: SharedDepPolicyArg,

        /// Where to put extracted shared dependencies (only with `--policy extract`).
        #[arg(long)]
        shared_file: Option<PathBuf>,
    },

    /// Renames a file in place and fixes up every importer.
    RenameFile { file: PathBuf, new_stem: String },

    /// Moves a file to another directory and fixes up every importer.
    MoveFile { file: PathBuf, dest_dir: PathBuf },
}
