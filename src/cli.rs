use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// storagecfg - compile storage component declarations into initialization code
#[derive(Parser)]
#[command(name = "storagecfg")]
#[command(about = "Validates storage component documents and emits their initialization sequence")]
#[command(version)]
pub struct Cli {
    /// Compile options file (JSON)
    #[arg(long, global = true)]
    pub options: Option<PathBuf>,

    /// Allow several storage front-ends to share a path prefix.
    ///
    /// Overrides `prefix_policy` from the options file.
    #[arg(long, global = true)]
    pub allow_shared_prefix: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a document without emitting anything
    Validate {
        /// Path to the document (JSON)
        document: PathBuf,
    },
    /// Show the resolved instantiation order
    Plan {
        /// Path to the document (JSON)
        document: PathBuf,
    },
    /// Emit the initialization sequence
    Emit {
        /// Path to the document (JSON)
        document: PathBuf,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Resolve a prefixed path (e.g. sd://music/a.wav) to its storage front-end
    Route {
        /// Path to the document (JSON)
        document: PathBuf,
        /// Prefixed path to resolve
        path: String,
    },
}

/// Output format of `emit`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Numbered operation listing
    Text,
    /// Operations as a JSON array
    Json,
    /// C++ initialization statements
    Cpp,
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
