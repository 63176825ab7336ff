//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Kiln - front-end build orchestrator.
#[derive(Parser, Debug)]
#[command(name = "kiln", version, about = "Front-end build orchestrator", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to kiln.config.json in the working directory)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Command to run; prints the command listing when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the production build pipeline
    Build,

    /// Run the development build pipeline, then watch for changes
    Dev,

    /// Run tests (currently none are defined)
    Test,
}
