use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Local-first task manager pairing tasks with AI prompts.
/// Storage defaults to ~/.ptm/data.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "ptm", version, about = "Task and prompt-template management CLI")]
pub struct Cli {
    /// Path to the JSON snapshot file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
