use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// A to-do list that never gets shorter.
/// Completing a task asks a text-generation model for two more.
#[derive(Parser)]
#[command(name = "sisyphus", version, about = "A to-do list that never empties")]
pub struct Cli {
    /// Text-generation endpoint (overrides SISYPHUS_ENDPOINT).
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Request timeout in seconds (overrides SISYPHUS_TIMEOUT_SECS).
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: Option<u64>,

    /// Write logs to this file. The UI discards logs otherwise.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Defaults to `ui`.
    #[command(subcommand)]
    pub command: Option<Commands>,
}
