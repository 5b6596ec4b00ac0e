//! # Sisyphus - the to-do list that never empties
//!
//! A terminal to-do list with one twist: completing a task asks a
//! text-generation model for two related follow-ups, which are appended to
//! the list. When the model is unreachable or unhelpful, canned follow-ups
//! take their place, so finishing something always leaves you with more.
//!
//! ## Quick Start
//!
//! ```bash
//! # Launch the UI (a = add, c = complete, h = help)
//! export HF_TOKEN=hf_...
//! sisyphus
//!
//! # Complete a task without the UI
//! sisyphus complete "Buy milk" --desc "Semi-skimmed" --format json
//! ```
//!
//! ## Configuration
//!
//! - `SISYPHUS_HF_TOKEN` / `HF_TOKEN` - inference API token
//! - `SISYPHUS_ENDPOINT` - text-generation endpoint
//! - `SISYPHUS_TIMEOUT_SECS` - request timeout (none by default)
//! - `RUST_LOG` - log filter, defaults to `sisyphus=info`
//!
//! Nothing is persisted: the list lives as long as the session.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use tokio::runtime::Runtime;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod cli;
pub mod cmd;
pub mod completion;
pub mod config;
pub mod fields;
pub mod generator;
pub mod session;
pub mod store;
pub mod task;
pub mod tui {
    pub mod colors;
    pub mod app;
    pub mod enums;
    pub mod input;
    pub mod run;
    pub mod task_form;
    pub mod utils;
}

use cli::Cli;
use cmd::*;
use config::Config;

/// Install the tracing subscriber.
///
/// The UI owns the terminal, so without a log file it gets no subscriber at all.
fn init_logging(log_file: Option<&Path>, to_stderr: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "sisyphus=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            registry
                .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
                .init();
        }
        None if to_stderr => registry.with(fmt::layer().with_writer(std::io::stderr)).init(),
        None => {}
    }
    Ok(())
}

/// Load configuration and build the runtime for commands that talk to the generator.
fn prepare(cli: &Cli, headless: bool) -> anyhow::Result<(Config, Runtime)> {
    init_logging(cli.log_file.as_deref(), headless)?;

    let config = Config::from_env()?.with_overrides(cli.endpoint.clone(), cli.timeout_secs);
    tracing::debug!(?config, "Loaded configuration");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    Ok((config, runtime))
}

fn main() -> anyhow::Result<()> {
    let mut cli = Cli::parse();

    let (result, runtime) = match cli.command.take().unwrap_or(Commands::Ui) {
        Commands::Completions { shell } => {
            cmd_completions(shell);
            return Ok(());
        }
        Commands::Ui => {
            let (config, runtime) = prepare(&cli, false)?;
            let result = cmd_ui(&config, &runtime);
            (result, runtime)
        }
        Commands::Complete { text, desc, format } => {
            let (config, runtime) = prepare(&cli, true)?;
            let result = cmd_complete(&config, &runtime, text, desc, format);
            (result, runtime)
        }
    };

    // Workflows still waiting on the network are abandoned with the session.
    runtime.shutdown_background();
    result
}
