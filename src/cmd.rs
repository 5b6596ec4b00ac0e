//! Command implementations for the CLI interface.
//!
//! Each handler receives the loaded configuration and the runtime that
//! completion workflows are spawned on.

use std::io;

use anyhow::Context;
use clap::{CommandFactory, Subcommand};
use clap_complete::{generate, Shell};
use serde::Serialize;
use tokio::runtime::Runtime;
use tracing::info;

use crate::cli::Cli;
use crate::completion::CompletionWorkflow;
use crate::config::Config;
use crate::fields::{FollowUpSource, OutputFormat};
use crate::generator::HuggingFaceClient;
use crate::session::Session;
use crate::store::{format_source, print_table, TaskStore};
use crate::task::Task;
use crate::tui::run::run_tui;

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive UI.
    Ui,

    /// Complete a single task without the UI and print its two replacements.
    Complete {
        /// Short title of the task being completed.
        text: String,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Build the workflow against the configured endpoint.
fn build_workflow(config: &Config) -> anyhow::Result<CompletionWorkflow> {
    let client = HuggingFaceClient::from_config(config).context("Failed to build HTTP client")?;
    info!(
        endpoint = client.endpoint(),
        authenticated = config.api_token.is_some(),
        "Text generator ready"
    );
    Ok(CompletionWorkflow::new(std::sync::Arc::new(client)))
}

/// Launch the TUI on a freshly seeded session.
pub fn cmd_ui(config: &Config, runtime: &Runtime) -> anyhow::Result<()> {
    let workflow = build_workflow(config)?;
    let session = Session::new(TaskStore::seeded(), workflow, runtime.handle().clone());
    run_tui(session).context("Terminal UI failed")
}

#[derive(Serialize)]
struct CompletionReport<'a> {
    completed: &'a Task,
    source: FollowUpSource,
    follow_ups: Vec<&'a Task>,
}

/// Complete one task headlessly and print the follow-ups.
pub fn cmd_complete(
    config: &Config,
    runtime: &Runtime,
    text: String,
    desc: Option<String>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let workflow = build_workflow(config)?;
    let mut session = Session::new(TaskStore::new(), workflow, runtime.handle().clone());

    let id = session.add_task(Some(&text), desc.as_deref());
    session.complete_task(id);
    let applied = runtime
        .block_on(session.next_finished())
        .context("Completion workflow did not start")?;

    let store = session.store();
    let completed = store.get(id).context("Completed task missing from store")?;
    let follow_ups: Vec<&Task> = applied.new_ids.iter().filter_map(|&n| store.get(n)).collect();

    match format {
        OutputFormat::Json => {
            let report = CompletionReport {
                completed,
                source: applied.source,
                follow_ups,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            println!("Completed task {}; replacements are {}:", id, format_source(applied.source));
            println!();
            print_table(&follow_ups);
        }
    }
    Ok(())
}

/// Print shell completions to stdout.
pub fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "sisyphus", &mut io::stdout());
}
