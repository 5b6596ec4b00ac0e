//! The completion workflow.
//!
//! Completing a task asks the text generator for two related follow-ups.
//! Whatever happens on the way (network trouble, a useless answer, a body
//! that is not JSON, even a panic) the workflow still hands back exactly two
//! drafts, falling back to canned ones whose flavour depends on what went
//! wrong.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fields::{FallbackSet, FollowUpSource};
use crate::generator::{GenerationError, TextGenerator};
use crate::task::{CompletionContext, TaskDraft};

/// Result of one completion: the two follow-ups for `task_id`, in append order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOutcome {
    pub task_id: u64,
    pub source: FollowUpSource,
    pub drafts: [TaskDraft; 2],
}

impl CompletionOutcome {
    fn generated(ctx: &CompletionContext, [first, second]: [String; 2]) -> Self {
        let description = format!("AI-generated follow-up to: {}", ctx.text);
        Self {
            task_id: ctx.task_id,
            source: FollowUpSource::Generated,
            drafts: [
                TaskDraft::new(first, description.clone()).with_parent(ctx.task_id),
                TaskDraft::new(second, description).with_parent(ctx.task_id),
            ],
        }
    }

    fn fallback(ctx: &CompletionContext, set: FallbackSet) -> Self {
        Self {
            task_id: ctx.task_id,
            source: FollowUpSource::Fallback(set),
            drafts: fallback_drafts(set, &ctx.text).map(|d| d.with_parent(ctx.task_id)),
        }
    }
}

/// The canned follow-ups for a fallback set, with `text` substituted.
pub fn fallback_drafts(set: FallbackSet, text: &str) -> [TaskDraft; 2] {
    match set {
        FallbackSet::Transport => [
            TaskDraft::new(
                format!("Regret completing \"{}\"", text),
                "Wonder if you could have done it better, faster, or not at all",
            ),
            TaskDraft::new(
                format!("Wonder why you thought finishing \"{}\" was a good idea", text),
                "Question the fundamental assumptions that led to this moment of completion",
            ),
        ],
        FallbackSet::LowYield => [
            TaskDraft::new(
                format!("Overthink the completion of \"{}\"", text),
                "Spend unnecessary time analyzing whether you did it correctly and what the implications are",
            ),
            TaskDraft::new(
                "Create 3 sub-tasks for what you just finished",
                "Break down the completed task into smaller, more manageable pieces of regret",
            ),
        ],
        FallbackSet::Unexpected => [
            TaskDraft::new(
                format!("Deal with the anxiety of completing \"{}\"", text),
                "Process the overwhelming dread that comes with actually finishing something",
            ),
            TaskDraft::new(
                format!("Question whether \"{}\" was worth doing at all", text),
                "Engage in deep philosophical reflection about the meaning and value of your actions",
            ),
        ],
    }
}

/// Prompt asking for two follow-up titles, one per line.
pub fn build_prompt(context: &str) -> String {
    format!(
        "Generate 2 related tasks based on: \"{}\". Return only the task titles, one per line.",
        context
    )
}

/// Where the generated text was found in a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratedText<'a> {
    /// `{"generated_text": "..."}`
    Object(&'a str),
    /// `[{"generated_text": "..."}, ...]`
    ArrayHead(&'a str),
    /// Any other shape, or an empty string in both places.
    Missing,
}

impl<'a> GeneratedText<'a> {
    pub fn locate(value: &'a Value) -> Self {
        if let Some(text) = non_empty_str(value.get("generated_text")) {
            return GeneratedText::Object(text);
        }
        let head = value.get(0).and_then(|head| head.get("generated_text"));
        if let Some(text) = non_empty_str(head) {
            return GeneratedText::ArrayHead(text);
        }
        GeneratedText::Missing
    }

    pub fn text(&self) -> &'a str {
        match *self {
            GeneratedText::Object(text) | GeneratedText::ArrayHead(text) => text,
            GeneratedText::Missing => "",
        }
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// First two non-blank lines of `text`, trimmed. `None` if there are fewer than two.
pub fn first_two_lines(text: &str) -> Option<[String; 2]> {
    let mut lines = text
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty());
    match (lines.next(), lines.next()) {
        (Some(first), Some(second)) => Some([first.to_string(), second.to_string()]),
        _ => None,
    }
}

#[derive(Debug, Error)]
enum WorkflowError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Malformed response: {0}")]
    Json(#[from] serde_json::Error),
}

/// Produces two follow-up drafts for every completed task.
pub struct CompletionWorkflow {
    generator: Arc<dyn TextGenerator>,
}

impl CompletionWorkflow {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Run the workflow for one completed task. Never fails.
    pub async fn run(&self, ctx: CompletionContext) -> CompletionOutcome {
        match AssertUnwindSafe(self.resolve(&ctx)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(task_id = ctx.task_id, "Completion workflow panicked, using fallback");
                CompletionOutcome::fallback(&ctx, FallbackSet::Unexpected)
            }
        }
    }

    async fn resolve(&self, ctx: &CompletionContext) -> CompletionOutcome {
        match self.generate_lines(ctx).await {
            Ok(Some(lines)) => {
                debug!(task_id = ctx.task_id, ?lines, "Generated follow-ups");
                CompletionOutcome::generated(ctx, lines)
            }
            Ok(None) => {
                info!(
                    task_id = ctx.task_id,
                    "Fewer than two usable lines generated, using fallback"
                );
                CompletionOutcome::fallback(ctx, FallbackSet::LowYield)
            }
            Err(WorkflowError::Generation(e)) if e.is_transport() => {
                warn!(
                    task_id = ctx.task_id,
                    error = %e,
                    "Generation request failed, using fallback"
                );
                CompletionOutcome::fallback(ctx, FallbackSet::Transport)
            }
            Err(e) => {
                warn!(
                    task_id = ctx.task_id,
                    error = %e,
                    "Unusable generation response, using fallback"
                );
                CompletionOutcome::fallback(ctx, FallbackSet::Unexpected)
            }
        }
    }

    async fn generate_lines(
        &self,
        ctx: &CompletionContext,
    ) -> Result<Option<[String; 2]>, WorkflowError> {
        let prompt = build_prompt(&ctx.summary());
        let body = self.generator.generate(&prompt).await?;
        let value: Value = serde_json::from_str(&body)?;
        let generated = GeneratedText::locate(&value);
        if generated == GeneratedText::Missing {
            debug!(task_id = ctx.task_id, "Response carried no generated text");
        }
        Ok(first_two_lines(generated.text()))
    }
}
