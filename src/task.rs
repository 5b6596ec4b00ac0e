//! Task data structure and related functionality.
//!
//! This module defines the `Task` record held by the store, the `TaskDraft`
//! descriptor produced by the completion workflow, and the snapshot captured
//! when a task is completed.

use chrono::Utc;
use serde::Serialize;

use crate::fields::Status;

/// Title used when a task is added without one.
pub const DEFAULT_TEXT: &str = "A mysteriously vague task that will haunt you";
/// Description used when a task is added without one.
pub const DEFAULT_DESCRIPTION: &str =
    "No description provided, which somehow makes it more ominous";

/// A single to-do item.
///
/// Once `status` is `Completed` the record is never mutated again; it stays
/// in the list, greyed out.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Task {
    pub id: u64,
    pub text: String,
    pub description: Option<String>,
    pub status: Status,
    /// The completed task whose workflow produced this one.
    pub parent: Option<u64>,
    pub created_at_utc: i64,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }
}

/// A task descriptor without id or status, appended to the store as `todo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub text: String,
    pub description: Option<String>,
    pub parent: Option<u64>,
}

impl TaskDraft {
    pub fn new(text: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            description: Some(description.into()),
            parent: None,
        }
    }

    /// Attach the id of the task this draft follows up on.
    pub fn with_parent(mut self, parent: u64) -> Self {
        self.parent = Some(parent);
        self
    }

    pub(crate) fn into_task(self, id: u64) -> Task {
        Task {
            id,
            text: self.text,
            description: self.description,
            status: Status::Todo,
            parent: self.parent,
            created_at_utc: Utc::now().timestamp(),
        }
    }
}

/// What the completion workflow knows about the task that was just completed,
/// captured before the status flip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionContext {
    pub task_id: u64,
    pub text: String,
    pub description: Option<String>,
}

impl CompletionContext {
    pub fn new(task_id: u64, text: impl Into<String>, description: Option<String>) -> Self {
        Self {
            task_id,
            text: text.into(),
            description,
        }
    }

    /// `"{text}: {description}"` when a description is present, else the text.
    pub fn summary(&self) -> String {
        match self.description.as_deref().map(str::trim) {
            Some(desc) if !desc.is_empty() => format!("{}: {}", self.text, desc),
            _ => self.text.clone(),
        }
    }
}

impl From<&Task> for CompletionContext {
    fn from(task: &Task) -> Self {
        CompletionContext::new(task.id, task.text.clone(), task.description.clone())
    }
}
