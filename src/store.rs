//! In-memory task store and display helpers.
//!
//! This module provides the `TaskStore` struct holding the ordered task list
//! for the lifetime of a session, along with formatting utilities shared by
//! the CLI and the TUI.

use chrono::{DateTime, Utc};

use crate::fields::*;
use crate::task::{CompletionContext, Task, TaskDraft, DEFAULT_DESCRIPTION, DEFAULT_TEXT};

/// Ordered, append-only collection of tasks.
///
/// Ids come from a counter that only moves forward, so an id is never handed
/// out twice within one store.
#[derive(Debug)]
pub struct TaskStore {
    tasks: Vec<Task>,
    next_id: u64,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: 1,
        }
    }
}

#[allow(clippy::len_without_is_empty)]
impl TaskStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the two tasks every new session starts with.
    pub fn seeded() -> Self {
        let mut store = Self::new();
        store.append_tasks(vec![
            TaskDraft::new(
                "Start my useless project",
                "Begin the endless cycle of productivity theater by creating something that solves no real problems",
            ),
            TaskDraft::new(
                "Question my life choices",
                "Spend at least 30 minutes contemplating whether this project reflects deeper existential issues",
            ),
        ]);
        store
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Add a new `todo` task, substituting placeholders for missing text or description.
    pub fn add_task(&mut self, text: Option<&str>, description: Option<&str>) -> &Task {
        let text = non_blank(text).unwrap_or(DEFAULT_TEXT);
        let description = non_blank(description).unwrap_or(DEFAULT_DESCRIPTION);
        let id = self.allocate_id();
        self.tasks.push(TaskDraft::new(text, description).into_task(id));
        &self.tasks[self.tasks.len() - 1]
    }

    /// Mark a `todo` task as completed.
    ///
    /// Returns the snapshot the completion workflow runs on, taken before the
    /// status flip. Unknown ids and tasks that are already completed leave the
    /// store untouched and return `None`.
    pub fn mark_completed(&mut self, id: u64) -> Option<CompletionContext> {
        let task = self.get_mut(id)?;
        if task.is_completed() {
            return None;
        }
        let context = CompletionContext::from(&*task);
        task.status = Status::Completed;
        Some(context)
    }

    /// Append drafts as `todo` tasks in order, returning their new ids.
    pub fn append_tasks(&mut self, drafts: impl IntoIterator<Item = TaskDraft>) -> Vec<u64> {
        let mut ids = Vec::new();
        for draft in drafts {
            let id = self.allocate_id();
            self.tasks.push(draft.into_task(id));
            ids.push(id);
        }
        ids
    }

    /// Get a task by ID.
    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: u64) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// All tasks in insertion order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Number of tasks with the given status.
    pub fn count_by_status(&self, status: Status) -> usize {
        self.tasks.iter().filter(|t| t.status == status).count()
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Format a task status for display.
pub fn format_status(s: Status) -> &'static str {
    match s {
        Status::Todo => "Todo",
        Status::Completed => "Completed",
    }
}

/// Format where a batch of follow-ups came from.
pub fn format_source(s: FollowUpSource) -> &'static str {
    match s {
        FollowUpSource::Generated => "generated",
        FollowUpSource::Fallback(FallbackSet::Transport) => "fallback (transport)",
        FollowUpSource::Fallback(FallbackSet::LowYield) => "fallback (low yield)",
        FollowUpSource::Fallback(FallbackSet::Unexpected) => "fallback (unexpected)",
    }
}

/// Format a creation timestamp relative to `now` ("just now", "5m ago", "2h ago", "3d ago").
pub fn format_age(created_at_utc: i64, now: DateTime<Utc>) -> String {
    let secs = (now.timestamp() - created_at_utc).max(0);
    match secs {
        0..=59 => "just now".into(),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86400),
    }
}

/// Print tasks in a formatted table.
pub fn print_table(tasks: &[&Task]) {
    println!("{:<5} {:<10} {:<7} {}", "ID", "Status", "Parent", "Text");
    for t in tasks {
        let parent = t.parent.map(|p| p.to_string()).unwrap_or_else(|| "-".into());
        println!(
            "{:<5} {:<10} {:<7} {}",
            t.id,
            format_status(t.status),
            parent,
            truncate(&t.text, 72)
        );
        if let Some(desc) = t.description.as_deref() {
            println!("{:<24} {}", "", truncate(desc, 72));
        }
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_add_task_defaults() {
        let mut store = TaskStore::new();
        let task = store.add_task(None, None).clone();
        assert_eq!(store.len(), 1);
        assert_eq!(task.text, DEFAULT_TEXT);
        assert_eq!(task.description.as_deref(), Some(DEFAULT_DESCRIPTION));
        assert_eq!(task.status, Status::Todo);
        assert_eq!(task.parent, None);
    }

    #[test]
    fn test_add_task_blank_input_uses_defaults() {
        let mut store = TaskStore::new();
        let task = store.add_task(Some("   "), Some("")).clone();
        assert_eq!(task.text, DEFAULT_TEXT);
        assert_eq!(task.description.as_deref(), Some(DEFAULT_DESCRIPTION));
    }

    #[test]
    fn test_add_task_keeps_input() {
        let mut store = TaskStore::new();
        let task = store.add_task(Some(" Buy milk "), Some("Oat, obviously")).clone();
        assert_eq!(task.text, "Buy milk");
        assert_eq!(task.description.as_deref(), Some("Oat, obviously"));
    }

    #[test]
    fn test_new_tasks_are_appended_at_end() {
        let mut store = TaskStore::seeded();
        store.add_task(Some("third"), None);
        let ids =
            store.append_tasks(vec![TaskDraft::new("fourth", "d"), TaskDraft::new("fifth", "d")]);
        let texts: Vec<&str> = store.tasks().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts[2..], ["third", "fourth", "fifth"]);
        assert_eq!(ids, vec![4, 5]);
    }

    #[test]
    fn test_mark_completed_captures_snapshot() {
        let mut store = TaskStore::new();
        let id = store.add_task(Some("Buy milk"), Some("Semi-skimmed")).id;
        let ctx = store.mark_completed(id).unwrap();
        assert_eq!(ctx.task_id, id);
        assert_eq!(ctx.text, "Buy milk");
        assert_eq!(ctx.description.as_deref(), Some("Semi-skimmed"));
        assert_eq!(store.get(id).unwrap().status, Status::Completed);
    }

    #[test]
    fn test_mark_completed_unknown_id_is_noop() {
        let mut store = TaskStore::seeded();
        let before = store.tasks().to_vec();
        assert!(store.mark_completed(999).is_none());
        assert_eq!(store.tasks(), before.as_slice());
    }

    #[test]
    fn test_completed_task_is_terminal() {
        let mut store = TaskStore::new();
        let id = store.add_task(Some("Once"), None).id;
        assert!(store.mark_completed(id).is_some());
        let snapshot = store.get(id).unwrap().clone();

        assert!(store.mark_completed(id).is_none());
        store.add_task(None, None);
        store.append_tasks(vec![TaskDraft::new("x", "y").with_parent(id)]);
        assert_eq!(store.get(id), Some(&snapshot));
    }

    #[test]
    fn test_ids_are_unique() {
        let mut store = TaskStore::seeded();
        for i in 0..20 {
            if i % 3 == 0 {
                let id = store.tasks()[i].id;
                store.mark_completed(id);
                store.append_tasks(vec![TaskDraft::new("a", "b"), TaskDraft::new("c", "d")]);
            } else {
                store.add_task(None, None);
            }
        }
        let ids: HashSet<u64> = store.tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), store.len());
    }

    #[test]
    fn test_count_by_status() {
        let mut store = TaskStore::seeded();
        store.mark_completed(1);
        assert_eq!(store.count_by_status(Status::Todo), 1);
        assert_eq!(store.count_by_status(Status::Completed), 1);
    }

    #[test]
    fn test_format_age() {
        let now = DateTime::from_timestamp(1_000_000, 0).unwrap();
        assert_eq!(format_age(1_000_000, now), "just now");
        assert_eq!(format_age(1_000_000 - 300, now), "5m ago");
        assert_eq!(format_age(1_000_000 - 7200, now), "2h ago");
        assert_eq!(format_age(1_000_000 - 3 * 86400, now), "3d ago");
        assert_eq!(format_age(1_000_000 + 10, now), "just now");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly ten", 5), "exac…");
    }
}
