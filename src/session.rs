//! Session state: the task store plus the completion workflows in flight.
//!
//! The session is the only owner of the store. Intents from the UI mutate
//! it directly; completion workflows run on the tokio runtime and send their
//! outcomes back over a channel, which the owner drains and applies, so every
//! mutation happens in one place.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use crate::completion::{CompletionOutcome, CompletionWorkflow};
use crate::fields::FollowUpSource;
use crate::store::TaskStore;

/// Follow-ups that landed in the store for one completed task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedFollowUps {
    pub completed_id: u64,
    pub source: FollowUpSource,
    pub new_ids: Vec<u64>,
}

pub struct Session {
    store: TaskStore,
    workflow: Arc<CompletionWorkflow>,
    runtime: Handle,
    tx: UnboundedSender<CompletionOutcome>,
    rx: UnboundedReceiver<CompletionOutcome>,
    pending: usize,
}

impl Session {
    /// Create a session whose workflows are spawned on `runtime`.
    pub fn new(store: TaskStore, workflow: CompletionWorkflow, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            store,
            workflow: Arc::new(workflow),
            runtime,
            tx,
            rx,
            pending: 0,
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Number of completion workflows whose follow-ups have not landed yet.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Add a task from user input, returning its id.
    pub fn add_task(&mut self, text: Option<&str>, description: Option<&str>) -> u64 {
        let id = self.store.add_task(text, description).id;
        debug!(task_id = id, "Task added");
        id
    }

    /// Complete a task and start its workflow.
    ///
    /// The task is flipped to completed before the workflow is spawned.
    /// Returns `false` when the id is unknown or the task was already
    /// completed; nothing is spawned in that case.
    pub fn complete_task(&mut self, id: u64) -> bool {
        let Some(ctx) = self.store.mark_completed(id) else {
            debug!(task_id = id, "Ignoring completion of unknown or completed task");
            return false;
        };

        self.pending += 1;
        let workflow = Arc::clone(&self.workflow);
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let outcome = workflow.run(ctx).await;
            // The receiver only disappears with the session itself.
            let _ = tx.send(outcome);
        });
        debug!(task_id = id, pending = self.pending, "Completion workflow spawned");
        true
    }

    /// Apply every outcome that has already arrived, without waiting.
    pub fn apply_finished(&mut self) -> Vec<AppliedFollowUps> {
        let mut applied = Vec::new();
        while let Ok(outcome) = self.rx.try_recv() {
            applied.push(self.apply(outcome));
        }
        applied
    }

    /// Wait for the next outcome and apply it. `None` if nothing is in flight.
    pub async fn next_finished(&mut self) -> Option<AppliedFollowUps> {
        if self.pending == 0 {
            return None;
        }
        let outcome = self.rx.recv().await?;
        Some(self.apply(outcome))
    }

    fn apply(&mut self, outcome: CompletionOutcome) -> AppliedFollowUps {
        self.pending = self.pending.saturating_sub(1);
        let new_ids = self.store.append_tasks(outcome.drafts);
        info!(
            completed_id = outcome.task_id,
            source = ?outcome.source,
            ?new_ids,
            "Follow-up tasks appended"
        );
        AppliedFollowUps {
            completed_id: outcome.task_id,
            source: outcome.source,
            new_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::tests::{FakeGenerator, Reply};
    use crate::fields::{FallbackSet, Status};
    use crate::generator::{GenerationError, TextGenerator};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    fn session_with(generator: Arc<dyn TextGenerator>) -> Session {
        Session::new(
            TaskStore::seeded(),
            CompletionWorkflow::new(generator),
            Handle::current(),
        )
    }

    /// Holds every request until a permit is released.
    struct GatedGenerator {
        gate: Semaphore,
    }

    #[async_trait]
    impl TextGenerator for GatedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| GenerationError::Network(e.to_string()))?;
            permit.forget();
            Ok(r#"{"generated_text": "Late A\nLate B"}"#.to_string())
        }
    }

    #[tokio::test]
    async fn test_complete_flips_status_before_follow_ups() {
        let mut session = session_with(FakeGenerator::new(Reply::Network));
        assert!(session.complete_task(1));

        assert_eq!(session.store().get(1).unwrap().status, Status::Completed);
        assert_eq!(session.store().len(), 2);
        assert_eq!(session.pending(), 1);

        let applied = session.next_finished().await.unwrap();
        assert_eq!(applied.completed_id, 1);
        assert_eq!(applied.source, FollowUpSource::Fallback(FallbackSet::Transport));
        assert_eq!(applied.new_ids, vec![3, 4]);
        assert_eq!(session.store().len(), 4);
        assert_eq!(session.pending(), 0);

        let first = session.store().get(3).unwrap();
        assert_eq!(first.text, "Regret completing \"Start my useless project\"");
        assert_eq!(first.status, Status::Todo);
        assert_eq!(first.parent, Some(1));
    }

    #[tokio::test]
    async fn test_every_completion_adds_two() {
        for reply in [
            Reply::Body(r#"{"generated_text": "A\nB"}"#),
            Reply::Body(r#"{"generated_text": "A"}"#),
            Reply::Body("not json"),
            Reply::Status(503),
            Reply::Panic,
        ] {
            let mut session = session_with(FakeGenerator::new(reply));
            let mut expected = session.store().len();
            for _ in 0..3 {
                let id = session
                    .store()
                    .tasks()
                    .iter()
                    .find(|t| t.status == Status::Todo)
                    .map(|t| t.id)
                    .unwrap();
                assert!(session.complete_task(id));
                session.next_finished().await.unwrap();
                expected += 2;
                assert_eq!(session.store().len(), expected);
            }
            let ids: HashSet<u64> = session.store().tasks().iter().map(|t| t.id).collect();
            assert_eq!(ids.len(), session.store().len());
        }
    }

    #[tokio::test]
    async fn test_unknown_and_repeated_completion_spawn_nothing() {
        let generator = FakeGenerator::new(Reply::Network);
        let mut session = session_with(generator.clone());

        assert!(!session.complete_task(42));
        assert_eq!(session.pending(), 0);
        assert!(session.next_finished().await.is_none());

        assert!(session.complete_task(2));
        assert!(!session.complete_task(2));
        assert_eq!(session.pending(), 1);
        session.next_finished().await.unwrap();
        assert_eq!(generator.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_apply_finished_drains_concurrent_completions() {
        let mut session = session_with(FakeGenerator::new(Reply::Body("[]")));
        assert!(session.complete_task(1));
        assert!(session.complete_task(2));

        let mut applied = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), async {
            while session.pending() > 0 {
                applied.extend(session.apply_finished());
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        assert_eq!(applied.len(), 2);
        assert_eq!(session.store().len(), 6);
        let completed: HashSet<u64> = applied.iter().map(|a| a.completed_id).collect();
        assert_eq!(completed, HashSet::from([1, 2]));
        // The two follow-ups of one completion stay adjacent and in order.
        for a in &applied {
            assert_eq!(a.new_ids[1], a.new_ids[0] + 1);
            let first = session.store().get(a.new_ids[0]).unwrap();
            assert!(first.text.starts_with("Overthink the completion of"));
        }
    }

    #[tokio::test]
    async fn test_late_outcome_appends_after_later_adds() {
        let generator = Arc::new(GatedGenerator {
            gate: Semaphore::new(0),
        });
        let mut session = session_with(generator.clone());

        assert!(session.complete_task(1));
        let manual = session.add_task(Some("Meanwhile"), None);
        assert!(session.apply_finished().is_empty());

        generator.gate.add_permits(1);
        let applied = session.next_finished().await.unwrap();

        let texts: Vec<&str> = session.store().tasks().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts[2..], ["Meanwhile", "Late A", "Late B"]);
        assert!(applied.new_ids.iter().all(|&id| id > manual));
    }
}
