//! Tracking session: event loop, timers, and cancellation.
//!
//! Three trigger sources feed one bounded channel of typed
//! [`TrackerEvent`]s consumed by a single-writer loop: a host-driven
//! file watcher, a commit-log poll timer, and a workspace poll timer.
//! The loop owns the heuristic engine (and its cooldown state) for the
//! lifetime of the session; stopping the session cancels the timers,
//! drops the receiver, and lets in-flight review proposals finish
//! without scheduling further work.
//!
//! ```text
//! host watcher ──FileChanged──┐
//! commit timer ─CommitPollDue─┼──> mpsc ──> single-writer loop ──> Reconciler
//! workspace timer ─PollDue────┘                    │
//!                                                  └──> ReviewSurface (spawned)
//!                                                            │ accepted
//!                                                  ReviewAccepted event
//! ```
//!
//! Every analysis step is wrapped: a failing collaborator skips that
//! cycle's step with a logged cause and nothing else.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use globset::GlobSet;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::checklist::{self, Task};
use crate::config::TrackerConfig;
use crate::gitlog::CommitLogReader;
use crate::heuristics::{
    disposition, ChangeKind, CompletionProposal, Disposition, HeuristicEngine,
};
use crate::progress::CompletedBy;
use crate::reconciler::Reconciler;
use crate::review::{ReviewSurface, ReviewVerdict};
use crate::store::DocumentStore;
use crate::sync::SyncDispatcher;

/// Capacity of the trigger-event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// Events
// ============================================================================

/// Typed trigger events consumed by the reconciliation loop.
///
/// Modeling triggers as data removes the ordering assumptions of
/// callback registration and makes the loop testable with synthetic
/// events.
#[derive(Debug, Clone)]
pub enum TrackerEvent {
    /// A watched file was created or modified.
    FileChanged { path: PathBuf, kind: ChangeKind },
    /// The commit-log poll timer fired.
    CommitPollDue,
    /// The workspace analysis timer fired.
    WorkspacePollDue,
    /// A surfaced proposal was confirmed by the reviewer.
    ReviewAccepted {
        task_id: String,
        title: String,
        source: String,
    },
}

// ============================================================================
// Session Context
// ============================================================================

/// Collaborators and configuration for one tracking session.
pub struct SessionContext {
    pub config: TrackerConfig,
    pub store: Arc<dyn DocumentStore>,
    pub reconciler: Arc<Reconciler>,
    pub commit_log: Arc<dyn CommitLogReader>,
    pub review: Arc<dyn ReviewSurface>,
    pub sync: Arc<SyncDispatcher>,
}

// ============================================================================
// Session Handle
// ============================================================================

/// A running tracking session.
pub struct TrackerSession {
    events_tx: mpsc::Sender<TrackerEvent>,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl TrackerSession {
    /// Start a session: spawns the reconciliation loop and its timers.
    #[must_use]
    pub fn start(ctx: SessionContext) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let engine = HeuristicEngine::new().with_cooldown(ctx.config.file_cooldown());
        let tracker = TrackerLoop {
            ignore: ctx.config.ignore_set(),
            engine,
            events_tx: events_tx.clone(),
            checklist_hash: None,
            ctx,
        };
        let handle = tokio::spawn(tracker.run(events_rx, shutdown_rx));

        Self {
            events_tx,
            shutdown_tx,
            handle,
        }
    }

    /// Sender for feeding file-change events from the host's watcher.
    #[must_use]
    pub fn events(&self) -> mpsc::Sender<TrackerEvent> {
        self.events_tx.clone()
    }

    /// Stop tracking: cancels timers and detaches the event channel.
    ///
    /// In-flight analysis finishes before the loop exits; nothing is
    /// scheduled after stop.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }
}

// ============================================================================
// Reconciliation Loop
// ============================================================================

struct TrackerLoop {
    ctx: SessionContext,
    engine: HeuristicEngine,
    ignore: GlobSet,
    events_tx: mpsc::Sender<TrackerEvent>,
    /// Checklist text hash at the last recompute, to skip redundant
    /// snapshot writes.
    checklist_hash: Option<String>,
}

impl TrackerLoop {
    async fn run(
        mut self,
        mut events_rx: mpsc::Receiver<TrackerEvent>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut commit_poll =
            tokio::time::interval(Duration::from_secs(self.ctx.config.commit_poll_secs.max(1)));
        let mut workspace_poll = tokio::time::interval(Duration::from_secs(
            self.ctx.config.workspace_poll_secs.max(1),
        ));
        let mut heartbeat = tokio::time::interval(Duration::from_secs(
            self.ctx.config.sync_heartbeat_secs.max(1),
        ));
        commit_poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        workspace_poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(project_id = %self.ctx.config.project_id, "Tracking session started");

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                Some(event) = events_rx.recv() => {
                    self.handle_event(event).await;
                }
                _ = commit_poll.tick() => {
                    self.handle_event(TrackerEvent::CommitPollDue).await;
                }
                _ = workspace_poll.tick() => {
                    self.handle_event(TrackerEvent::WorkspacePollDue).await;
                }
                _ = heartbeat.tick() => {
                    self.push_heartbeat().await;
                }
            }
        }

        info!(project_id = %self.ctx.config.project_id, "Tracking session stopped");
    }

    async fn handle_event(&mut self, event: TrackerEvent) {
        match event {
            TrackerEvent::FileChanged { path, kind } => {
                self.handle_file_changed(path, kind).await;
            }
            TrackerEvent::CommitPollDue => self.handle_commit_poll().await,
            TrackerEvent::WorkspacePollDue => self.handle_workspace_poll().await,
            TrackerEvent::ReviewAccepted {
                task_id,
                title,
                source,
            } => {
                debug!(task_id = %task_id, source = %source, "Review accepted");
                self.apply(&task_id, &title).await;
            }
        }
    }

    /// Latest parse of the checklist document, or `None` when the
    /// document is unavailable this cycle.
    fn current_tasks(&self) -> Option<Vec<Task>> {
        match self.ctx.store.read_text(&self.ctx.config.checklist_path) {
            Ok(text) => Some(checklist::parse(&text)),
            Err(e) => {
                debug!("Checklist unavailable, skipping analysis: {e}");
                None
            }
        }
    }

    async fn handle_file_changed(&mut self, path: PathBuf, kind: ChangeKind) {
        if self.ignore.is_match(&path) {
            return;
        }
        let Some(tasks) = self.current_tasks() else {
            return;
        };
        let content = match self.ctx.store.read_text(&path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %path.display(), "File unreadable, skipping: {e}");
                return;
            }
        };

        let proposals = self
            .engine
            .analyze_file_change(&tasks, &path, kind, &content);
        self.dispose_all(proposals).await;
    }

    async fn handle_commit_poll(&mut self) {
        let commits = match self.ctx.commit_log.recent_commits(
            self.ctx.config.commit_window(),
            self.ctx.config.commit_limit,
        ) {
            Ok(commits) => commits,
            Err(e) => {
                debug!("Commit log unavailable, skipping poll: {e}");
                return;
            }
        };
        let Some(tasks) = self.current_tasks() else {
            return;
        };

        for commit in &commits {
            let proposals = self.engine.analyze_commit(&tasks, commit);
            self.dispose_all(proposals).await;
        }
    }

    async fn handle_workspace_poll(&mut self) {
        // Re-analyze files with uncommitted changes, subject to the same
        // per-path cooldown as watcher events.
        if let Ok(changed) = self.ctx.commit_log.working_tree_changes() {
            let Some(tasks) = self.current_tasks() else {
                return;
            };
            for path in changed {
                if self.ignore.is_match(&path) {
                    continue;
                }
                let Ok(content) = self.ctx.store.read_text(&path) else {
                    continue;
                };
                let proposals =
                    self.engine
                        .analyze_file_change(&tasks, &path, ChangeKind::Modify, &content);
                self.dispose_all(proposals).await;
            }
        }

        self.recompute_if_changed().await;
    }

    /// Recompute the snapshot when the checklist text changed since the
    /// last recompute.
    async fn recompute_if_changed(&mut self) {
        let text = match self.ctx.store.read_text(&self.ctx.config.checklist_path) {
            Ok(text) => text,
            Err(e) => {
                debug!("Checklist unavailable, skipping recompute: {e}");
                return;
            }
        };
        let hash = format!("{:x}", md5::compute(text.as_bytes()));
        if self.checklist_hash.as_deref() == Some(hash.as_str()) {
            return;
        }

        match self.ctx.reconciler.recompute_and_persist().await {
            Ok(snapshot) => {
                self.checklist_hash = Some(hash);
                self.ctx
                    .sync
                    .push(&snapshot, CompletedBy::AutoDetection)
                    .await;
            }
            Err(e) => warn!("Recompute failed, discarding cycle: {e}"),
        }
    }

    async fn dispose_all(&mut self, proposals: Vec<CompletionProposal>) {
        for proposal in proposals {
            self.dispose(proposal).await;
        }
    }

    async fn dispose(&mut self, proposal: CompletionProposal) {
        match disposition(proposal.confidence) {
            Disposition::AutoApply => {
                info!(
                    task_id = %proposal.task.id,
                    source = %proposal.source,
                    confidence = proposal.confidence,
                    "Auto-applying completion"
                );
                self.apply(&proposal.task.id, &proposal.task.title).await;
            }
            Disposition::Review => self.spawn_review(proposal),
            Disposition::Discard => {
                debug!(
                    task_id = %proposal.task.id,
                    confidence = proposal.confidence,
                    "Proposal below review threshold, discarding"
                );
            }
        }
    }

    async fn apply(&self, task_id: &str, title: &str) {
        match self
            .ctx
            .reconciler
            .apply_completion(task_id, title, CompletedBy::AutoDetection)
            .await
        {
            Ok(snapshot) => {
                self.ctx
                    .sync
                    .push(&snapshot, CompletedBy::AutoDetection)
                    .await;
            }
            Err(e) => warn!(task_id = %task_id, "Failed to apply completion: {e}"),
        }
    }

    /// Surface a proposal without blocking the loop.
    ///
    /// The review future may never resolve; an accepted verdict comes
    /// back as a [`TrackerEvent::ReviewAccepted`] through the channel.
    /// After stop the channel is closed and the send is a no-op.
    fn spawn_review(&self, proposal: CompletionProposal) {
        let review = Arc::clone(&self.ctx.review);
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            let verdict = review
                .propose(&proposal.task, &proposal.source, proposal.confidence)
                .await;
            match verdict {
                Ok(ReviewVerdict::Accepted) => {
                    let _ = events_tx
                        .send(TrackerEvent::ReviewAccepted {
                            task_id: proposal.task.id.clone(),
                            title: proposal.task.title.clone(),
                            source: proposal.source.to_string(),
                        })
                        .await;
                }
                Ok(ReviewVerdict::Dismissed) => {
                    debug!(task_id = %proposal.task.id, "Proposal dismissed by reviewer");
                }
                Err(e) => {
                    debug!(task_id = %proposal.task.id, "Review surface failed: {e}");
                }
            }
        });
    }

    async fn push_heartbeat(&self) {
        let snapshot = match self.ctx.reconciler.recompute_and_persist().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!("Heartbeat recompute failed, skipping push: {e}");
                return;
            }
        };
        self.ctx
            .sync
            .push(&snapshot, CompletedBy::AutoDetection)
            .await;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FsDocumentStore;
    use crate::testing::{MockCommitLog, MockReviewSurface};
    use std::path::Path;
    use tempfile::TempDir;

    fn test_config() -> TrackerConfig {
        let mut config = TrackerConfig::default().with_file_cooldown_secs(0);
        // Long timer intervals so tests drive the loop with synthetic
        // events only.
        config.commit_poll_secs = 3600;
        config.workspace_poll_secs = 3600;
        config.sync_heartbeat_secs = 3600;
        config
    }

    fn session_fixture(
        checklist: &str,
        review: Arc<MockReviewSurface>,
        commit_log: Arc<MockCommitLog>,
    ) -> (TempDir, Arc<dyn DocumentStore>, TrackerSession) {
        let temp = TempDir::new().unwrap();
        let store: Arc<dyn DocumentStore> = Arc::new(FsDocumentStore::new(temp.path()));
        store.write_text(Path::new("TASKS.md"), checklist).unwrap();

        let config = test_config();
        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&store),
            config.checklist_path.clone(),
            config.snapshot_path.clone(),
        ));
        let session = TrackerSession::start(SessionContext {
            config,
            store: Arc::clone(&store),
            reconciler,
            commit_log,
            review,
            sync: Arc::new(SyncDispatcher::disabled("test")),
        });
        (temp, store, session)
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("condition not reached within timeout");
    }

    #[tokio::test]
    async fn test_file_event_auto_applies_high_confidence() {
        let review = Arc::new(MockReviewSurface::accepting());
        let commit_log = Arc::new(MockCommitLog::default());
        let (_temp, store, session) =
            session_fixture("- [ ] 1 Build login form\n", review, commit_log);

        store
            .write_text(
                Path::new("src/login.test.ts"),
                "export function login() {}\nit('works', () => { expect(1).toBe(1); });\n",
            )
            .unwrap();
        session
            .events()
            .send(TrackerEvent::FileChanged {
                path: PathBuf::from("src/login.test.ts"),
                kind: ChangeKind::Create,
            })
            .await
            .unwrap();

        let store_for_check = Arc::clone(&store);
        wait_for(move || {
            store_for_check
                .read_text(Path::new("TASKS.md"))
                .map(|text| text.contains("- [x] 1 Build login form"))
                .unwrap_or(false)
        })
        .await;

        session.stop().await;
    }

    #[tokio::test]
    async fn test_commit_poll_applies_direct_reference() {
        use crate::gitlog::GitCommit;
        use chrono::Utc;

        let review = Arc::new(MockReviewSurface::dismissing());
        let commit_log = Arc::new(MockCommitLog::with_commits(vec![GitCommit {
            hash: "abc123".to_string(),
            message: "fixes #3.2 auth bug".to_string(),
            date: Utc::now(),
            files: vec![],
        }]));
        let (_temp, store, session) = session_fixture(
            "- [ ] 3 Auth work\n  - [ ] 3.2 Fix auth bug\n",
            review,
            commit_log,
        );

        session
            .events()
            .send(TrackerEvent::CommitPollDue)
            .await
            .unwrap();

        let store_for_check = Arc::clone(&store);
        wait_for(move || {
            store_for_check
                .read_text(Path::new("TASKS.md"))
                .map(|text| text.contains("- [x] 3.2 Fix auth bug"))
                .unwrap_or(false)
        })
        .await;

        session.stop().await;
    }

    #[tokio::test]
    async fn test_review_band_waits_for_acceptance() {
        let review = Arc::new(MockReviewSurface::accepting());
        let commit_log = Arc::new(MockCommitLog::default());
        let (_temp, store, session) = session_fixture(
            "- [ ] 1 Build login form\n",
            Arc::clone(&review),
            commit_log,
        );

        // Modify + test markers + export: 0.1 + 0.4 + 0.3 = 0.8 lands in
        // the review band.
        store
            .write_text(
                Path::new("src/login.ts"),
                "export function login() {}\nit('works', () => { expect(1).toBe(1); });\n",
            )
            .unwrap();
        session
            .events()
            .send(TrackerEvent::FileChanged {
                path: PathBuf::from("src/login.ts"),
                kind: ChangeKind::Modify,
            })
            .await
            .unwrap();

        let store_for_check = Arc::clone(&store);
        wait_for(move || {
            store_for_check
                .read_text(Path::new("TASKS.md"))
                .map(|text| text.contains("- [x] 1 Build login form"))
                .unwrap_or(false)
        })
        .await;
        assert_eq!(review.proposal_count(), 1);

        session.stop().await;
    }

    #[tokio::test]
    async fn test_review_dismissal_leaves_checklist_untouched() {
        let review = Arc::new(MockReviewSurface::dismissing());
        let commit_log = Arc::new(MockCommitLog::default());
        let (_temp, store, session) = session_fixture(
            "- [ ] 1 Build login form\n",
            Arc::clone(&review),
            commit_log,
        );

        store
            .write_text(
                Path::new("src/login.ts"),
                "export function login() {}\nit('works', () => { expect(1).toBe(1); });\n",
            )
            .unwrap();
        session
            .events()
            .send(TrackerEvent::FileChanged {
                path: PathBuf::from("src/login.ts"),
                kind: ChangeKind::Modify,
            })
            .await
            .unwrap();

        let review_for_check = Arc::clone(&review);
        wait_for(move || review_for_check.proposal_count() == 1).await;
        // Give any (incorrect) apply a chance to land before asserting.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let text = store.read_text(Path::new("TASKS.md")).unwrap();
        assert!(text.contains("- [ ] 1 Build login form"));

        session.stop().await;
    }

    #[tokio::test]
    async fn test_workspace_poll_recomputes_snapshot() {
        let review = Arc::new(MockReviewSurface::dismissing());
        let commit_log = Arc::new(MockCommitLog::default());
        let (temp, _store, session) = session_fixture(
            "- [ ] 1 Build login form\n- [x] 2 Write unit tests\n",
            review,
            commit_log,
        );

        session
            .events()
            .send(TrackerEvent::WorkspacePollDue)
            .await
            .unwrap();

        let snapshot_path = temp.path().join(".tally/progress.json");
        let path_for_check = snapshot_path.clone();
        wait_for(move || path_for_check.exists()).await;

        let text = std::fs::read_to_string(&snapshot_path).unwrap();
        let snapshot: crate::progress::ProgressData = serde_json::from_str(&text).unwrap();
        assert_eq!(snapshot.total_tasks, 2);
        assert_eq!(snapshot.completed_tasks, 1);
        assert_eq!(snapshot.percentage, 50);

        session.stop().await;
    }

    #[tokio::test]
    async fn test_missing_checklist_degrades_silently() {
        let review = Arc::new(MockReviewSurface::dismissing());
        let commit_log = Arc::new(MockCommitLog::default());
        let temp = TempDir::new().unwrap();
        let store: Arc<dyn DocumentStore> = Arc::new(FsDocumentStore::new(temp.path()));

        let config = test_config();
        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&store),
            config.checklist_path.clone(),
            config.snapshot_path.clone(),
        ));
        let session = TrackerSession::start(SessionContext {
            config,
            store: Arc::clone(&store),
            reconciler,
            commit_log,
            review,
            sync: Arc::new(SyncDispatcher::disabled("test")),
        });

        session
            .events()
            .send(TrackerEvent::FileChanged {
                path: PathBuf::from("src/anything.rs"),
                kind: ChangeKind::Modify,
            })
            .await
            .unwrap();
        session
            .events()
            .send(TrackerEvent::WorkspacePollDue)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Stop must still work cleanly.
        session.stop().await;
    }

    #[tokio::test]
    async fn test_stop_is_deterministic() {
        let review = Arc::new(MockReviewSurface::dismissing());
        let commit_log = Arc::new(MockCommitLog::default());
        let (_temp, _store, session) =
            session_fixture("- [ ] 1 Build login form\n", review, commit_log);

        let events = session.events();
        session.stop().await;

        // Sends after stop fail; no further work is scheduled.
        assert!(events.send(TrackerEvent::CommitPollDue).await.is_err());
    }
}
