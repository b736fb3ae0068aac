//! Progress store reconciliation.
//!
//! The reconciler is the only writer of the checklist document and the
//! progress snapshot. It offers two paths: a targeted completion append
//! used by auto-detection and manual completion, and a full-snapshot
//! recompute that runs the progress calculator against the previous
//! persisted state. Writes are serialized behind an async mutex so a
//! manually triggered recompute cannot race a concurrently applied
//! completion.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::checklist::{self, MarkOutcome};
use crate::error::Result;
use crate::progress::{self, ActivityItem, CompletedBy, ProgressData};
use crate::store::{DocumentStore, SnapshotStore};

// ============================================================================
// Progress Observer
// ============================================================================

/// Notified after every successful reconciliation.
///
/// This is the typed seam to the (external) UI layer; implementations
/// must not block.
pub trait ProgressObserver: Send + Sync {
    fn progress_changed(&self, snapshot: &ProgressData);
}

/// Observer that ignores all notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl ProgressObserver for NullObserver {
    fn progress_changed(&self, _snapshot: &ProgressData) {}
}

// ============================================================================
// Reconciler
// ============================================================================

/// Applies completions and recomputed snapshots to persisted state.
pub struct Reconciler {
    store: Arc<dyn DocumentStore>,
    checklist_path: PathBuf,
    snapshots: SnapshotStore,
    observer: Arc<dyn ProgressObserver>,
    write_lock: Mutex<()>,
}

impl Reconciler {
    /// Create a reconciler over the given store paths.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        checklist_path: impl Into<PathBuf>,
        snapshot_path: impl Into<PathBuf>,
    ) -> Self {
        let snapshots = SnapshotStore::new(Arc::clone(&store), snapshot_path);
        Self {
            store,
            checklist_path: checklist_path.into(),
            snapshots,
            observer: Arc::new(NullObserver),
            write_lock: Mutex::new(()),
        }
    }

    /// Attach a progress observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Apply a single task completion.
    ///
    /// Flips the matched task line's marker, prepends an activity entry
    /// (evicting any existing entry for the same task id), and persists
    /// the snapshot. Safe to call any number of times for the same task:
    /// an already-completed line is left unchanged and the activity log
    /// never accumulates duplicates.
    ///
    /// # Errors
    ///
    /// Returns an error when the checklist document is unreadable or a
    /// write fails; in-memory state is discarded in that case.
    pub async fn apply_completion(
        &self,
        task_id: &str,
        title: &str,
        completed_by: CompletedBy,
    ) -> Result<ProgressData> {
        let _guard = self.write_lock.lock().await;
        let now = Utc::now();

        let text = self.store.read_text(&self.checklist_path)?;
        match checklist::mark_complete(&text, task_id) {
            MarkOutcome::Updated(updated) => {
                self.store.write_text(&self.checklist_path, &updated)?;
                info!(task_id, completed_by = %completed_by, "Task marked complete");
            }
            MarkOutcome::AlreadyComplete => {
                debug!(task_id, "Task already complete; checklist unchanged");
            }
            MarkOutcome::NotFound => {
                debug!(task_id, "No checklist line matched; recording activity only");
            }
        }

        let mut snapshot = self.snapshots.load_or_default(now);
        snapshot.record_completion(ActivityItem {
            task_id: task_id.to_string(),
            title: title.to_string(),
            completed_at: now,
            completed_by,
        });
        snapshot.last_updated = now;
        self.snapshots.save(&snapshot)?;

        self.observer.progress_changed(&snapshot);
        Ok(snapshot)
    }

    /// Recompute the full snapshot from the current checklist document.
    ///
    /// Parses the checklist, runs the progress calculator against the
    /// previous persisted snapshot, persists the result, and returns it.
    ///
    /// # Errors
    ///
    /// Returns an error when the checklist document is unreadable or the
    /// snapshot write fails.
    pub async fn recompute_and_persist(&self) -> Result<ProgressData> {
        let _guard = self.write_lock.lock().await;
        let now = Utc::now();

        let text = self.store.read_text(&self.checklist_path)?;
        let tasks = checklist::parse(&text);
        let previous = self.snapshots.load_or_default(now);
        let snapshot = progress::compute(&tasks, Some(&previous), now);
        self.snapshots.save(&snapshot)?;

        debug!(
            total = snapshot.total_tasks,
            completed = snapshot.completed_tasks,
            percentage = snapshot.percentage,
            "Snapshot recomputed"
        );
        self.observer.progress_changed(&snapshot);
        Ok(snapshot)
    }

    /// The checklist document path this reconciler operates on.
    #[must_use]
    pub fn checklist_path(&self) -> &std::path::Path {
        &self.checklist_path
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FsDocumentStore;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingObserver(AtomicUsize);

    impl ProgressObserver for CountingObserver {
        fn progress_changed(&self, _snapshot: &ProgressData) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn fixture(text: &str) -> (TempDir, Arc<dyn DocumentStore>, Reconciler) {
        let temp = TempDir::new().unwrap();
        let store: Arc<dyn DocumentStore> = Arc::new(FsDocumentStore::new(temp.path()));
        store.write_text(Path::new("TASKS.md"), text).unwrap();
        let reconciler = Reconciler::new(
            Arc::clone(&store),
            "TASKS.md",
            ".tally/progress.json",
        );
        (temp, store, reconciler)
    }

    #[tokio::test]
    async fn test_apply_completion_flips_marker() {
        let (_temp, store, reconciler) =
            fixture("- [ ] 1 Build login form\n- [ ] 2 Write unit tests\n");

        let snapshot = reconciler
            .apply_completion("1", "Build login form", CompletedBy::AutoDetection)
            .await
            .unwrap();

        let text = store.read_text(Path::new("TASKS.md")).unwrap();
        assert!(text.contains("- [x] 1 Build login form"));
        assert_eq!(snapshot.recent_activity.len(), 1);
        assert_eq!(snapshot.recent_activity[0].task_id, "1");
    }

    #[tokio::test]
    async fn test_apply_completion_idempotent() {
        let (_temp, store, reconciler) = fixture("- [ ] 1 Build login form\n");

        reconciler
            .apply_completion("1", "Build login form", CompletedBy::Manual)
            .await
            .unwrap();
        let after_first = store.read_text(Path::new("TASKS.md")).unwrap();

        let snapshot = reconciler
            .apply_completion("1", "Build login form", CompletedBy::Manual)
            .await
            .unwrap();
        let after_second = store.read_text(Path::new("TASKS.md")).unwrap();

        assert_eq!(after_first, after_second);
        assert_eq!(snapshot.recent_activity.len(), 1);
    }

    #[tokio::test]
    async fn test_apply_completion_missing_checklist_errors() {
        let temp = TempDir::new().unwrap();
        let store: Arc<dyn DocumentStore> = Arc::new(FsDocumentStore::new(temp.path()));
        let reconciler = Reconciler::new(store, "TASKS.md", "progress.json");

        let result = reconciler
            .apply_completion("1", "Anything", CompletedBy::Manual)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_recompute_and_persist() {
        let (_temp, _store, reconciler) =
            fixture("- [ ] 1 Build login form\n- [x] 2 Write unit tests\n");

        let snapshot = reconciler.recompute_and_persist().await.unwrap();
        assert_eq!(snapshot.total_tasks, 2);
        assert_eq!(snapshot.completed_tasks, 1);
        assert_eq!(snapshot.percentage, 50);
    }

    #[tokio::test]
    async fn test_recompute_idempotent_totals() {
        let (_temp, store, reconciler) = fixture("- [ ] 1 Build login form\n");

        reconciler
            .apply_completion("1", "Build login form", CompletedBy::AutoDetection)
            .await
            .unwrap();
        let first = reconciler.recompute_and_persist().await.unwrap();

        // Applying the same completion again must not change totals.
        reconciler
            .apply_completion("1", "Build login form", CompletedBy::AutoDetection)
            .await
            .unwrap();
        let second = reconciler.recompute_and_persist().await.unwrap();

        assert_eq!(first.total_tasks, second.total_tasks);
        assert_eq!(first.completed_tasks, second.completed_tasks);
        assert_eq!(first.percentage, second.percentage);
        let _ = store;
    }

    #[tokio::test]
    async fn test_recompute_preserves_activity_entries() {
        let (_temp, _store, reconciler) = fixture("- [ ] 1 Build login form\n");

        reconciler
            .apply_completion("1", "Build login form", CompletedBy::AutoDetection)
            .await
            .unwrap();
        let snapshot = reconciler.recompute_and_persist().await.unwrap();

        assert_eq!(snapshot.recent_activity.len(), 1);
        assert_eq!(snapshot.recent_activity[0].task_id, "1");
    }

    #[tokio::test]
    async fn test_observer_notified_on_both_paths() {
        let (_temp, _store, reconciler) = fixture("- [ ] 1 Build login form\n");
        let observer = Arc::new(CountingObserver(AtomicUsize::new(0)));
        let reconciler = reconciler.with_observer(observer.clone());

        reconciler
            .apply_completion("1", "Build login form", CompletedBy::Manual)
            .await
            .unwrap();
        reconciler.recompute_and_persist().await.unwrap();

        assert_eq!(observer.0.load(Ordering::SeqCst), 2);
    }
}
