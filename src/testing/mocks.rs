//! Mock implementations of collaborator traits.
//!
//! These mocks provide controllable test doubles for the tracker's
//! external dependencies, enabling deterministic tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::checklist::Task;
use crate::error::{Result, TallyError};
use crate::gitlog::{CommitLogReader, CommitSummary, GitCommit};
use crate::heuristics::ProposalSource;
use crate::review::{ReviewSurface, ReviewVerdict};
use crate::store::DocumentStore;
use crate::sync::{SnapshotPayload, SyncEndpoint};

// ============================================================================
// Document Store
// ============================================================================

/// In-memory document store.
///
/// # Example
///
/// ```rust,ignore
/// let store = MockDocumentStore::new()
///     .with_document("TASKS.md", "- [ ] 1 First\n");
/// assert!(store.read_text(Path::new("TASKS.md")).is_ok());
/// ```
#[derive(Debug, Default)]
pub struct MockDocumentStore {
    documents: Mutex<HashMap<PathBuf, String>>,
}

impl MockDocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document.
    #[must_use]
    pub fn with_document(self, path: &str, content: &str) -> Self {
        self.documents
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), content.to_string());
        self
    }

    /// Current content of a document, if present.
    #[must_use]
    pub fn document(&self, path: &str) -> Option<String> {
        self.documents
            .lock()
            .unwrap()
            .get(Path::new(path))
            .cloned()
    }
}

impl DocumentStore for MockDocumentStore {
    fn read_text(&self, path: &Path) -> Result<String> {
        self.documents
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| TallyError::not_found(path.to_path_buf()))
    }

    fn write_text(&self, path: &Path, content: &str) -> Result<()> {
        self.documents
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }
}

// ============================================================================
// Commit Log
// ============================================================================

/// Scripted commit-log reader.
#[derive(Debug, Default)]
pub struct MockCommitLog {
    commits: Vec<GitCommit>,
    working_tree: Vec<PathBuf>,
    unavailable: bool,
}

impl MockCommitLog {
    /// Reader that returns the given commits from every poll.
    #[must_use]
    pub fn with_commits(commits: Vec<GitCommit>) -> Self {
        Self {
            commits,
            ..Self::default()
        }
    }

    /// Set the working-tree change list.
    #[must_use]
    pub fn with_working_tree_changes(mut self, files: Vec<PathBuf>) -> Self {
        self.working_tree = files;
        self
    }

    /// Reader that fails every call, simulating a missing repository.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }
}

impl CommitLogReader for MockCommitLog {
    fn recent_commits(&self, _since: Duration, limit: usize) -> Result<Vec<GitCommit>> {
        if self.unavailable {
            return Err(TallyError::git("log", "no version-control history"));
        }
        Ok(self.commits.iter().take(limit).cloned().collect())
    }

    fn commits_touching(&self, path: &Path, limit: usize) -> Result<Vec<CommitSummary>> {
        if self.unavailable {
            return Err(TallyError::git("log", "no version-control history"));
        }
        Ok(self
            .commits
            .iter()
            .filter(|commit| commit.files.iter().any(|f| f == path))
            .take(limit)
            .map(|commit| CommitSummary {
                hash: commit.hash.clone(),
                message: commit.message.clone(),
                date: commit.date,
            })
            .collect())
    }

    fn working_tree_changes(&self) -> Result<Vec<PathBuf>> {
        if self.unavailable {
            return Err(TallyError::git("status", "no version-control history"));
        }
        Ok(self.working_tree.clone())
    }
}

// ============================================================================
// Review Surface
// ============================================================================

/// Review surface with a fixed verdict that records every proposal.
#[derive(Debug)]
pub struct MockReviewSurface {
    verdict: ReviewVerdict,
    proposals: Mutex<Vec<(String, String, f64)>>,
}

impl MockReviewSurface {
    /// Surface that accepts every proposal.
    #[must_use]
    pub fn accepting() -> Self {
        Self {
            verdict: ReviewVerdict::Accepted,
            proposals: Mutex::new(Vec::new()),
        }
    }

    /// Surface that dismisses every proposal.
    #[must_use]
    pub fn dismissing() -> Self {
        Self {
            verdict: ReviewVerdict::Dismissed,
            proposals: Mutex::new(Vec::new()),
        }
    }

    /// Number of proposals surfaced so far.
    #[must_use]
    pub fn proposal_count(&self) -> usize {
        self.proposals.lock().unwrap().len()
    }

    /// Recorded proposals as (task id, source, confidence).
    #[must_use]
    pub fn proposals(&self) -> Vec<(String, String, f64)> {
        self.proposals.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReviewSurface for MockReviewSurface {
    async fn propose(
        &self,
        task: &Task,
        source: &ProposalSource,
        confidence: f64,
    ) -> Result<ReviewVerdict> {
        self.proposals
            .lock()
            .unwrap()
            .push((task.id.clone(), source.to_string(), confidence));
        Ok(self.verdict)
    }
}

// ============================================================================
// Sync Endpoint
// ============================================================================

/// Endpoint that records pushed payloads.
#[derive(Debug, Default)]
pub struct MockSyncEndpoint {
    payloads: Mutex<Vec<SnapshotPayload>>,
    failing: bool,
}

impl MockSyncEndpoint {
    /// Endpoint that accepts every push.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Endpoint that fails every push.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            payloads: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    /// Number of successful pushes recorded.
    #[must_use]
    pub fn push_count(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }

    /// Recorded payloads.
    #[must_use]
    pub fn payloads(&self) -> Vec<SnapshotPayload> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl SyncEndpoint for MockSyncEndpoint {
    async fn push_snapshot(&self, payload: &SnapshotPayload) -> Result<()> {
        if self.failing {
            return Err(TallyError::sync("connection refused"));
        }
        self.payloads.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist;

    #[test]
    fn test_mock_store_roundtrip() {
        let store = MockDocumentStore::new().with_document("TASKS.md", "- [ ] 1 First\n");
        assert_eq!(
            store.read_text(Path::new("TASKS.md")).unwrap(),
            "- [ ] 1 First\n"
        );

        store.write_text(Path::new("TASKS.md"), "- [x] 1 First\n").unwrap();
        assert_eq!(store.document("TASKS.md").unwrap(), "- [x] 1 First\n");
    }

    #[test]
    fn test_mock_store_missing_is_not_found() {
        let store = MockDocumentStore::new();
        let err = store.read_text(Path::new("absent.md")).unwrap_err();
        assert!(matches!(err, TallyError::DocumentNotFound { .. }));
    }

    #[test]
    fn test_mock_commit_log_unavailable() {
        let log = MockCommitLog::unavailable();
        assert!(log.recent_commits(Duration::from_secs(60), 10).is_err());
        assert!(log.working_tree_changes().is_err());
    }

    #[tokio::test]
    async fn test_mock_review_records_proposals() {
        let surface = MockReviewSurface::accepting();
        let task = checklist::parse("- [ ] 1 Build login form\n").remove(0);
        let source = ProposalSource::File(PathBuf::from("src/login.ts"));

        let verdict = surface.propose(&task, &source, 0.8).await.unwrap();
        assert_eq!(verdict, ReviewVerdict::Accepted);
        assert_eq!(surface.proposal_count(), 1);
        assert_eq!(surface.proposals()[0].0, "1");
    }

    #[tokio::test]
    async fn test_mock_sync_endpoint_failing() {
        let endpoint = MockSyncEndpoint::failing();
        let payload = SnapshotPayload {
            project_id: "demo".to_string(),
            total_tasks: 0,
            completed_tasks: 0,
            percentage: 0,
            last_updated: chrono::Utc::now(),
            recent_activity: Vec::new(),
            source: crate::progress::CompletedBy::Manual,
            timestamp: chrono::Utc::now(),
        };
        assert!(endpoint.push_snapshot(&payload).await.is_err());
        assert_eq!(endpoint.push_count(), 0);
    }
}
