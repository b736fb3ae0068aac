//! Completion heuristic engine.
//!
//! Consumes file-change and commit events, scores them against the
//! latest parsed task list, and emits confidence-weighted
//! [`CompletionProposal`]s. The engine only ever proposes; disposition
//! of a proposal (auto-apply, human review, discard) is decided by a
//! single canonical threshold pair applied uniformly.
//!
//! ```text
//! HeuristicEngine
//!   ├── file_signals   - change-kind + content scoring, candidate gating
//!   ├── commit_signals - direct references, implicit message signals
//!   └── cooldowns      - per-path suppression of editor save bursts
//! ```

pub mod commit_signals;
pub mod file_signals;

pub use file_signals::ChangeKind;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::checklist::Task;
use crate::gitlog::GitCommit;

/// Confidence at or above which a proposal is applied without
/// confirmation.
pub const AUTO_APPLY_THRESHOLD: f64 = 0.9;

/// Confidence at or below which a proposal is discarded. Scores between
/// the two thresholds are surfaced for human review.
pub const REVIEW_THRESHOLD: f64 = 0.7;

/// Default per-path cooldown absorbing editor auto-save bursts.
pub const DEFAULT_FILE_COOLDOWN: Duration = Duration::from_secs(30);

// ============================================================================
// Proposals
// ============================================================================

/// Origin of a completion proposal, for review display and logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProposalSource {
    /// A watched file changed.
    File(PathBuf),
    /// A commit (optionally a specific changed file within it).
    Commit {
        hash: String,
        file: Option<PathBuf>,
    },
}

impl std::fmt::Display for ProposalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Commit { hash, file: None } => write!(f, "commit:{hash}"),
            Self::Commit {
                hash,
                file: Some(path),
            } => write!(f, "commit:{}:{}", hash, path.display()),
        }
    }
}

/// An ephemeral completion proposal. Never persisted.
#[derive(Debug, Clone)]
pub struct CompletionProposal {
    pub task: Task,
    pub source: ProposalSource,
    /// Heuristic confidence in `[0, 1]`
    pub confidence: f64,
}

/// What to do with a proposal, per the canonical threshold pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Apply without confirmation.
    AutoApply,
    /// Surface to the human-review collaborator.
    Review,
    /// Drop, no action.
    Discard,
}

/// Classify a confidence score.
#[must_use]
pub fn disposition(confidence: f64) -> Disposition {
    if confidence >= AUTO_APPLY_THRESHOLD {
        Disposition::AutoApply
    } else if confidence > REVIEW_THRESHOLD {
        Disposition::Review
    } else {
        Disposition::Discard
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Scores events against tasks and tracks per-path cooldowns.
///
/// Cooldown state is owned by the engine instance and lives for one
/// tracking session; it is created on start and discarded on stop.
#[derive(Debug)]
pub struct HeuristicEngine {
    cooldown: Duration,
    last_analyzed: HashMap<PathBuf, Instant>,
}

impl Default for HeuristicEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HeuristicEngine {
    /// Create an engine with the default file cooldown.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cooldown: DEFAULT_FILE_COOLDOWN,
            last_analyzed: HashMap::new(),
        }
    }

    /// Override the per-path cooldown (useful for testing).
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Check the per-path cooldown, recording the analysis time when it
    /// passes. Returns `false` while the path is still cooling down.
    pub fn should_analyze(&mut self, path: &Path) -> bool {
        let now = Instant::now();
        if let Some(last) = self.last_analyzed.get(path) {
            if now.duration_since(*last) < self.cooldown {
                return false;
            }
        }
        self.last_analyzed.insert(path.to_path_buf(), now);
        true
    }

    /// Score a file-change event against every candidate task.
    ///
    /// Already-completed tasks are never proposed. The per-path cooldown
    /// is applied first; a suppressed path yields no proposals.
    pub fn analyze_file_change(
        &mut self,
        tasks: &[Task],
        path: &Path,
        kind: ChangeKind,
        content: &str,
    ) -> Vec<CompletionProposal> {
        if !self.should_analyze(path) {
            return Vec::new();
        }

        let confidence = file_signals::score_file_change(kind, content);
        tasks
            .iter()
            .filter(|task| !task.is_completed)
            .filter(|task| file_signals::is_candidate(task, path))
            .map(|task| CompletionProposal {
                task: task.clone(),
                source: ProposalSource::File(path.to_path_buf()),
                confidence,
            })
            .collect()
    }

    /// Score a commit against every pending task.
    ///
    /// For each task the best of the whole-commit score and any per-file
    /// score is kept, so one task yields at most one proposal per
    /// commit.
    #[must_use]
    pub fn analyze_commit(&self, tasks: &[Task], commit: &GitCommit) -> Vec<CompletionProposal> {
        let mut proposals = Vec::new();

        for task in tasks.iter().filter(|task| !task.is_completed) {
            let mut best = commit_signals::score_commit(task, commit);
            let mut source = ProposalSource::Commit {
                hash: commit.hash.clone(),
                file: None,
            };

            for file in &commit.files {
                if !file_signals::is_candidate(task, file) {
                    continue;
                }
                let per_file = commit_signals::score_commit_file(task, commit, file);
                if per_file > best {
                    best = per_file;
                    source = ProposalSource::Commit {
                        hash: commit.hash.clone(),
                        file: Some(file.clone()),
                    };
                }
            }

            if best > 0.0 {
                proposals.push(CompletionProposal {
                    task: task.clone(),
                    source,
                    confidence: best,
                });
            }
        }

        proposals
    }
}

// ============================================================================
// Tests
// ============================================================================
