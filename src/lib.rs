//! Tally - Checklist Progress Tracking
//!
//! A Rust tracker for hierarchical, checklist-style task documents that
//! infers task completion from side signals: file edits and commit
//! history. Inferred completions are reconciled against a persisted
//! progress snapshot and produce a time-ordered activity log.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`checklist`] - Checklist document parsing and marker surgery
//! - [`progress`] - Progress snapshot types and the aggregate calculator
//! - [`heuristics`] - Confidence scoring of file and commit events
//! - [`reconciler`] - Applies completions and recomputed snapshots
//! - [`gitlog`] - Commit-log reader collaborator
//! - [`store`] - Document store collaborator
//! - [`review`] - Human-review collaborator contract
//! - [`sync`] - Best-effort remote snapshot push
//! - [`session`] - Event loop, timers, and cancellation
//! - [`config`] - Tracker configuration
//! - [`error`] - Custom error types and handling
//! - [`testing`] - Testing infrastructure (mock collaborators)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tally::config::TrackerConfig;
//! use tally::gitlog::GitLogReader;
//! use tally::reconciler::Reconciler;
//! use tally::review::LoggingReview;
//! use tally::session::{SessionContext, TrackerSession};
//! use tally::store::FsDocumentStore;
//! use tally::sync::SyncDispatcher;
//!
//! let config = TrackerConfig::load(".".as_ref())?;
//! let store = Arc::new(FsDocumentStore::new("."));
//! let reconciler = Arc::new(Reconciler::new(
//!     store.clone(),
//!     config.checklist_path.clone(),
//!     config.snapshot_path.clone(),
//! ));
//! let session = TrackerSession::start(SessionContext {
//!     config,
//!     store,
//!     reconciler,
//!     commit_log: Arc::new(GitLogReader::new(".")),
//!     review: Arc::new(LoggingReview),
//!     sync: Arc::new(SyncDispatcher::disabled("demo")),
//! });
//! ```

pub mod checklist;
pub mod config;
pub mod error;
pub mod gitlog;
pub mod heuristics;
pub mod progress;
pub mod reconciler;
pub mod review;
pub mod session;
pub mod store;
pub mod sync;
pub mod testing;

// Re-export commonly used types
pub use error::{Result, TallyError};

// Re-export the core domain types
pub use checklist::{parse, MarkOutcome, Task};
pub use progress::{compute, ActivityItem, CompletedBy, Milestone, ProgressData};

// Re-export heuristic types
pub use heuristics::{
    disposition, ChangeKind, CompletionProposal, Disposition, HeuristicEngine, ProposalSource,
    AUTO_APPLY_THRESHOLD, REVIEW_THRESHOLD,
};

// Re-export collaborator contracts
pub use gitlog::{CommitLogReader, CommitSummary, GitCommit, GitLogReader};
pub use reconciler::{NullObserver, ProgressObserver, Reconciler};
pub use review::{LoggingReview, ReviewSurface, ReviewVerdict};
pub use store::{DocumentStore, FsDocumentStore, SnapshotStore};
pub use sync::{HttpSyncEndpoint, SnapshotPayload, SyncDispatcher, SyncEndpoint};

// Re-export session types
pub use config::TrackerConfig;
pub use session::{SessionContext, TrackerEvent, TrackerSession};
