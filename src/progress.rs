//! Progress snapshot types and the aggregate calculator.
//!
//! [`ProgressData`] is the only durable state in the tracker: it is read
//! at the start of a reconciliation, mutated, and written back as a whole
//! document. [`compute`] derives a fresh snapshot from a parsed task list
//! and the previous snapshot, producing the activity-log delta between
//! the two.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::checklist::Task;

/// Maximum number of entries retained in `recent_activity`.
pub const ACTIVITY_CAP: usize = 10;

/// Recency window for retaining activity entries whose task is no longer
/// marked completed.
pub const ACTIVITY_RETENTION_DAYS: i64 = 7;

// ============================================================================
// Activity
// ============================================================================

/// Attribution for a completion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletedBy {
    /// Explicit user action.
    #[serde(rename = "manual")]
    Manual,
    /// Inferred by the heuristic engine.
    #[serde(rename = "auto-detection")]
    AutoDetection,
}

impl std::fmt::Display for CompletedBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::AutoDetection => write!(f, "auto-detection"),
        }
    }
}

/// One completion event in the activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    pub task_id: String,
    pub title: String,
    pub completed_at: DateTime<Utc>,
    pub completed_by: CompletedBy,
}

/// A user-defined milestone, independent of task completion.
///
/// Milestones are created only through explicit user action and pass
/// through the calculator untouched; the inference engine never mutates
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub name: String,
    pub target_date: DateTime<Utc>,
    pub progress: u8,
}

// ============================================================================
// Progress Snapshot
// ============================================================================

/// The persisted aggregate snapshot for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressData {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    /// Integer 0-100; 0 when `total_tasks` is 0
    pub percentage: u8,
    pub last_updated: DateTime<Utc>,
    /// Most-recent-first, capped at [`ACTIVITY_CAP`], one entry per task id
    #[serde(default)]
    pub recent_activity: Vec<ActivityItem>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
}

impl ProgressData {
    /// Create an empty snapshot.
    #[must_use]
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            total_tasks: 0,
            completed_tasks: 0,
            percentage: 0,
            last_updated: now,
            recent_activity: Vec::new(),
            milestones: Vec::new(),
        }
    }

    /// Prepend a completion event, evicting any existing entry for the
    /// same task id and capping the list at [`ACTIVITY_CAP`].
    ///
    /// A later completion of the same task replaces, not appends, so the
    /// log never accumulates duplicates.
    pub fn record_completion(&mut self, item: ActivityItem) {
        self.recent_activity
            .retain(|existing| existing.task_id != item.task_id);
        self.recent_activity.insert(0, item);
        self.recent_activity.truncate(ACTIVITY_CAP);
    }
}

// ============================================================================
// Calculator
// ============================================================================

/// Integer percentage of completed tasks, rounded; 0 when `total` is 0.
#[must_use]
pub fn percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u8
}

/// Derive a fresh snapshot from a parsed task list.
///
/// When a previous snapshot is supplied, any task now completed whose id
/// is absent from the previous activity log is treated as newly completed
/// and generates an auto-detection [`ActivityItem`]. Retained previous
/// entries are filtered to those still completed or still within the
/// [`ACTIVITY_RETENTION_DAYS`] window; newly completed items are placed
/// first and the merged list is truncated to [`ACTIVITY_CAP`]. Milestones
/// pass through unchanged.
///
/// `now` is injected so the function stays pure and independently
/// testable.
#[must_use]
pub fn compute(tasks: &[Task], previous: Option<&ProgressData>, now: DateTime<Utc>) -> ProgressData {
    let total_tasks = tasks.len();
    let completed_tasks = tasks.iter().filter(|task| task.is_completed).count();

    let mut recent_activity = Vec::new();
    let mut milestones = Vec::new();

    if let Some(previous) = previous {
        let known_ids: HashSet<&str> = previous
            .recent_activity
            .iter()
            .map(|item| item.task_id.as_str())
            .collect();

        for task in tasks.iter().filter(|task| task.is_completed) {
            if !known_ids.contains(task.id.as_str()) {
                recent_activity.push(ActivityItem {
                    task_id: task.id.clone(),
                    title: task.title.clone(),
                    completed_at: now,
                    completed_by: CompletedBy::AutoDetection,
                });
            }
        }

        let retention = Duration::days(ACTIVITY_RETENTION_DAYS);
        let still_completed: HashSet<&str> = tasks
            .iter()
            .filter(|task| task.is_completed)
            .map(|task| task.id.as_str())
            .collect();
        recent_activity.extend(
            previous
                .recent_activity
                .iter()
                .filter(|item| {
                    still_completed.contains(item.task_id.as_str())
                        || now - item.completed_at <= retention
                })
                .cloned(),
        );
        recent_activity.truncate(ACTIVITY_CAP);

        milestones = previous.milestones.clone();
    }

    ProgressData {
        total_tasks,
        completed_tasks,
        percentage: percentage(completed_tasks, total_tasks),
        last_updated: now,
        recent_activity,
        milestones,
    }
}

// ============================================================================
// Tests
// ============================================================================
