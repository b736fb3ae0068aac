//! Commit-message scoring for completion inference.
//!
//! Two signal families feed the same confidence scale. A direct
//! reference ("fixes #3.2") that names a task identifier is near-certain
//! and overrides the heuristics; everything else accumulates weighted
//! implicit signals: completion verbs, title-word overlap, and commit
//! breadth.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::checklist::Task;
use crate::gitlog::GitCommit;
use crate::heuristics::file_signals;

/// Confidence assigned to a commit that names the task identifier.
pub const DIRECT_REFERENCE_CONFIDENCE: f64 = 0.95;

/// Weight for a completion-declaring verb in the message.
const VERB_WEIGHT: f64 = 0.3;
/// Maximum weight contributed by title-word overlap.
const TITLE_OVERLAP_WEIGHT: f64 = 0.5;
/// Weight for a commit touching more than [`BROAD_COMMIT_FILES`] files.
const BREADTH_WEIGHT: f64 = 0.2;
/// File-count threshold for the breadth signal.
const BROAD_COMMIT_FILES: usize = 3;
/// Bump applied when a per-file score pairs with a file-related task.
pub const RELATED_FILE_BONUS: f64 = 0.2;

/// Title words shorter than this never count toward overlap.
const MIN_OVERLAP_WORD_LEN: usize = 4;

/// Completion-declaration patterns parameterized by a task identifier.
static DIRECT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bcomplete[sd]?\s+task\s+([0-9][0-9.]*)",
        r"(?i)\bcloses?\s+#([0-9][0-9.]*)",
        r"(?i)\bfix(?:es|ed)?\s+#([0-9][0-9.]*)",
        r"(?i)\bresolve[sd]?\s+#([0-9][0-9.]*)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Completion-declaring verbs for implicit inference.
static COMPLETION_VERBS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(complete|finish|implement|add|create|build|done)").unwrap()
});

/// Technology keywords matched between file paths and task text.
const TECH_KEYWORDS: &[&str] = &[
    "auth", "login", "api", "database", "schema", "test", "config", "component", "server",
    "client", "form", "search", "cache",
];

// ============================================================================
// Direct Reference
// ============================================================================

/// Task identifier captured by a completion-declaration pattern, if any.
#[must_use]
pub fn referenced_task_id(message: &str) -> Option<String> {
    for pattern in DIRECT_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(message) {
            let id = caps[1].trim_end_matches('.').to_string();
            if !id.is_empty() {
                return Some(id);
            }
        }
    }
    None
}

// ============================================================================
// Scoring
// ============================================================================

/// Implicit confidence signals from the commit message and breadth.
#[must_use]
pub fn implicit_score(task: &Task, commit: &GitCommit) -> f64 {
    let mut confidence = 0.0;
    let message = commit.message.to_lowercase();

    if COMPLETION_VERBS.is_match(&commit.message) {
        confidence += VERB_WEIGHT;
    }

    let title_words: Vec<String> = task
        .title
        .split_whitespace()
        .filter(|word| word.len() >= MIN_OVERLAP_WORD_LEN)
        .map(str::to_lowercase)
        .collect();
    if !title_words.is_empty() {
        let matching = title_words
            .iter()
            .filter(|word| message.contains(word.as_str()))
            .count();
        confidence += (matching as f64 / title_words.len() as f64) * TITLE_OVERLAP_WEIGHT;
    }

    if commit.files.len() > BROAD_COMMIT_FILES {
        confidence += BREADTH_WEIGHT;
    }

    confidence.clamp(0.0, 1.0)
}

/// Score a commit against a task.
///
/// An explicit reference to the task identifier returns
/// [`DIRECT_REFERENCE_CONFIDENCE`] regardless of other factors.
#[must_use]
pub fn score_commit(task: &Task, commit: &GitCommit) -> f64 {
    if referenced_task_id(&commit.message).as_deref() == Some(task.id.as_str()) {
        return DIRECT_REFERENCE_CONFIDENCE;
    }
    implicit_score(task, commit)
}

/// Score one changed file of a commit against a task.
///
/// Combines the implicit message score with the file-relation bump when
/// the task is found via [`is_related_to_file`]. Candidate gating by
/// file category is the caller's concern.
#[must_use]
pub fn score_commit_file(task: &Task, commit: &GitCommit, file: &Path) -> f64 {
    let mut confidence = implicit_score(task, commit);
    if is_related_to_file(task, file) {
        confidence += RELATED_FILE_BONUS;
    }
    confidence.clamp(0.0, 1.0)
}

// ============================================================================
// File Relation
// ============================================================================

/// Check whether a task's text relates to a file path.
///
/// Matches on the file's base name, on directory segments longer than
/// two characters, or on a technology keyword appearing in both the
/// path and the task text.
#[must_use]
pub fn is_related_to_file(task: &Task, file: &Path) -> bool {
    let text = task.search_text();

    let base = file_signals::base_name(file);
    if base.len() > 2 && text.contains(&base) {
        return true;
    }

    let path_str = file.to_string_lossy().to_lowercase();
    for segment in file.iter().take(file.iter().count().saturating_sub(1)) {
        let segment = segment.to_string_lossy().to_lowercase();
        if segment.len() > 2 && text.contains(segment.as_str()) {
            return true;
        }
    }

    TECH_KEYWORDS
        .iter()
        .any(|keyword| path_str.contains(keyword) && text.contains(keyword))
}

/// Find all tasks whose text relates to a file path.
#[must_use]
pub fn find_tasks_related_to_file<'a>(tasks: &'a [Task], file: &Path) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|task| is_related_to_file(task, file))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
