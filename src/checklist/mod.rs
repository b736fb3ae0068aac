//! Checklist document parsing.
//!
//! This module turns the raw text of a checklist-style task document into
//! an ordered list of [`Task`] records with hierarchy and annotations.
//!
//! A task line begins with optional whitespace, a dash, and a bracketed
//! single-character completion marker:
//!
//! ```text
//! - [ ] 1 Build login form
//! - [x] 2 Write unit tests
//!   - [ ] 2.1 Cover the error path
//!     _Requirements: 4.1, 4.2_
//!     - Use the fixtures module
//! ```
//!
//! Parsing is pure and deterministic: the same document text always yields
//! a structurally identical task list. Unparsable lines are treated as
//! prose and skipped, never reported as errors.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Matches a task line: indentation, dash, single-character marker cell.
static TASK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)-\s*\[([^\]])\]\s*(.*)$").unwrap());

/// Matches a leading dotted numeral identifier ("3", "3.2", "1.2.1").
static DOTTED_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)*)\.?\s+(.*)$").unwrap());

/// Matches a requirements annotation, with or without a leading bullet.
static REQUIREMENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:-\s+)?_Requirements:\s*(.+?)_\s*$").unwrap());

/// Matches a free-text bullet line.
static BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*-\s+(.*\S)\s*$").unwrap());

// ============================================================================
// Task
// ============================================================================

/// One line item parsed from the checklist document.
///
/// Identity note: `id` is either the explicit dotted numeral from the line
/// ("3.2") or a generated ordinal fallback ("task-7"). Ids are only stable
/// within a single parse pass; callers must not persist them across
/// re-parses of an edited document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Dotted numeral identifier or ordinal fallback
    pub id: String,
    /// Free text after the identifier
    pub title: String,
    /// Leading-whitespace width, used only for hierarchy grouping
    pub level: usize,
    /// True iff the marker cell is an affirmative mark
    pub is_completed: bool,
    /// True when `level > 0` or the id is dotted
    pub is_subtask: bool,
    /// Nearest preceding top-level task id, for subtasks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Requirement tags scraped from a `_Requirements: a, b_` annotation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<String>,
    /// Free-text bullet lines following the task line
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl Task {
    /// Combined lowercase title and details text.
    ///
    /// This is the haystack the heuristic engine searches for keywords
    /// and file-name matches.
    #[must_use]
    pub fn search_text(&self) -> String {
        let mut text = self.title.to_lowercase();
        for detail in &self.details {
            text.push(' ');
            text.push_str(&detail.to_lowercase());
        }
        text
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Result of matching a single task line.
struct TaskLine<'a> {
    level: usize,
    completed: bool,
    rest: &'a str,
}

/// Match one line against the task-line shape.
///
/// Returns `None` for prose, headings, blank lines, and malformed marker
/// cells (anything other than `x`, `X`, or a space).
fn match_task_line(line: &str) -> Option<TaskLine<'_>> {
    let caps = TASK_LINE.captures(line)?;
    let marker = caps.get(2).map(|m| m.as_str())?;
    let completed = match marker {
        "x" | "X" => true,
        " " => false,
        _ => return None,
    };
    Some(TaskLine {
        level: caps.get(1).map_or(0, |m| m.as_str().chars().count()),
        completed,
        rest: caps.get(3).map_or("", |m| m.as_str()),
    })
}

/// Split the remainder of a task line into identifier and title.
///
/// Falls back to `task-<ordinal>` when no leading dotted numeral is
/// present.
fn split_identifier(rest: &str, ordinal: usize) -> (String, String) {
    if let Some(caps) = DOTTED_ID.captures(rest) {
        (caps[1].to_string(), caps[2].trim().to_string())
    } else {
        (format!("task-{ordinal}"), rest.trim().to_string())
    }
}

/// Extract requirement tags from an annotation line, if it is one.
fn match_requirements(line: &str) -> Option<Vec<String>> {
    let caps = REQUIREMENTS.captures(line)?;
    Some(
        caps[1]
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

/// Extract the text of a free-text bullet line, if it is one.
fn match_detail(line: &str) -> Option<String> {
    let caps = BULLET.captures(line)?;
    Some(caps[1].to_string())
}

/// Parse checklist text into an ordered list of tasks.
///
/// A document with zero task lines yields an empty list, not an error.
///
/// # Example
///
/// ```
/// use tally::checklist;
///
/// let tasks = checklist::parse("- [ ] 1 Build login form\n- [x] 2 Write unit tests\n");
/// assert_eq!(tasks.len(), 2);
/// assert!(!tasks[0].is_completed);
/// assert!(tasks[1].is_completed);
/// ```
#[must_use]
pub fn parse(text: &str) -> Vec<Task> {
    let lines: Vec<&str> = text.lines().collect();
    let mut tasks = Vec::new();
    let mut current_parent: Option<String> = None;
    let mut ordinal = 0;

    for (index, line) in lines.iter().enumerate() {
        let Some(matched) = match_task_line(line) else {
            continue;
        };
        ordinal += 1;

        let (id, title) = split_identifier(matched.rest, ordinal);
        let is_subtask = matched.level > 0 || id.contains('.');

        let parent_id = if is_subtask {
            current_parent.clone()
        } else {
            current_parent = Some(id.clone());
            None
        };

        // Scan forward to the next task line, collecting annotations.
        let mut requirements = Vec::new();
        let mut details = Vec::new();
        for follow in lines.iter().skip(index + 1) {
            if match_task_line(follow).is_some() {
                break;
            }
            if let Some(tags) = match_requirements(follow) {
                requirements.extend(tags);
            } else if let Some(text) = match_detail(follow) {
                details.push(text);
            }
        }

        tasks.push(Task {
            id,
            title,
            level: matched.level,
            is_completed: matched.completed,
            is_subtask,
            parent_id,
            requirements,
            details,
        });
    }

    tasks
}

// ============================================================================
// Marker Surgery
// ============================================================================

/// Outcome of flipping a task line's completion marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkOutcome {
    /// The marker was flipped; contains the updated document text.
    Updated(String),
    /// The matched line was already completed; document unchanged.
    AlreadyComplete,
    /// No task line matched the given identifier.
    NotFound,
}

/// Flip the completion marker of the task line matching `task_id`.
///
/// Matching is purely by the leading dotted numeral recovered from the
/// line; generated fallback ids (`task-<n>`) match the n-th task line.
/// All other document bytes are preserved exactly.
#[must_use]
pub fn mark_complete(text: &str, task_id: &str) -> MarkOutcome {
    let mut ordinal = 0;
    let mut offset = 0;

    for segment in text.split_inclusive('\n') {
        let line = segment.trim_end_matches(['\n', '\r']);
        if let Some(matched) = match_task_line(line) {
            ordinal += 1;

            let line_id = DOTTED_ID
                .captures(matched.rest)
                .map_or_else(|| format!("task-{ordinal}"), |caps| caps[1].to_string());
            if line_id == task_id {
                if matched.completed {
                    return MarkOutcome::AlreadyComplete;
                }

                // The first '[' in a matched line is the marker cell; the
                // char after it is the single-character marker we replace.
                if let Some(bracket) = segment.find('[') {
                    let mut updated = String::with_capacity(text.len());
                    updated.push_str(&text[..offset + bracket + 1]);
                    updated.push('x');
                    updated.push_str(&text[offset + bracket + 2..]);
                    return MarkOutcome::Updated(updated);
                }
            }
        }
        offset += segment.len();
    }

    MarkOutcome::NotFound
}

// ============================================================================
// Tests
// ============================================================================
