//! File-change scoring for completion inference.
//!
//! Scores a single file event against a candidate task by combining a
//! base weight for the change kind with content signals: test
//! declarations, exported definitions, and documentation comments.
//! A task is only a candidate for a file when its text mentions a
//! keyword of the file's category or the file's base name itself.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::checklist::Task;

/// Kind of file-system change observed by the watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Create,
    Modify,
}

/// Base confidence for a newly created file.
const CREATE_WEIGHT: f64 = 0.3;
/// Base confidence for a modified file.
const MODIFY_WEIGHT: f64 = 0.1;
/// Weight for test-declaration syntax in the file content.
const TEST_MARKER_WEIGHT: f64 = 0.4;
/// Weight for an exported function or class declaration.
const EXPORT_WEIGHT: f64 = 0.3;
/// Weight for documentation-comment markers.
const DOC_WEIGHT: f64 = 0.2;

static TEST_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)#\[(tokio::)?test\]|\b(describe|it|test)\s*\(|\bassert\w*!?\s*\(|\.expect\s*\(|\bexpect\s*\("#)
        .unwrap()
});

static EXPORT_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^\s*(export\s+(default\s+)?(async\s+)?(function|class|const|interface)|pub\s+(async\s+)?fn|pub\s+struct|pub\s+enum|pub\s+trait)\b",
    )
    .unwrap()
});

static DOC_MARKERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(///|//!|/\*\*)").unwrap());

// ============================================================================
// File Categories
// ============================================================================

/// Pattern category of a changed file, used for candidate gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Test,
    UiComponent,
    Api,
    Config,
    Documentation,
    Other,
}

impl FileCategory {
    /// Categorize a file path.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let path_str = path.to_string_lossy().to_lowercase();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        if file_name.contains(".test.")
            || file_name.contains(".spec.")
            || file_name.ends_with("_test.rs")
            || path_str.contains("tests/")
            || path_str.contains("__tests__/")
        {
            return Self::Test;
        }

        if matches!(extension.as_str(), "tsx" | "jsx" | "vue" | "svelte")
            || path_str.contains("components/")
        {
            return Self::UiComponent;
        }

        if path_str.contains("api/") || path_str.contains("routes/") {
            return Self::Api;
        }

        if matches!(extension.as_str(), "toml" | "yaml" | "yml" | "ini" | "env")
            || file_name.contains("config")
        {
            return Self::Config;
        }

        if matches!(extension.as_str(), "md" | "rst" | "txt") {
            return Self::Documentation;
        }

        Self::Other
    }

    /// Task-text keywords associated with this category.
    #[must_use]
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Test => &["test", "spec", "unit", "coverage"],
            Self::UiComponent => &["component", "ui", "view", "page"],
            Self::Api => &["api", "endpoint", "route", "service"],
            Self::Config => &["config", "settings", "environment"],
            Self::Documentation => &["doc", "documentation", "readme", "guide"],
            Self::Other => &[],
        }
    }
}

/// File base name with extension suffixes stripped ("login.test.ts" →
/// "login").
#[must_use]
pub fn base_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    name.split('.').next().unwrap_or("").to_string()
}

// ============================================================================
// Candidate Gating
// ============================================================================

/// Check whether a task is a candidate for a changed file.
///
/// A task qualifies when its title+details text contains a keyword of
/// the file's category, or the file's base name appears as a substring
/// of the task text.
#[must_use]
pub fn is_candidate(task: &Task, path: &Path) -> bool {
    let text = task.search_text();
    let category = FileCategory::from_path(path);

    if category
        .keywords()
        .iter()
        .any(|keyword| text.contains(keyword))
    {
        return true;
    }

    let base = base_name(path);
    base.len() > 2 && text.contains(&base)
}

// ============================================================================
// Scoring
// ============================================================================

/// Score a file-change event for one task.
///
/// The result is clamped to `[0, 1]`; candidate gating is the caller's
/// concern (see [`is_candidate`]).
#[must_use]
pub fn score_file_change(kind: ChangeKind, content: &str) -> f64 {
    let mut confidence = match kind {
        ChangeKind::Create => CREATE_WEIGHT,
        ChangeKind::Modify => MODIFY_WEIGHT,
    };

    if TEST_MARKERS.is_match(content) {
        confidence += TEST_MARKER_WEIGHT;
    }
    if EXPORT_MARKERS.is_match(content) {
        confidence += EXPORT_WEIGHT;
    }
    if DOC_MARKERS.is_match(content) {
        confidence += DOC_WEIGHT;
    }

    confidence.clamp(0.0, 1.0)
}

// ============================================================================
// Tests
// ============================================================================
