//! Tracker configuration.
//!
//! Loaded from an optional `tally.toml` at the project root; every field
//! has a sensible default so a project with no config file tracks out of
//! the box.

use std::path::{Path, PathBuf};
use std::time::Duration;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TallyError};
use crate::heuristics::DEFAULT_FILE_COOLDOWN;

/// Config file name looked up at the project root.
pub const CONFIG_FILE: &str = "tally.toml";

/// Glob patterns for paths the watcher should never analyze.
fn default_ignore_globs() -> Vec<String> {
    [
        "**/.git/**",
        "**/target/**",
        "**/node_modules/**",
        "**/dist/**",
        "**/build/**",
        "**/.tally/**",
        "**/*.lock",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

fn default_checklist_path() -> PathBuf {
    PathBuf::from("TASKS.md")
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from(".tally/progress.json")
}

fn default_file_cooldown_secs() -> u64 {
    DEFAULT_FILE_COOLDOWN.as_secs()
}

fn default_commit_poll_secs() -> u64 {
    300
}

fn default_workspace_poll_secs() -> u64 {
    600
}

fn default_sync_heartbeat_secs() -> u64 {
    900
}

fn default_commit_window_days() -> u64 {
    7
}

fn default_commit_limit() -> usize {
    20
}

/// Configuration for one tracked project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Identifier sent with remote sync pushes
    pub project_id: String,
    /// Checklist document path, relative to the project root
    pub checklist_path: PathBuf,
    /// Progress snapshot path, relative to the project root
    pub snapshot_path: PathBuf,
    /// Per-path cooldown between file analyses, in seconds
    pub file_cooldown_secs: u64,
    /// Commit-log poll interval, in seconds
    pub commit_poll_secs: u64,
    /// Full workspace analysis interval, in seconds
    pub workspace_poll_secs: u64,
    /// Sync heartbeat interval, in seconds
    pub sync_heartbeat_secs: u64,
    /// Lookback window for commit polls, in days
    pub commit_window_days: u64,
    /// Cap on commits read per poll
    pub commit_limit: usize,
    /// Remote sync endpoint URL; sync is disabled when unset
    pub sync_url: Option<String>,
    /// Paths matching these globs are never analyzed
    pub ignore_globs: Vec<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            project_id: "default".to_string(),
            checklist_path: default_checklist_path(),
            snapshot_path: default_snapshot_path(),
            file_cooldown_secs: default_file_cooldown_secs(),
            commit_poll_secs: default_commit_poll_secs(),
            workspace_poll_secs: default_workspace_poll_secs(),
            sync_heartbeat_secs: default_sync_heartbeat_secs(),
            commit_window_days: default_commit_window_days(),
            commit_limit: default_commit_limit(),
            sync_url: None,
            ignore_globs: default_ignore_globs(),
        }
    }
}

impl TrackerConfig {
    /// Load configuration from `tally.toml` in the project directory.
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the file exists but cannot be
    /// parsed.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let path = project_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|e| TallyError::config_with_path(e.to_string(), path.clone()))?;
        toml::from_str(&text).map_err(|e| TallyError::config_with_path(e.to_string(), path))
    }

    // =========================================================================
    // Builder methods
    // =========================================================================

    /// Set the project identifier.
    #[must_use]
    pub fn with_project_id(mut self, id: impl Into<String>) -> Self {
        self.project_id = id.into();
        self
    }

    /// Set the checklist document path.
    #[must_use]
    pub fn with_checklist_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.checklist_path = path.into();
        self
    }

    /// Set the sync endpoint URL.
    #[must_use]
    pub fn with_sync_url(mut self, url: impl Into<String>) -> Self {
        self.sync_url = Some(url.into());
        self
    }

    /// Set the commit poll interval.
    #[must_use]
    pub fn with_commit_poll_secs(mut self, secs: u64) -> Self {
        self.commit_poll_secs = secs;
        self
    }

    /// Set the per-path file cooldown.
    #[must_use]
    pub fn with_file_cooldown_secs(mut self, secs: u64) -> Self {
        self.file_cooldown_secs = secs;
        self
    }

    // =========================================================================
    // Derived values
    // =========================================================================

    /// Per-path cooldown as a [`Duration`].
    #[must_use]
    pub fn file_cooldown(&self) -> Duration {
        Duration::from_secs(self.file_cooldown_secs)
    }

    /// Commit lookback window as a [`Duration`].
    #[must_use]
    pub fn commit_window(&self) -> Duration {
        Duration::from_secs(self.commit_window_days * 24 * 60 * 60)
    }

    /// Compile the ignore globs into a matcher.
    ///
    /// Invalid patterns are skipped with a warning rather than failing
    /// the whole session.
    #[must_use]
    pub fn ignore_set(&self) -> GlobSet {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.ignore_globs {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => tracing::warn!(pattern = %pattern, "Skipping invalid ignore glob: {e}"),
            }
        }
        builder.build().unwrap_or_else(|e| {
            tracing::warn!("Ignore globs unusable, matching nothing: {e}");
            GlobSet::empty()
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
