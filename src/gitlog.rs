//! Commit-log reader collaborator.
//!
//! The tracker consumes commit history through the [`CommitLogReader`]
//! trait so the heuristic engine can be tested without a real repository.
//! [`GitLogReader`] is the production implementation, shelling out to the
//! `git` binary the same way the change-detection tooling does.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TallyError};

/// Default lookback window for recent-commit reads.
pub const DEFAULT_COMMIT_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Default cap on the number of commits read per poll.
pub const DEFAULT_COMMIT_LIMIT: usize = 20;

/// Field separator used in the `git log` pretty format. The unit
/// separator never appears in commit subjects.
const FIELD_SEP: char = '\x1f';

// ============================================================================
// Commit Types
// ============================================================================

/// One commit with its changed-file list, supplied by the log reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitCommit {
    pub hash: String,
    pub message: String,
    pub date: DateTime<Utc>,
    /// Repository-relative paths touched by the commit
    pub files: Vec<PathBuf>,
}

/// A commit without its file list, as returned by `commits_touching`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    pub hash: String,
    pub message: String,
    pub date: DateTime<Utc>,
}

// ============================================================================
// Reader Contract
// ============================================================================

/// Abstraction over commit-history reads.
pub trait CommitLogReader: Send + Sync {
    /// Recent commits with changed-file lists, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository has no readable history.
    fn recent_commits(&self, since: Duration, limit: usize) -> Result<Vec<GitCommit>>;

    /// Commits touching a specific file, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository has no readable history.
    fn commits_touching(&self, path: &Path, limit: usize) -> Result<Vec<CommitSummary>>;

    /// Files with uncommitted changes in the working tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository status cannot be read.
    fn working_tree_changes(&self) -> Result<Vec<PathBuf>>;
}

// ============================================================================
// Git Subprocess Implementation
// ============================================================================

/// Reads commit history from a git repository via the `git` binary.
#[derive(Debug, Clone)]
pub struct GitLogReader {
    repo_path: PathBuf,
}

impl GitLogReader {
    /// Create a reader for the given repository path.
    #[must_use]
    pub fn new<P: AsRef<Path>>(repo_path: P) -> Self {
        Self {
            repo_path: repo_path.as_ref().to_path_buf(),
        }
    }

    fn run_git(&self, operation: &str, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .output()
            .map_err(|e| TallyError::git(operation, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TallyError::git(operation, stderr.to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Parse a `%H<US>%s<US>%cI` header line.
fn parse_header(line: &str) -> Option<(String, String, DateTime<Utc>)> {
    let mut parts = line.split(FIELD_SEP);
    let hash = parts.next()?.trim().to_string();
    let message = parts.next()?.to_string();
    let date = parts
        .next()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
        .map_or(DateTime::<Utc>::UNIX_EPOCH, |d| d.with_timezone(&Utc));
    if hash.is_empty() {
        return None;
    }
    Some((hash, message, date))
}

/// Parse `git log --name-only` output into commits with file lists.
fn parse_log_with_files(output: &str) -> Vec<GitCommit> {
    let mut commits = Vec::new();

    for line in output.lines() {
        if line.contains(FIELD_SEP) {
            if let Some((hash, message, date)) = parse_header(line) {
                commits.push(GitCommit {
                    hash,
                    message,
                    date,
                    files: Vec::new(),
                });
            }
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(commit) = commits.last_mut() {
            commit.files.push(PathBuf::from(trimmed));
        }
    }

    commits
}

impl CommitLogReader for GitLogReader {
    fn recent_commits(&self, since: Duration, limit: usize) -> Result<Vec<GitCommit>> {
        let since_arg = format!("--since={} seconds ago", since.as_secs());
        let limit_arg = format!("-n{limit}");
        let output = self.run_git(
            "log",
            &[
                "log",
                &limit_arg,
                &since_arg,
                "--pretty=format:%H\x1f%s\x1f%cI",
                "--name-only",
            ],
        )?;
        Ok(parse_log_with_files(&output))
    }

    fn commits_touching(&self, path: &Path, limit: usize) -> Result<Vec<CommitSummary>> {
        let limit_arg = format!("-n{limit}");
        let path_arg = path.to_string_lossy();
        let output = self.run_git(
            "log",
            &[
                "log",
                &limit_arg,
                "--pretty=format:%H\x1f%s\x1f%cI",
                "--",
                path_arg.as_ref(),
            ],
        )?;
        Ok(output
            .lines()
            .filter_map(parse_header)
            .map(|(hash, message, date)| CommitSummary {
                hash,
                message,
                date,
            })
            .collect())
    }

    fn working_tree_changes(&self) -> Result<Vec<PathBuf>> {
        let output = self.run_git("status", &["status", "--porcelain"])?;

        let mut files = Vec::new();
        for line in output.lines() {
            if line.len() <= 3 {
                continue;
            }
            // Porcelain format: XY <path> or XY <old> -> <new> for renames.
            let path_part = &line[3..];
            let path = path_part
                .split(" -> ")
                .last()
                .unwrap_or(path_part)
                .trim();
            if !path.is_empty() {
                files.push(PathBuf::from(path));
            }
        }
        Ok(files)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    fn git_fixture() -> TempDir {
        let temp = TempDir::new().unwrap();
        let run = |args: &[&str]| {
            let status = Command::new("git")
                .args(args)
                .current_dir(temp.path())
                .output()
                .expect("git available")
                .status;
            assert!(status.success(), "git {args:?} failed");
        };
        run(&["init", "-q"]);
        run(&["config", "user.email", "tally@example.com"]);
        run(&["config", "user.name", "Tally"]);
        std::fs::write(temp.path().join("README.md"), "# Fixture\n").unwrap();
        run(&["add", "."]);
        run(&["commit", "-q", "-m", "initial commit"]);
        temp
    }

    fn commit_file(dir: &TempDir, name: &str, content: &str, message: &str) {
        std::fs::write(dir.path().join(name), content).unwrap();
        for args in [
            vec!["add", "."],
            vec!["commit", "-q", "-m", message],
        ] {
            let status = Command::new("git")
                .args(&args)
                .current_dir(dir.path())
                .output()
                .unwrap()
                .status;
            assert!(status.success());
        }
    }

    #[test]
    fn test_parse_header_valid() {
        let line = "abc123\x1ffixes #3.2 auth bug\x1f2025-06-01T12:00:00+00:00";
        let (hash, message, date) = parse_header(line).unwrap();
        assert_eq!(hash, "abc123");
        assert_eq!(message, "fixes #3.2 auth bug");
        assert_eq!(date.to_rfc3339(), "2025-06-01T12:00:00+00:00");
    }

    #[test]
    fn test_parse_header_bad_date_falls_back_to_epoch() {
        let line = "abc123\x1fmessage\x1fnot-a-date";
        let (_, _, date) = parse_header(line).unwrap();
        assert_eq!(date, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_parse_log_with_files() {
        let output = "aaa\x1ffirst\x1f2025-06-01T12:00:00+00:00\nsrc/auth.rs\nsrc/lib.rs\n\nbbb\x1fsecond\x1f2025-06-02T12:00:00+00:00\nREADME.md\n";
        let commits = parse_log_with_files(output);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].hash, "aaa");
        assert_eq!(
            commits[0].files,
            vec![PathBuf::from("src/auth.rs"), PathBuf::from("src/lib.rs")]
        );
        assert_eq!(commits[1].files, vec![PathBuf::from("README.md")]);
    }

    #[test]
    fn test_parse_log_empty() {
        assert!(parse_log_with_files("").is_empty());
    }

    #[test]
    fn test_recent_commits_reads_history() {
        let fixture = git_fixture();
        commit_file(&fixture, "login.rs", "fn login() {}", "implement login form");

        let reader = GitLogReader::new(fixture.path());
        let commits = reader
            .recent_commits(DEFAULT_COMMIT_WINDOW, DEFAULT_COMMIT_LIMIT)
            .unwrap();

        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].message, "implement login form");
        assert_eq!(commits[0].files, vec![PathBuf::from("login.rs")]);
    }

    #[test]
    fn test_commits_touching_filters_by_path() {
        let fixture = git_fixture();
        commit_file(&fixture, "auth.rs", "fn auth() {}", "add auth module");
        commit_file(&fixture, "other.rs", "fn other() {}", "add other module");

        let reader = GitLogReader::new(fixture.path());
        let touching = reader
            .commits_touching(Path::new("auth.rs"), 10)
            .unwrap();

        assert_eq!(touching.len(), 1);
        assert_eq!(touching[0].message, "add auth module");
    }

    #[test]
    fn test_working_tree_changes() {
        let fixture = git_fixture();
        std::fs::write(fixture.path().join("dirty.rs"), "fn dirty() {}").unwrap();

        let reader = GitLogReader::new(fixture.path());
        let changes = reader.working_tree_changes().unwrap();

        assert!(changes.contains(&PathBuf::from("dirty.rs")));
    }

    #[test]
    fn test_not_a_repository_errors() {
        let temp = TempDir::new().unwrap();
        let reader = GitLogReader::new(temp.path());
        let result = reader.recent_commits(DEFAULT_COMMIT_WINDOW, 5);
        assert!(result.is_err());
        assert!(result.unwrap_err().is_collaborator_unavailable());
    }
}
