//! Document store collaborator.
//!
//! The checklist document and the progress snapshot both live behind the
//! [`DocumentStore`] trait so the reconciler can be tested against an
//! in-memory store. [`FsDocumentStore`] is the filesystem
//! implementation; [`SnapshotStore`] layers typed snapshot load/save on
//! top of any store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Result, TallyError};
use crate::progress::ProgressData;

// ============================================================================
// Store Contract
// ============================================================================

/// Abstraction for reading and writing whole text documents by path.
pub trait DocumentStore: Send + Sync {
    /// Read a document's full text.
    ///
    /// # Errors
    ///
    /// Returns [`TallyError::DocumentNotFound`] when the document does
    /// not exist, or [`TallyError::Store`] for other read failures.
    fn read_text(&self, path: &Path) -> Result<String>;

    /// Write a document's full text, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns [`TallyError::Store`] when the write fails.
    fn write_text(&self, path: &Path, content: &str) -> Result<()>;
}

// ============================================================================
// Filesystem Implementation
// ============================================================================

/// Filesystem-backed document store rooted at a project directory.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    /// Create a store rooted at the given directory.
    #[must_use]
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl DocumentStore for FsDocumentStore {
    fn read_text(&self, path: &Path) -> Result<String> {
        let resolved = self.resolve(path);
        match std::fs::read_to_string(&resolved) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(TallyError::not_found(resolved))
            }
            Err(e) => Err(TallyError::store(resolved, e.to_string())),
        }
    }

    fn write_text(&self, path: &Path, content: &str) -> Result<()> {
        let resolved = self.resolve(path);
        if let Some(parent) = resolved.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| TallyError::store(parent.to_path_buf(), e.to_string()))?;
            }
        }
        std::fs::write(&resolved, content).map_err(|e| TallyError::store(resolved, e.to_string()))
    }
}

// ============================================================================
// Snapshot Store
// ============================================================================

/// Typed load/save for the progress snapshot document.
///
/// The snapshot is always read and written as a whole JSON document; no
/// partial-field updates reach the store.
#[derive(Clone)]
pub struct SnapshotStore {
    store: Arc<dyn DocumentStore>,
    path: PathBuf,
}

impl SnapshotStore {
    /// Create a snapshot store for the given document path.
    pub fn new(store: Arc<dyn DocumentStore>, path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            path: path.into(),
        }
    }

    /// Load the persisted snapshot, or `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns a snapshot error when the document exists but cannot be
    /// deserialized.
    pub fn load(&self) -> Result<Option<ProgressData>> {
        let text = match self.store.read_text(&self.path) {
            Ok(text) => text,
            Err(TallyError::DocumentNotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let snapshot = serde_json::from_str(&text)
            .map_err(|e| TallyError::snapshot(format!("{}: {e}", self.path.display())))?;
        Ok(Some(snapshot))
    }

    /// Load the persisted snapshot, falling back to an empty one when
    /// the document is missing or corrupted.
    #[must_use]
    pub fn load_or_default(&self, now: chrono::DateTime<chrono::Utc>) -> ProgressData {
        match self.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => ProgressData::empty(now),
            Err(e) => {
                tracing::warn!("Discarding unreadable snapshot: {e}");
                ProgressData::empty(now)
            }
        }
    }

    /// Persist a snapshot as a whole document.
    ///
    /// # Errors
    ///
    /// Returns a store error when the write fails; the caller discards
    /// its in-memory result for the cycle in that case.
    pub fn save(&self, snapshot: &ProgressData) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| TallyError::snapshot(e.to_string()))?;
        self.store.write_text(&self.path, &json)
    }
}

// ============================================================================
// Tests
// ============================================================================
