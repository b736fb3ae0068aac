//! Custom error types for Tally.
//!
//! This module provides structured error types that enable better
//! error handling, reporting, and recovery throughout the tracker.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Tally operations
#[derive(Error, Debug)]
pub enum TallyError {
    // =========================================================================
    // Document Store Errors
    // =========================================================================
    /// Document not found in the store
    #[error("Document not found: {path}")]
    DocumentNotFound { path: PathBuf },

    /// Document store read/write failed
    #[error("Store error for {path}: {message}")]
    Store { path: PathBuf, message: String },

    // =========================================================================
    // Snapshot Errors
    // =========================================================================
    /// Progress snapshot could not be serialized or deserialized
    #[error("Snapshot error: {message}")]
    Snapshot { message: String },

    // =========================================================================
    // Collaborator Errors
    // =========================================================================
    /// Git operation failed
    #[error("Git operation failed: {operation} - {message}")]
    Git { operation: String, message: String },

    /// Remote sync transport failed
    #[error("Sync error: {message}")]
    Sync { message: String },

    /// Review surface failed to resolve a proposal
    #[error("Review error: {message}")]
    Review { message: String },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Failed to load configuration
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TallyError {
    // =========================================================================
    // Constructor helpers
    // =========================================================================

    /// Create a store error
    pub fn store(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Store {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::DocumentNotFound { path: path.into() }
    }

    /// Create a snapshot error
    pub fn snapshot(message: impl Into<String>) -> Self {
        Self::Snapshot {
            message: message.into(),
        }
    }

    /// Create a git error
    pub fn git(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Git {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a sync error
    pub fn sync(message: impl Into<String>) -> Self {
        Self::Sync {
            message: message.into(),
        }
    }

    /// Create a review error
    pub fn review(message: impl Into<String>) -> Self {
        Self::Review {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: None,
        }
    }

    /// Create a configuration error with path
    pub fn config_with_path(message: impl Into<String>, path: PathBuf) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path),
        }
    }

    // =========================================================================
    // Classification helpers
    // =========================================================================

    /// Check if this error means a collaborator is unavailable.
    ///
    /// Unavailable collaborators skip the dependent analysis step for the
    /// current cycle rather than surfacing a user-facing error.
    pub fn is_collaborator_unavailable(&self) -> bool {
        matches!(
            self,
            Self::DocumentNotFound { .. } | Self::Store { .. } | Self::Git { .. }
        )
    }

    /// Check if this error is a transport failure.
    ///
    /// Transport failures are logged and swallowed; they never affect
    /// local state.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Sync { .. })
    }
}

/// Type alias for Tally results
pub type Result<T> = std::result::Result<T, TallyError>;
