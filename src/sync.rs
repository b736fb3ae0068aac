//! Best-effort snapshot sync to a remote endpoint.
//!
//! The dispatcher pushes the current progress snapshot after every
//! successful reconciliation and on a heartbeat interval. Transport
//! failures are explicit `Result`s internally and are deliberately
//! discarded at this boundary: a push never raises to the caller and
//! never affects local state. The remote is an eventually-consistent
//! mirror, not a source of truth.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, TallyError};
use crate::progress::{ActivityItem, CompletedBy, ProgressData};

/// Bound on a single push so a slow remote cannot stall the event loop.
pub const SYNC_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Payload
// ============================================================================

/// Wire payload for one snapshot push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPayload {
    pub project_id: String,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub percentage: u8,
    pub last_updated: DateTime<Utc>,
    pub recent_activity: Vec<ActivityItem>,
    /// What triggered the push
    pub source: CompletedBy,
    pub timestamp: DateTime<Utc>,
}

impl SnapshotPayload {
    /// Build a payload from a snapshot.
    #[must_use]
    pub fn from_snapshot(
        project_id: &str,
        snapshot: &ProgressData,
        source: CompletedBy,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            project_id: project_id.to_string(),
            total_tasks: snapshot.total_tasks,
            completed_tasks: snapshot.completed_tasks,
            percentage: snapshot.percentage,
            last_updated: snapshot.last_updated,
            recent_activity: snapshot.recent_activity.clone(),
            source,
            timestamp: now,
        }
    }
}

// ============================================================================
// Endpoint Contract
// ============================================================================

/// Receives snapshot pushes.
#[async_trait]
pub trait SyncEndpoint: Send + Sync {
    /// Push one snapshot payload.
    ///
    /// # Errors
    ///
    /// Returns a sync error on any transport failure.
    async fn push_snapshot(&self, payload: &SnapshotPayload) -> Result<()>;
}

/// HTTP endpoint posting the JSON payload to a fixed URL.
#[derive(Debug, Clone)]
pub struct HttpSyncEndpoint {
    client: reqwest::Client,
    url: String,
}

impl HttpSyncEndpoint {
    /// Create an endpoint for the given URL.
    ///
    /// # Errors
    ///
    /// Returns a sync error when the HTTP client cannot be built.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(SYNC_TIMEOUT)
            .build()
            .map_err(|e| TallyError::sync(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl SyncEndpoint for HttpSyncEndpoint {
    async fn push_snapshot(&self, payload: &SnapshotPayload) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| TallyError::sync(e.to_string()))?;
        response
            .error_for_status()
            .map_err(|e| TallyError::sync(e.to_string()))?;
        Ok(())
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Fire-and-forget snapshot pusher.
pub struct SyncDispatcher {
    endpoint: Option<Arc<dyn SyncEndpoint>>,
    project_id: String,
}

impl SyncDispatcher {
    /// Create a dispatcher for a project.
    pub fn new(project_id: impl Into<String>, endpoint: Option<Arc<dyn SyncEndpoint>>) -> Self {
        Self {
            endpoint,
            project_id: project_id.into(),
        }
    }

    /// Dispatcher that never pushes anywhere.
    #[must_use]
    pub fn disabled(project_id: impl Into<String>) -> Self {
        Self::new(project_id, None)
    }

    /// Push the snapshot, swallowing any transport failure.
    ///
    /// Never raises: a failed push is logged and the tracker keeps
    /// going.
    pub async fn push(&self, snapshot: &ProgressData, source: CompletedBy) {
        let Some(endpoint) = &self.endpoint else {
            return;
        };
        let payload = SnapshotPayload::from_snapshot(&self.project_id, snapshot, source, Utc::now());
        match endpoint.push_snapshot(&payload).await {
            Ok(()) => debug!(project_id = %self.project_id, "Snapshot pushed"),
            Err(e) => warn!(project_id = %self.project_id, "Snapshot push failed: {e}"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
