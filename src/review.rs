//! Human-review collaborator contract.
//!
//! Proposals in the review confidence band are surfaced to a
//! [`ReviewSurface`] and applied only on explicit confirmation. The
//! surface is asynchronous and may never resolve; the tracker spawns the
//! proposal and keeps processing events, so a stalled reviewer can never
//! block analysis.

use async_trait::async_trait;

use crate::checklist::Task;
use crate::error::Result;
use crate::heuristics::ProposalSource;

/// Outcome of a surfaced proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewVerdict {
    /// The human confirmed the completion; apply it.
    Accepted,
    /// The human dismissed the proposal; drop it.
    Dismissed,
}

/// Asks a human to confirm a low-confidence completion proposal.
#[async_trait]
pub trait ReviewSurface: Send + Sync {
    /// Surface one proposal with its source description.
    ///
    /// # Errors
    ///
    /// Returns an error when the surface is unavailable; the proposal is
    /// then treated as dismissed.
    async fn propose(
        &self,
        task: &Task,
        source: &ProposalSource,
        confidence: f64,
    ) -> Result<ReviewVerdict>;
}

/// Review surface for headless operation: logs the proposal and
/// dismisses it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingReview;

#[async_trait]
impl ReviewSurface for LoggingReview {
    async fn propose(
        &self,
        task: &Task,
        source: &ProposalSource,
        confidence: f64,
    ) -> Result<ReviewVerdict> {
        tracing::info!(
            task_id = %task.id,
            %source,
            confidence,
            "Completion proposal needs review; dismissing (no review surface attached)"
        );
        Ok(ReviewVerdict::Dismissed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist;

    #[tokio::test]
    async fn test_logging_review_dismisses() {
        let task = checklist::parse("- [ ] 1 Build login form\n").remove(0);
        let source = ProposalSource::File("src/login.ts".into());
        let verdict = LoggingReview.propose(&task, &source, 0.8).await.unwrap();
        assert_eq!(verdict, ReviewVerdict::Dismissed);
    }
}
