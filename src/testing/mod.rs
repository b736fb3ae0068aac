//! Testing infrastructure: mock collaborators.
//!
//! Every external collaborator of the tracker has a controllable mock
//! here, enabling deterministic unit and integration tests without a
//! real repository, filesystem, reviewer, or network.

mod mocks;

pub use mocks::{MockCommitLog, MockDocumentStore, MockReviewSurface, MockSyncEndpoint};

/// A small checklist document used across tests.
pub const SAMPLE_CHECKLIST: &str = "\
# Project Tasks

- [ ] 1 Build login form
  - Validate the email field
- [x] 2 Write unit tests
  _Requirements: 1.2_
- [ ] 3 Document the API
";
