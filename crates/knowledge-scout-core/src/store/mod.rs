//! Capability traits for the remote collaborators.
//!
//! The merge engine and review workflow never talk to GitHub, SQLite, or
//! an LLM directly. They go through these traits, which lets the
//! application plug in real adapters and lets tests use the in-memory
//! implementations in [`memory`].
//!
//! | Trait | Real adapter | Purpose |
//! |-------|--------------|---------|
//! | [`DocumentStore`] | GitHub contents API | Fetch/commit the canonical document |
//! | [`FindingStore`] | SQLite | Load findings, persist status and content |
//! | [`Extractor`] | Anthropic messages API | Pull structured fields from raw text |
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ScoutResult;
use crate::models::{ContentUpdate, Extraction, ExtractionInput, Finding, FindingStatus};

/// The canonical document as fetched from the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDocument {
    pub content: String,
    /// Opaque revision identifier for optimistic concurrency.
    pub version: String,
}

/// Remote home of the canonical markdown document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch the current text and version token.
    ///
    /// Fails with `NotFound` or `Transport`.
    async fn fetch(&self) -> ScoutResult<RemoteDocument>;

    /// Replace the document, provided it is still at `version`.
    ///
    /// Returns a commit reference (for GitHub, the commit URL). Fails with
    /// `VersionConflict` when `version` is stale, otherwise `Transport`.
    async fn commit(&self, content: &str, version: &str, message: &str) -> ScoutResult<String>;
}

/// A committed merge whose finding could not be marked `merged`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationJob {
    pub finding_id: String,
    pub commit_reference: String,
    pub section: String,
    pub merged_at: DateTime<Utc>,
    /// Why the status update failed.
    pub error: String,
}

/// Record store holding findings.
#[async_trait]
pub trait FindingStore: Send + Sync {
    /// Load a finding by id. Fails with `NotFound` when absent.
    async fn get(&self, id: &str) -> ScoutResult<Finding>;

    /// Insert a new finding.
    async fn insert(&self, finding: &Finding) -> ScoutResult<()>;

    /// Insert every finding or none of them.
    async fn insert_batch(&self, findings: &[Finding]) -> ScoutResult<()>;

    /// Move the finding from `expected` to `status`.
    ///
    /// The write only happens while the stored status is still `expected`.
    /// Fails with `InvalidTransition` (carrying the current status) when
    /// another writer got there first, or `NotFound` when the id is unknown.
    async fn save_status(
        &self,
        id: &str,
        expected: FindingStatus,
        status: FindingStatus,
        rejection_reason: Option<&str>,
        merged_at: Option<DateTime<Utc>>,
    ) -> ScoutResult<()>;

    /// Persist content edits. Status is untouched.
    async fn save_content(&self, id: &str, update: &ContentUpdate) -> ScoutResult<()>;

    /// Remember a committed-but-unmarked merge for later repair.
    async fn record_reconciliation(&self, job: &ReconciliationJob) -> ScoutResult<()>;

    /// Open reconciliation jobs, oldest first.
    async fn open_reconciliations(&self) -> ScoutResult<Vec<ReconciliationJob>>;

    /// Drop the job for `finding_id` once it is repaired.
    async fn resolve_reconciliation(&self, finding_id: &str) -> ScoutResult<()>;
}

/// Service that turns unstructured source text into finding fields.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Short name for logs (e.g. `"anthropic"`).
    fn name(&self) -> &str;

    /// Fails with `ParseFailure` when the reply has no usable structure,
    /// or `Transport` when the service cannot be reached.
    async fn extract(&self, input: &ExtractionInput) -> ScoutResult<Extraction>;
}
