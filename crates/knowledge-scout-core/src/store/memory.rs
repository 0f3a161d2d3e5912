//! In-memory implementations of the capability traits.
//!
//! Used by the core test-suite and by application tests that want to
//! drive the merge engine without a network. The document store enforces
//! version tokens the same way the real remote does, and can be scripted
//! to simulate concurrent writers and transport failures.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{ScoutError, ScoutResult};
use crate::models::{ContentUpdate, Extraction, ExtractionInput, Finding, FindingStatus};

use super::{DocumentStore, Extractor, FindingStore, ReconciliationJob, RemoteDocument};

fn lock<T>(m: &Mutex<T>) -> ScoutResult<MutexGuard<'_, T>> {
    m.lock()
        .map_err(|_| ScoutError::Other(anyhow::anyhow!("in-memory store lock poisoned")))
}

// ============ Document store ============

/// One call to [`DocumentStore::commit`], accepted or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAttempt {
    pub content: String,
    pub version: String,
    pub message: String,
    pub accepted: bool,
}

struct DocState {
    content: Option<String>,
    revision: u64,
    external_edits: VecDeque<String>,
    fetch_failures: HashMap<usize, String>,
    commit_failures: VecDeque<String>,
    fetches: usize,
    attempts: Vec<CommitAttempt>,
}

impl DocState {
    fn version(&self) -> String {
        format!("rev-{}", self.revision)
    }
}

/// Versioned in-memory document.
pub struct InMemoryDocumentStore {
    state: Mutex<DocState>,
}

impl InMemoryDocumentStore {
    pub fn new(content: impl Into<String>) -> Self {
        Self::with_content(Some(content.into()))
    }

    /// A store whose document does not exist; every call fails `NotFound`.
    pub fn missing() -> Self {
        Self::with_content(None)
    }

    fn with_content(content: Option<String>) -> Self {
        Self {
            state: Mutex::new(DocState {
                content,
                revision: 1,
                external_edits: VecDeque::new(),
                fetch_failures: HashMap::new(),
                commit_failures: VecDeque::new(),
                fetches: 0,
                attempts: Vec::new(),
            }),
        }
    }

    /// Simulate another writer: right after the next fetch returns, the
    /// document is replaced by `content` and its version moves on.
    pub fn queue_external_edit(&self, content: impl Into<String>) -> ScoutResult<()> {
        lock(&self.state)?.external_edits.push_back(content.into());
        Ok(())
    }

    /// Make the next fetch fail with a transport error.
    pub fn fail_next_fetch(&self, message: impl Into<String>) -> ScoutResult<()> {
        let mut state = lock(&self.state)?;
        let n = state.fetches + 1;
        state.fetch_failures.insert(n, message.into());
        Ok(())
    }

    /// Make the `n`-th fetch (1-based, counted over the store's lifetime)
    /// fail with a transport error.
    pub fn fail_nth_fetch(&self, n: usize, message: impl Into<String>) -> ScoutResult<()> {
        lock(&self.state)?.fetch_failures.insert(n, message.into());
        Ok(())
    }

    /// Make the next commit fail with a transport error.
    pub fn fail_next_commit(&self, message: impl Into<String>) -> ScoutResult<()> {
        lock(&self.state)?.commit_failures.push_back(message.into());
        Ok(())
    }

    pub fn content(&self) -> ScoutResult<Option<String>> {
        Ok(lock(&self.state)?.content.clone())
    }

    pub fn version(&self) -> ScoutResult<String> {
        Ok(lock(&self.state)?.version())
    }

    pub fn fetch_count(&self) -> ScoutResult<usize> {
        Ok(lock(&self.state)?.fetches)
    }

    pub fn commit_attempts(&self) -> ScoutResult<Vec<CommitAttempt>> {
        Ok(lock(&self.state)?.attempts.clone())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn fetch(&self) -> ScoutResult<RemoteDocument> {
        let mut state = lock(&self.state)?;
        state.fetches += 1;

        let n = state.fetches;
        if let Some(msg) = state.fetch_failures.remove(&n) {
            return Err(ScoutError::Transport(msg));
        }

        let content = state
            .content
            .clone()
            .ok_or_else(|| ScoutError::NotFound("document".to_string()))?;
        let doc = RemoteDocument {
            content,
            version: state.version(),
        };

        if let Some(edit) = state.external_edits.pop_front() {
            state.content = Some(edit);
            state.revision += 1;
        }

        Ok(doc)
    }

    async fn commit(&self, content: &str, version: &str, message: &str) -> ScoutResult<String> {
        let mut state = lock(&self.state)?;
        let mut attempt = CommitAttempt {
            content: content.to_string(),
            version: version.to_string(),
            message: message.to_string(),
            accepted: false,
        };

        if let Some(msg) = state.commit_failures.pop_front() {
            state.attempts.push(attempt);
            return Err(ScoutError::Transport(msg));
        }

        if state.content.is_none() {
            state.attempts.push(attempt);
            return Err(ScoutError::NotFound("document".to_string()));
        }

        let current = state.version();
        if version != current {
            state.attempts.push(attempt);
            return Err(ScoutError::VersionConflict(format!(
                "{} does not match {}",
                version, current
            )));
        }

        state.content = Some(content.to_string());
        state.revision += 1;
        attempt.accepted = true;
        state.attempts.push(attempt);
        Ok(format!("memory://commit/{}", state.revision))
    }
}

// ============ Finding store ============

/// Findings kept in a `HashMap`.
pub struct InMemoryFindingStore {
    findings: Mutex<HashMap<String, Finding>>,
    reconciliations: Mutex<Vec<ReconciliationJob>>,
    fail_status_updates: AtomicBool,
    fail_reconciliation: AtomicBool,
    gets: AtomicUsize,
}

impl InMemoryFindingStore {
    pub fn new() -> Self {
        Self {
            findings: Mutex::new(HashMap::new()),
            reconciliations: Mutex::new(Vec::new()),
            fail_status_updates: AtomicBool::new(false),
            fail_reconciliation: AtomicBool::new(false),
            gets: AtomicUsize::new(0),
        }
    }

    /// Build a store pre-populated with `findings`.
    pub fn with_findings(findings: impl IntoIterator<Item = Finding>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.findings.lock() {
            for f in findings {
                map.insert(f.id.clone(), f);
            }
        }
        store
    }

    /// When set, every `save_status` call fails.
    pub fn set_fail_status_updates(&self, fail: bool) {
        self.fail_status_updates.store(fail, Ordering::SeqCst);
    }

    /// Number of `get` calls so far.
    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// When set, every `record_reconciliation` call fails.
    pub fn set_fail_reconciliation(&self, fail: bool) {
        self.fail_reconciliation.store(fail, Ordering::SeqCst);
    }
}

impl Default for InMemoryFindingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FindingStore for InMemoryFindingStore {
    async fn get(&self, id: &str) -> ScoutResult<Finding> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        lock(&self.findings)?
            .get(id)
            .cloned()
            .ok_or_else(|| ScoutError::NotFound(format!("finding {}", id)))
    }

    async fn insert(&self, finding: &Finding) -> ScoutResult<()> {
        lock(&self.findings)?.insert(finding.id.clone(), finding.clone());
        Ok(())
    }

    async fn insert_batch(&self, findings: &[Finding]) -> ScoutResult<()> {
        let mut map = lock(&self.findings)?;
        let mut seen = HashSet::new();
        for f in findings {
            if map.contains_key(&f.id) || !seen.insert(f.id.as_str()) {
                return Err(ScoutError::Other(anyhow::anyhow!(
                    "finding {} already exists",
                    f.id
                )));
            }
        }
        for f in findings {
            map.insert(f.id.clone(), f.clone());
        }
        Ok(())
    }

    async fn save_status(
        &self,
        id: &str,
        expected: FindingStatus,
        status: FindingStatus,
        rejection_reason: Option<&str>,
        merged_at: Option<DateTime<Utc>>,
    ) -> ScoutResult<()> {
        if self.fail_status_updates.load(Ordering::SeqCst) {
            return Err(ScoutError::Transport("status update refused".to_string()));
        }
        let mut findings = lock(&self.findings)?;
        let finding = findings
            .get_mut(id)
            .ok_or_else(|| ScoutError::NotFound(format!("finding {}", id)))?;
        if finding.status != expected {
            return Err(ScoutError::InvalidTransition {
                from: finding.status,
                to: status,
            });
        }
        finding.status = status;
        if let Some(reason) = rejection_reason {
            finding.rejection_reason = Some(reason.to_string());
        }
        if merged_at.is_some() {
            finding.merged_at = merged_at;
        }
        Ok(())
    }

    async fn save_content(&self, id: &str, update: &ContentUpdate) -> ScoutResult<()> {
        let mut findings = lock(&self.findings)?;
        let finding = findings
            .get_mut(id)
            .ok_or_else(|| ScoutError::NotFound(format!("finding {}", id)))?;
        finding.apply_update(update);
        Ok(())
    }

    async fn record_reconciliation(&self, job: &ReconciliationJob) -> ScoutResult<()> {
        if self.fail_reconciliation.load(Ordering::SeqCst) {
            return Err(ScoutError::Transport(
                "reconciliation log unavailable".to_string(),
            ));
        }
        let mut jobs = lock(&self.reconciliations)?;
        jobs.retain(|j| j.finding_id != job.finding_id);
        jobs.push(job.clone());
        Ok(())
    }

    async fn open_reconciliations(&self) -> ScoutResult<Vec<ReconciliationJob>> {
        Ok(lock(&self.reconciliations)?.clone())
    }

    async fn resolve_reconciliation(&self, finding_id: &str) -> ScoutResult<()> {
        lock(&self.reconciliations)?.retain(|j| j.finding_id != finding_id);
        Ok(())
    }
}

// ============ Extractor ============

/// Extractor that always answers with the same reply.
pub struct StaticExtractor {
    reply: Result<Extraction, String>,
    calls: AtomicUsize,
    last_input: Mutex<Option<ExtractionInput>>,
}

impl StaticExtractor {
    pub fn returning(extraction: Extraction) -> Self {
        Self::with_reply(Ok(extraction))
    }

    /// Every call fails with `ParseFailure(message)`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_reply(Err(message.into()))
    }

    fn with_reply(reply: Result<Extraction, String>) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_input: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_input(&self) -> Option<ExtractionInput> {
        self.last_input.lock().ok().and_then(|g| g.clone())
    }
}

#[async_trait]
impl Extractor for StaticExtractor {
    fn name(&self) -> &str {
        "static"
    }

    async fn extract(&self, input: &ExtractionInput) -> ScoutResult<Extraction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last_input)? = Some(input.clone());
        self.reply.clone().map_err(ScoutError::ParseFailure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let store = InMemoryDocumentStore::new("a");
        let doc = store.fetch().await.unwrap();
        store.commit("b", &doc.version, "m").await.unwrap();

        let err = store.commit("c", &doc.version, "m").await.unwrap_err();
        assert!(err.is_version_conflict());
        assert_eq!(store.content().unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_external_edit_applies_after_fetch() {
        let store = InMemoryDocumentStore::new("a");
        store.queue_external_edit("edited").unwrap();
        let doc = store.fetch().await.unwrap();
        assert_eq!(doc.content, "a");
        assert_eq!(store.content().unwrap().as_deref(), Some("edited"));
        assert_ne!(store.version().unwrap(), doc.version);
    }

    #[tokio::test]
    async fn test_missing_document() {
        let store = InMemoryDocumentStore::missing();
        assert!(matches!(
            store.fetch().await.unwrap_err(),
            ScoutError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_finding_store_status_and_content() {
        let f = Finding::new("t", "s", "other");
        let id = f.id.clone();
        let store = InMemoryFindingStore::with_findings([f]);

        store
            .save_status(
                &id,
                FindingStatus::PendingReview,
                FindingStatus::Rejected,
                Some("dupe"),
                None,
            )
            .await
            .unwrap();
        store
            .save_content(
                &id,
                &ContentUpdate {
                    summary: Some("s2".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let got = store.get(&id).await.unwrap();
        assert_eq!(got.status, FindingStatus::Rejected);
        assert_eq!(got.rejection_reason.as_deref(), Some("dupe"));
        assert_eq!(got.summary, "s2");
        assert!(matches!(
            store.get("nope").await.unwrap_err(),
            ScoutError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_insert_batch_is_all_or_nothing() {
        let existing = Finding::new("old", "s", "other");
        let store = InMemoryFindingStore::with_findings([existing.clone()]);

        let fresh = Finding::new("new", "s", "other");
        let err = store
            .insert_batch(&[fresh.clone(), existing.clone()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert!(store.get(&fresh.id).await.is_err());

        store.insert_batch(&[fresh.clone()]).await.unwrap();
        assert_eq!(store.get(&fresh.id).await.unwrap().title, "new");
    }
}
