//! Merge engine: splice an approved finding into the canonical document.
//!
//! # Flow
//!
//! ```text
//! finding id ─▶ FindingStore::get ─▶ status == approved?
//!                                        │
//!        ┌───────────────────────────────┘
//!        ▼
//!   format_finding ─▶ route ─▶ DocumentStore::fetch ─▶ insert_into_section
//!                                    ▲                        │
//!                                    │ VersionConflict        ▼
//!                                    └──(once)──── DocumentStore::commit
//!                                                             │
//!                                                             ▼
//!                                           mark_merged (or reconciliation job)
//! ```
//!
//! The document commit and the finding status live in two independent
//! stores. [`merge_finding`] commits first and only then advances the
//! finding; when the second step fails, the merge is still reported as
//! successful and the gap is surfaced as a [`ReconciliationJob`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{ScoutError, ScoutResult};
use crate::format::format_finding;
use crate::models::{Finding, FindingStatus};
use crate::review::mark_merged;
use crate::routing::route;
use crate::splice::{insert_into_section, Placement};
use crate::store::{DocumentStore, FindingStore, ReconciliationJob};

/// Total commit attempts per merge: the first plus one conflict retry.
pub const MAX_COMMIT_ATTEMPTS: u32 = 2;

/// Result of a successful document commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    pub commit_reference: String,
    /// Heading of the section that received the fragment.
    pub section: String,
    pub placement: Placement,
    /// Number of commit attempts made (1 or 2).
    pub attempts: u32,
}

/// Outcome of [`merge_finding`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub finding_id: String,
    #[serde(flatten)]
    pub outcome: MergeOutcome,
    pub merged_at: DateTime<Utc>,
    /// Set when the document was committed but the finding could not be
    /// marked merged.
    pub reconciliation: Option<ReconciliationJob>,
}

/// Read-only view of what a merge would do.
#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    /// Routed heading. The live document may still send the fragment to
    /// the fallback section if this heading has been removed.
    pub section: String,
    pub formatted_content: String,
    pub is_enriched: bool,
    pub finding: Finding,
}

/// Commit message for a merged finding.
pub fn commit_message(finding: &Finding) -> String {
    format!("Add finding: {}\n\nAdded via Knowledge Scout", finding.title)
}

/// Splice `finding` into the remote document and commit it.
///
/// Fails with `PreconditionFailed` (without touching the document store)
/// unless the finding is approved. A `VersionConflict` on the first
/// commit triggers one re-fetch, re-splice, and re-commit; any failure
/// after that is returned as-is.
pub async fn merge(documents: &dyn DocumentStore, finding: &Finding) -> ScoutResult<MergeOutcome> {
    if finding.status != FindingStatus::Approved {
        return Err(ScoutError::PreconditionFailed(format!(
            "finding must be approved before merging (status: {})",
            finding.status
        )));
    }

    let fragment = format_finding(finding);
    let target = route(&finding.category);
    let message = commit_message(finding);

    let mut attempt = 1;
    loop {
        let doc = documents.fetch().await?;
        let splice = insert_into_section(&doc.content, target, &fragment);

        match documents.commit(&splice.content, &doc.version, &message).await {
            Ok(commit_reference) => {
                info!(
                    finding_id = %finding.id,
                    section = %splice.section,
                    attempt,
                    "finding committed to document"
                );
                return Ok(MergeOutcome {
                    commit_reference,
                    section: splice.section,
                    placement: splice.placement,
                    attempts: attempt,
                });
            }
            Err(e) if e.is_version_conflict() && attempt < MAX_COMMIT_ATTEMPTS => {
                warn!(
                    finding_id = %finding.id,
                    error = %e,
                    "document changed since fetch; retrying against latest version"
                );
                attempt += 1;
            }
            Err(e) => {
                if attempt > 1 {
                    warn!(finding_id = %finding.id, error = %e, "commit failed after retry");
                }
                return Err(e);
            }
        }
    }
}

/// Full merge of the finding stored under `id`: load, check, commit, then
/// mark it merged.
pub async fn merge_finding(
    findings: &dyn FindingStore,
    documents: &dyn DocumentStore,
    id: &str,
) -> ScoutResult<MergeReport> {
    let finding = findings.get(id).await?;
    let outcome = merge(documents, &finding).await?;
    let merged_at = Utc::now();

    let reconciliation = match mark_merged(findings, &finding, merged_at).await {
        Ok(()) => None,
        Err(e) => {
            error!(
                finding_id = id,
                commit = %outcome.commit_reference,
                error = %e,
                "document committed but finding status update failed; needs reconciliation"
            );
            let job = ReconciliationJob {
                finding_id: id.to_string(),
                commit_reference: outcome.commit_reference.clone(),
                section: outcome.section.clone(),
                merged_at,
                error: e.to_string(),
            };
            if let Err(e) = findings.record_reconciliation(&job).await {
                error!(finding_id = id, error = %e, "could not record reconciliation job");
            }
            Some(job)
        }
    };

    Ok(MergeReport {
        finding_id: id.to_string(),
        outcome,
        merged_at,
        reconciliation,
    })
}

/// Render what a merge of `finding` would produce, without committing.
pub fn preview(finding: &Finding) -> Preview {
    Preview {
        section: route(&finding.category).to_string(),
        formatted_content: format_finding(finding),
        is_enriched: finding.is_enriched(),
        finding: finding.clone(),
    }
}

/// Load the finding under `id` and [`preview`] it.
pub async fn preview_finding(findings: &dyn FindingStore, id: &str) -> ScoutResult<Preview> {
    let finding = findings.get(id).await?;
    Ok(preview(&finding))
}

/// What [`reconcile`] did with one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum ReconcileResult {
    /// The finding was marked merged (or already was) and the job closed.
    Resolved { finding_id: String },
    /// Left open; the finding is in a state that cannot become merged.
    Skipped { finding_id: String, reason: String },
    /// The repair itself failed; the job stays open.
    Failed { finding_id: String, error: String },
}

/// Mark the job's finding merged. `Ok(Some(reason))` means the finding
/// can no longer become merged and the job is left alone.
async fn repair(findings: &dyn FindingStore, job: &ReconciliationJob) -> ScoutResult<Option<String>> {
    let finding = findings.get(&job.finding_id).await?;
    match finding.status {
        FindingStatus::Merged => Ok(None),
        FindingStatus::Approved => {
            mark_merged(findings, &finding, job.merged_at).await?;
            Ok(None)
        }
        other => Ok(Some(format!("finding is {}", other))),
    }
}

/// Repair committed-but-unmarked merges recorded by [`merge_finding`].
pub async fn reconcile(findings: &dyn FindingStore) -> ScoutResult<Vec<ReconcileResult>> {
    let jobs = findings.open_reconciliations().await?;
    let mut results = Vec::with_capacity(jobs.len());

    for job in jobs {
        let id = job.finding_id.clone();
        let result = match repair(findings, &job).await {
            Ok(None) => match findings.resolve_reconciliation(&id).await {
                Ok(()) => ReconcileResult::Resolved { finding_id: id },
                Err(e) => ReconcileResult::Failed {
                    finding_id: id,
                    error: e.to_string(),
                },
            },
            Ok(Some(reason)) => ReconcileResult::Skipped {
                finding_id: id,
                reason,
            },
            Err(e) => ReconcileResult::Failed {
                finding_id: id,
                error: e.to_string(),
            },
        };
        results.push(result);
    }

    Ok(results)
}
