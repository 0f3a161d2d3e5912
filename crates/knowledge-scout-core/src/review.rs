//! Operator review actions.
//!
//! Every status change goes through [`FindingStatus::transition`] before
//! it reaches the store, and the store only applies it while the finding
//! still has the status that was checked. Content edits are allowed in
//! any status.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::{ScoutError, ScoutResult};
use crate::models::{ContentUpdate, Finding, FindingStatus};
use crate::store::FindingStore;

/// pending_review → approved.
pub async fn approve(store: &dyn FindingStore, id: &str) -> ScoutResult<Finding> {
    let mut finding = store.get(id).await?;
    let next = finding.status.transition(FindingStatus::Approved)?;
    store
        .save_status(id, finding.status, next, None, None)
        .await?;
    finding.status = next;
    info!(finding_id = id, "finding approved");
    Ok(finding)
}

/// pending_review → rejected, recording `reason`.
pub async fn reject(store: &dyn FindingStore, id: &str, reason: &str) -> ScoutResult<Finding> {
    if reason.trim().is_empty() {
        return Err(ScoutError::PreconditionFailed(
            "rejection reason must not be empty".to_string(),
        ));
    }
    let mut finding = store.get(id).await?;
    let next = finding.status.transition(FindingStatus::Rejected)?;
    store
        .save_status(id, finding.status, next, Some(reason), None)
        .await?;
    finding.status = next;
    finding.rejection_reason = Some(reason.to_string());
    info!(finding_id = id, reason, "finding rejected");
    Ok(finding)
}

/// Apply content edits without touching status.
pub async fn edit(
    store: &dyn FindingStore,
    id: &str,
    update: &ContentUpdate,
) -> ScoutResult<Finding> {
    let mut finding = store.get(id).await?;
    if update.is_empty() {
        return Ok(finding);
    }
    store.save_content(id, update).await?;
    finding.apply_update(update);
    Ok(finding)
}

/// approved → merged, stamping `merged_at`. Called only after the
/// document commit succeeded.
pub async fn mark_merged(
    store: &dyn FindingStore,
    finding: &Finding,
    merged_at: DateTime<Utc>,
) -> ScoutResult<()> {
    let next = finding.status.transition(FindingStatus::Merged)?;
    store
        .save_status(&finding.id, finding.status, next, None, Some(merged_at))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryFindingStore;

    fn store_with(status: FindingStatus) -> (InMemoryFindingStore, String) {
        let mut f = Finding::new("t", "s", "other");
        f.status = status;
        let id = f.id.clone();
        (InMemoryFindingStore::with_findings([f]), id)
    }

    #[tokio::test]
    async fn test_approve_pending() {
        let (store, id) = store_with(FindingStatus::PendingReview);
        let f = approve(&store, &id).await.unwrap();
        assert_eq!(f.status, FindingStatus::Approved);
        assert_eq!(store.get(&id).await.unwrap().status, FindingStatus::Approved);
    }

    #[tokio::test]
    async fn test_cannot_approve_rejected() {
        let (store, id) = store_with(FindingStatus::Rejected);
        let err = approve(&store, &id).await.unwrap_err();
        assert!(matches!(err, ScoutError::InvalidTransition { .. }));
        assert_eq!(store.get(&id).await.unwrap().status, FindingStatus::Rejected);
    }

    #[tokio::test]
    async fn test_reject_records_reason() {
        let (store, id) = store_with(FindingStatus::PendingReview);
        reject(&store, &id, "duplicate").await.unwrap();
        let f = store.get(&id).await.unwrap();
        assert_eq!(f.status, FindingStatus::Rejected);
        assert_eq!(f.rejection_reason.as_deref(), Some("duplicate"));
    }

    #[tokio::test]
    async fn test_reject_requires_reason() {
        let (store, id) = store_with(FindingStatus::PendingReview);
        let err = reject(&store, &id, "  ").await.unwrap_err();
        assert!(matches!(err, ScoutError::PreconditionFailed(_)));
    }

    #[tokio::test]
    async fn test_cannot_reject_approved() {
        let (store, id) = store_with(FindingStatus::Approved);
        assert!(reject(&store, &id, "late").await.is_err());
    }

    #[tokio::test]
    async fn test_edit_merged_finding_content() {
        let (store, id) = store_with(FindingStatus::Merged);
        let update = ContentUpdate {
            details: Some(Some("extra".into())),
            ..Default::default()
        };
        let f = edit(&store, &id, &update).await.unwrap();
        assert_eq!(f.details.as_deref(), Some("extra"));
        assert_eq!(f.status, FindingStatus::Merged);
    }

    #[tokio::test]
    async fn test_mark_merged_requires_approval() {
        let (store, id) = store_with(FindingStatus::PendingReview);
        let f = store.get(&id).await.unwrap();
        assert!(mark_merged(&store, &f, Utc::now()).await.is_err());
    }

    #[tokio::test]
    async fn test_mark_merged_twice_keeps_first_timestamp() {
        let (store, id) = store_with(FindingStatus::Approved);
        let snapshot = store.get(&id).await.unwrap();
        let first = Utc::now();

        mark_merged(&store, &snapshot, first).await.unwrap();
        let err = mark_merged(&store, &snapshot, first + chrono::Duration::seconds(60))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScoutError::InvalidTransition {
                from: FindingStatus::Merged,
                to: FindingStatus::Merged,
            }
        ));
        assert_eq!(store.get(&id).await.unwrap().merged_at, Some(first));
    }

    #[tokio::test]
    async fn test_stale_reject_after_approve() {
        let (store, id) = store_with(FindingStatus::PendingReview);
        let snapshot = store.get(&id).await.unwrap();
        approve(&store, &id).await.unwrap();

        let next = snapshot.status.transition(FindingStatus::Rejected).unwrap();
        let err = store
            .save_status(&id, snapshot.status, next, Some("late"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ScoutError::InvalidTransition { .. }));

        let f = store.get(&id).await.unwrap();
        assert_eq!(f.status, FindingStatus::Approved);
        assert_eq!(f.rejection_reason, None);
    }
}
