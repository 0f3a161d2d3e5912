//! Core data models used throughout Knowledge Scout.
//!
//! A [`Finding`] is a candidate knowledge item scraped from a social or
//! developer source. It moves through a small review workflow
//! ([`FindingStatus`]) before the merge engine splices it into the
//! canonical document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ScoutError, ScoutResult};

/// Review workflow state of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    PendingReview,
    Approved,
    Rejected,
    Merged,
}

impl FindingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingStatus::PendingReview => "pending_review",
            FindingStatus::Approved => "approved",
            FindingStatus::Rejected => "rejected",
            FindingStatus::Merged => "merged",
        }
    }

    /// Whether the workflow allows moving from `self` to `next`.
    ///
    /// Allowed: pending_review → approved, pending_review → rejected,
    /// approved → merged. Nothing leaves `rejected` or `merged`.
    pub fn can_transition_to(&self, next: FindingStatus) -> bool {
        matches!(
            (self, next),
            (FindingStatus::PendingReview, FindingStatus::Approved)
                | (FindingStatus::PendingReview, FindingStatus::Rejected)
                | (FindingStatus::Approved, FindingStatus::Merged)
        )
    }

    /// Returns `next` if the transition is allowed, otherwise an
    /// [`ScoutError::InvalidTransition`].
    pub fn transition(&self, next: FindingStatus) -> ScoutResult<FindingStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ScoutError::InvalidTransition {
                from: *self,
                to: next,
            })
        }
    }
}

impl fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FindingStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_review" => Ok(FindingStatus::PendingReview),
            "approved" => Ok(FindingStatus::Approved),
            "rejected" => Ok(FindingStatus::Rejected),
            "merged" => Ok(FindingStatus::Merged),
            other => anyhow::bail!("unknown finding status: '{}'", other),
        }
    }
}

/// Where a finding was scraped from. Unknown labels collapse to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Twitter,
    Reddit,
    Github,
    Hackernews,
    Discord,
    #[default]
    #[serde(other)]
    Other,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Twitter => "twitter",
            SourceType::Reddit => "reddit",
            SourceType::Github => "github",
            SourceType::Hackernews => "hackernews",
            SourceType::Discord => "discord",
            SourceType::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "twitter" => SourceType::Twitter,
            "reddit" => SourceType::Reddit,
            "github" => SourceType::Github,
            "hackernews" => SourceType::Hackernews,
            "discord" => SourceType::Discord,
            _ => SourceType::Other,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reviewable unit of knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub usage: Option<String>,
    pub code_snippet: Option<String>,
    pub details: Option<String>,
    pub original_content: Option<String>,
    pub category: String,
    pub source_type: SourceType,
    pub source_url: Option<String>,
    pub source_author: Option<String>,
    pub status: FindingStatus,
    pub rejection_reason: Option<String>,
    pub merged_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Finding {
    /// Build a fresh `pending_review` finding with a random id.
    pub fn new(
        title: impl Into<String>,
        summary: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            summary: summary.into(),
            usage: None,
            code_snippet: None,
            details: None,
            original_content: None,
            category: category.into(),
            source_type: SourceType::Other,
            source_url: None,
            source_author: None,
            status: FindingStatus::PendingReview,
            rejection_reason: None,
            merged_at: None,
            created_at: Utc::now(),
        }
    }

    /// True iff the summary is non-empty and at least one of usage,
    /// code snippet, or details carries text.
    ///
    /// Used to warn the operator before a merge; never blocks one.
    pub fn is_enriched(&self) -> bool {
        !self.summary.is_empty()
            && (present(&self.usage).is_some()
                || present(&self.code_snippet).is_some()
                || present(&self.details).is_some())
    }

    /// Apply a content edit. Status is left untouched.
    pub fn apply_update(&mut self, update: &ContentUpdate) {
        if let Some(summary) = &update.summary {
            self.summary = summary.clone();
        }
        if let Some(usage) = &update.usage {
            self.usage = usage.clone();
        }
        if let Some(details) = &update.details {
            self.details = details.clone();
        }
        if let Some(code) = &update.code_snippet {
            self.code_snippet = code.clone();
        }
    }
}

/// Returns the inner text when the field is set and non-empty.
pub fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// An edit to a finding's content fields.
///
/// Outer `None` leaves the field alone; `Some(None)` clears an optional
/// field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentUpdate {
    pub summary: Option<String>,
    pub usage: Option<Option<String>>,
    pub details: Option<Option<String>>,
    pub code_snippet: Option<Option<String>>,
}

impl ContentUpdate {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.usage.is_none()
            && self.details.is_none()
            && self.code_snippet.is_none()
    }
}

/// Structured fields returned by the extraction service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub summary: String,
    pub usage: Option<String>,
    pub details: Option<String>,
    pub code_snippet: Option<String>,
}

impl From<&Extraction> for ContentUpdate {
    fn from(e: &Extraction) -> Self {
        ContentUpdate {
            summary: Some(e.summary.clone()),
            usage: Some(e.usage.clone()),
            details: Some(e.details.clone()),
            code_snippet: Some(e.code_snippet.clone()),
        }
    }
}

/// Everything the extraction service gets to look at.
#[derive(Debug, Clone)]
pub struct ExtractionInput {
    pub title: String,
    /// Kept when the service returns no summary of its own.
    pub current_summary: String,
    pub original_content: Option<String>,
    pub source_author: Option<String>,
    pub source_type: SourceType,
    /// Plain text of the source page, already stripped and truncated.
    pub source_text: Option<String>,
}

impl ExtractionInput {
    pub fn from_finding(finding: &Finding, source_text: Option<String>) -> Self {
        Self {
            title: finding.title.clone(),
            current_summary: finding.summary.clone(),
            original_content: finding.original_content.clone(),
            source_author: finding.source_author.clone(),
            source_type: finding.source_type,
            source_text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_transitions() {
        use FindingStatus::*;
        assert!(PendingReview.can_transition_to(Approved));
        assert!(PendingReview.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Merged));
    }

    #[test]
    fn test_forbidden_transitions() {
        use FindingStatus::*;
        assert!(!PendingReview.can_transition_to(Merged));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Approved.can_transition_to(PendingReview));
        assert!(!Rejected.can_transition_to(PendingReview));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Merged.can_transition_to(PendingReview));
        assert!(!Merged.can_transition_to(Merged));

        let err = Merged.transition(Approved).unwrap_err();
        assert!(matches!(err, ScoutError::InvalidTransition { .. }));
    }

    #[test]
    fn test_status_string_roundtrip() {
        for s in ["pending_review", "approved", "rejected", "merged"] {
            let status: FindingStatus = s.parse().unwrap();
            assert_eq!(status.as_str(), s);
        }
        assert!("done".parse::<FindingStatus>().is_err());
    }

    #[test]
    fn test_source_type_unknown_is_other() {
        assert_eq!(SourceType::parse("mastodon"), SourceType::Other);
        let parsed: SourceType = serde_json::from_str("\"mastodon\"").unwrap();
        assert_eq!(parsed, SourceType::Other);
        assert_eq!(SourceType::parse("reddit"), SourceType::Reddit);
    }

    #[test]
    fn test_enriched_with_code_only() {
        let mut f = Finding::new("t", "A summary.", "other");
        f.code_snippet = Some("ls".into());
        assert!(f.is_enriched());
    }

    #[test]
    fn test_not_enriched_with_summary_only() {
        let f = Finding::new("t", "A summary.", "other");
        assert!(!f.is_enriched());
    }

    #[test]
    fn test_not_enriched_without_summary() {
        let mut f = Finding::new("t", "", "other");
        f.usage = Some("run it".into());
        assert!(!f.is_enriched());
    }

    #[test]
    fn test_empty_optional_does_not_count() {
        let mut f = Finding::new("t", "A summary.", "other");
        f.details = Some(String::new());
        assert!(!f.is_enriched());
    }

    #[test]
    fn test_apply_update_leaves_status() {
        let mut f = Finding::new("t", "old", "other");
        f.status = FindingStatus::Approved;
        f.usage = Some("keep?".into());
        f.apply_update(&ContentUpdate {
            summary: Some("new".into()),
            usage: Some(None),
            details: Some(Some("more".into())),
            code_snippet: None,
        });
        assert_eq!(f.summary, "new");
        assert_eq!(f.usage, None);
        assert_eq!(f.details.as_deref(), Some("more"));
        assert_eq!(f.status, FindingStatus::Approved);
    }
}
