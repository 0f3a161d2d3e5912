//! Error taxonomy shared by the merge engine, the review workflow, and
//! every store implementation.

use thiserror::Error;

use crate::models::FindingStatus;

/// Convenience alias used throughout the core crate.
pub type ScoutResult<T> = std::result::Result<T, ScoutError>;

#[derive(Debug, Error)]
pub enum ScoutError {
    /// The finding or the canonical document does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The finding is not in a state that allows the operation.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// A review action asked for a transition the workflow forbids.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: FindingStatus,
        to: FindingStatus,
    },

    /// The version token supplied with a commit is stale.
    #[error("version conflict: {0}")]
    VersionConflict(String),

    /// Network or remote-service failure. The message is surfaced verbatim.
    #[error("transport error: {0}")]
    Transport(String),

    /// The extraction service answered with something that is not the
    /// expected structured result.
    #[error("parse failure: {0}")]
    ParseFailure(String),

    /// Anything else (local database, configuration, I/O).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScoutError {
    /// Machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ScoutError::NotFound(_) => "not_found",
            ScoutError::PreconditionFailed(_) => "precondition_failed",
            ScoutError::InvalidTransition { .. } => "invalid_transition",
            ScoutError::VersionConflict(_) => "version_conflict",
            ScoutError::Transport(_) => "transport",
            ScoutError::ParseFailure(_) => "parse_failure",
            ScoutError::Other(_) => "internal",
        }
    }

    pub fn is_version_conflict(&self) -> bool {
        matches!(self, ScoutError::VersionConflict(_))
    }
}
