//! Error types for reconciliation services.

use crate::tracker::domain::{IssueNumber, TrackerDomainError};
use crate::tracker::ports::TrackerError;
use thiserror::Error;

/// Errors raised while reconciling a trigger or an item.
///
/// Sweeps catch these per item; they never abort a batch.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A tracker call failed.
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    /// Tracker data could not be turned into domain values.
    #[error(transparent)]
    Domain(#[from] TrackerDomainError),

    /// A notice could not be rendered.
    #[error(transparent)]
    Notice(#[from] NoticeError),

    /// The trigger is malformed or incomplete.
    #[error("invalid trigger: {0}")]
    Validation(String),

    /// Tracker state contradicts an invariant and needs manual review.
    #[error("invariant violated on item #{item}: {detail}")]
    InvariantViolation {
        /// Affected item.
        item: IssueNumber,
        /// What was found.
        detail: String,
    },

    /// The linked change requests of an item could not all be read.
    #[error("linked change requests of item #{0} could not be fully resolved")]
    IncompleteView(IssueNumber),
}

impl ReconcileError {
    /// Returns `true` when the error is expected to clear on a later run.
    #[must_use]
    pub const fn is_deferrable(&self) -> bool {
        matches!(
            self,
            Self::Tracker(TrackerError::Transient(_)) | Self::IncompleteView(_)
        )
    }
}

/// Errors raised while rendering notices.
#[derive(Debug, Error)]
pub enum NoticeError {
    /// The template failed to render.
    #[error("failed to render {kind} notice: {source}")]
    Render {
        /// Notice kind.
        kind: &'static str,
        /// Template engine error.
        #[source]
        source: minijinja::Error,
    },
}

/// Result type for reconciliation services.
pub type ReconcileResult<T> = Result<T, ReconcileError>;
