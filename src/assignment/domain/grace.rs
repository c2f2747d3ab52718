//! Grace-period marker embedded in the grace-start notice.
//!
//! The marker comment is the durable record of a grace window: its creation
//! time starts the window and its body names the claimant and the closed
//! change request.

use crate::tracker::domain::{CommentId, IssueComment, Login, PullRequestNumber};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// Token identifying grace marker comments.
pub const GRACE_MARKER_TOKEN: &str = "claimwarden:grace-period";

static MARKER_FIELDS: LazyLock<Regex> = LazyLock::new(marker_fields_pattern);

#[expect(
    clippy::expect_used,
    reason = "the pattern is a compile-time constant covered by tests"
)]
fn marker_fields_pattern() -> Regex {
    Regex::new(r"<!--\s*claimwarden:grace-period\s+claimant=(?P<claimant>\S+?)(?:\s+pr=(?P<pr>\d+))?\s*-->")
        .expect("grace marker pattern is valid")
}

/// A located grace marker comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraceMarker {
    comment_id: CommentId,
    started_at: DateTime<Utc>,
    claimant: Option<Login>,
    change_request: Option<PullRequestNumber>,
}

impl GraceMarker {
    /// Returns the hidden marker text for a new grace window.
    #[must_use]
    pub fn embed(claimant: &Login, change_request: PullRequestNumber) -> String {
        format!("<!-- {GRACE_MARKER_TOKEN} claimant={claimant} pr={change_request} -->")
    }

    /// Finds the newest comment carrying the marker token.
    #[must_use]
    pub fn locate(comments: &[IssueComment]) -> Option<Self> {
        let comment = comments
            .iter()
            .filter(|comment| comment.contains(GRACE_MARKER_TOKEN))
            .max_by_key(|comment| (comment.created_at, comment.id))?;
        let captures = MARKER_FIELDS.captures(&comment.body);
        let claimant = captures
            .as_ref()
            .and_then(|found| found.name("claimant"))
            .and_then(|value| Login::new(value.as_str()).ok());
        let change_request = captures
            .as_ref()
            .and_then(|found| found.name("pr"))
            .and_then(|value| value.as_str().parse::<u64>().ok())
            .and_then(|value| PullRequestNumber::new(value).ok());
        Some(Self {
            comment_id: comment.id,
            started_at: comment.created_at,
            claimant,
            change_request,
        })
    }

    /// Returns the marker comment identifier.
    #[must_use]
    pub const fn comment_id(&self) -> CommentId {
        self.comment_id
    }

    /// Returns when the grace window started.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns the claimant recorded in the marker, if extractable.
    #[must_use]
    pub const fn claimant(&self) -> Option<&Login> {
        self.claimant.as_ref()
    }

    /// Returns the closed change request recorded in the marker.
    #[must_use]
    pub const fn change_request(&self) -> Option<PullRequestNumber> {
        self.change_request
    }

    /// Returns `true` once `window` has elapsed since the marker was posted.
    #[must_use]
    pub fn has_elapsed(&self, window: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.started_at) >= window
    }
}
