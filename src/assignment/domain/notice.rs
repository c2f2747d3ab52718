//! Notices posted on work items and their deduplication markers.
//!
//! Every notice body ends with a hidden HTML comment naming its dedup key.
//! A notice whose key already appears on the item is not posted again.

use super::Outcome;
use crate::tracker::domain::{CommentId, IssueComment, Login, PullRequestNumber};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

const NOTICE_TOKEN: &str = "claimwarden:notice";

/// Identity of a notice for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NoticeKey {
    /// A reply to the triggering comment.
    Reply(CommentId),
    /// An announcement about one claim instance, identified by claimant and
    /// assignment time.
    Claim {
        /// Claimant.
        claimant: Login,
        /// Assignment time of this claim instance.
        epoch: DateTime<Utc>,
    },
    /// The grace window opened for a closed change request.
    GraceStart(PullRequestNumber),
    /// The grace window identified by its marker comment ended.
    GraceEnd(CommentId),
    /// A takeover attempt for a triggering comment.
    Takeover(CommentId),
    /// A failure report for a triggering comment. Kept apart from
    /// [`NoticeKey::Reply`] so a later successful retry still replies.
    Failure(CommentId),
}

impl fmt::Display for NoticeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reply(comment) => write!(f, "reply:{comment}"),
            Self::Claim { claimant, epoch } => {
                write!(f, "claim:{claimant}:{}", epoch.timestamp())
            }
            Self::GraceStart(number) => write!(f, "grace-start:{number}"),
            Self::GraceEnd(comment) => write!(f, "grace-end:{comment}"),
            Self::Takeover(comment) => write!(f, "takeover:{comment}"),
            Self::Failure(comment) => write!(f, "failure:{comment}"),
        }
    }
}

impl NoticeKey {
    /// Returns the hidden marker embedded in a notice body.
    #[must_use]
    pub fn marker(&self) -> String {
        format!("<!-- {NOTICE_TOKEN} key={self} -->")
    }

    /// Returns `true` when `comment` carries this key.
    #[must_use]
    pub fn is_marked_in(&self, comment: &IssueComment) -> bool {
        comment.contains(&self.marker())
    }
}

/// What a notice announces, with the values its template needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoticeKind {
    /// The claim was granted.
    Assigned {
        /// New claimant.
        claimant: String,
        /// Hours before the claim goes stale.
        deadline_hours: i64,
    },
    /// The actor already holds the claim.
    AlreadyClaimed {
        /// Requesting contributor.
        actor: String,
    },
    /// Somebody else holds the claim.
    ClaimedByOther {
        /// Requesting contributor.
        actor: String,
        /// Current claimant.
        claimant: String,
    },
    /// The actor holds too many claims without open change requests.
    ClaimLimitReached {
        /// Requesting contributor.
        actor: String,
        /// Blocking item numbers.
        blocking_items: Vec<u64>,
    },
    /// The claimant released the item.
    Released {
        /// Former claimant.
        claimant: String,
    },
    /// A non-claimant tried to release the item.
    ReleaseDenied {
        /// Requesting contributor.
        actor: String,
        /// Current claimant.
        claimant: String,
    },
    /// The claim timed out.
    StaleReleased {
        /// Former claimant.
        claimant: String,
        /// Staleness threshold in hours.
        threshold_hours: i64,
    },
    /// The grace window opened. This notice is the grace marker.
    GraceStarted {
        /// Claimant who may salvage the claim.
        claimant: String,
        /// Closed change request.
        change_request: u64,
        /// Grace window in hours.
        grace_hours: i64,
        /// Embedded grace marker.
        marker: String,
    },
    /// A new change request cancelled the grace window.
    GraceCancelled {
        /// Claimant who keeps the claim.
        claimant: String,
    },
    /// The grace window elapsed.
    GraceExpired {
        /// Claimant recorded in the grace marker.
        claimant: String,
        /// Whether the claimant was unassigned.
        unassigned: bool,
    },
    /// The claim moved to a new contributor.
    TakeoverCompleted {
        /// Former claimant.
        previous: String,
        /// New claimant.
        claimant: String,
        /// Takeover threshold in days.
        threshold_days: i64,
    },
    /// The takeover failed and the previous claim was restored.
    TakeoverRolledBack {
        /// Claimant who keeps the item.
        previous: String,
        /// Contributor whose takeover failed.
        challenger: String,
    },
    /// The takeover failed and could not be undone.
    ManualIntervention {
        /// Claimant before the attempt.
        previous: String,
        /// Contributor whose takeover failed.
        challenger: String,
        /// Failure description.
        detail: String,
    },
    /// A claim or release command could not be applied.
    CommandFailed {
        /// Requesting contributor.
        actor: String,
        /// Failure description.
        detail: String,
    },
    /// A grace window cannot be closed without a maintainer.
    GraceReviewNeeded {
        /// Pending label left on the item.
        label: String,
        /// What was found.
        detail: String,
    },
}

/// Durations quoted in notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoticeTimings {
    /// Staleness threshold in hours.
    pub stale_hours: i64,
    /// Grace window in hours.
    pub grace_hours: i64,
    /// Takeover threshold in days.
    pub takeover_days: i64,
}

impl NoticeKind {
    /// Builds the notice announcing `outcome`, or `None` for outcomes that
    /// hand off to another component.
    #[must_use]
    pub fn from_outcome(outcome: &Outcome, timings: NoticeTimings) -> Option<Self> {
        let kind = match outcome {
            Outcome::Assigned { claimant } => Self::Assigned {
                claimant: claimant.to_string(),
                deadline_hours: timings.stale_hours,
            },
            Outcome::AlreadyClaimed { actor } => Self::AlreadyClaimed {
                actor: actor.to_string(),
            },
            Outcome::ClaimedByOther { actor, claimant } => Self::ClaimedByOther {
                actor: actor.to_string(),
                claimant: claimant.to_string(),
            },
            Outcome::ClaimLimitReached {
                actor,
                blocking_items,
            } => Self::ClaimLimitReached {
                actor: actor.to_string(),
                blocking_items: blocking_items.iter().map(|item| item.value()).collect(),
            },
            Outcome::Released { claimant } => Self::Released {
                claimant: claimant.to_string(),
            },
            Outcome::ReleaseDenied { actor, claimant } => Self::ReleaseDenied {
                actor: actor.to_string(),
                claimant: claimant.to_string(),
            },
            Outcome::StaleReleased { claimant } => Self::StaleReleased {
                claimant: claimant.to_string(),
                threshold_hours: timings.stale_hours,
            },
            Outcome::GraceStarted {
                claimant,
                change_request,
            } => Self::GraceStarted {
                claimant: claimant.to_string(),
                change_request: change_request.value(),
                grace_hours: timings.grace_hours,
                marker: super::GraceMarker::embed(claimant, *change_request),
            },
            Outcome::GraceCancelled { claimant } => Self::GraceCancelled {
                claimant: claimant.to_string(),
            },
            Outcome::GraceExpired {
                claimant,
                unassigned,
            } => Self::GraceExpired {
                claimant: claimant.to_string(),
                unassigned: *unassigned,
            },
            Outcome::TakeoverRequested { .. } => return None,
        };
        Some(kind)
    }
}

/// A notice ready for rendering and posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Content.
    pub kind: NoticeKind,
    /// Dedup identity.
    pub key: NoticeKey,
}

impl Notice {
    /// Creates a notice.
    #[must_use]
    pub const fn new(kind: NoticeKind, key: NoticeKey) -> Self {
        Self { kind, key }
    }
}
