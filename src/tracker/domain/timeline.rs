//! Timeline events recorded by the tracker on a work item.

use super::{Login, PullRequestNumber, RepositoryFullName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The item on the other end of a cross-reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossReferenceSource {
    /// Number of the referencing item.
    pub number: u64,
    /// Repository hosting the referencing item, as reported by the tracker.
    pub repository: String,
    /// Whether the referencing item is a change request.
    pub is_change_request: bool,
}

/// A single event from a work item's timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TimelineEvent {
    /// Another item textually mentioned this one.
    CrossReferenced {
        /// The mentioning item.
        source: CrossReferenceSource,
        /// When the mention happened.
        created_at: DateTime<Utc>,
    },
    /// A change request was linked through the tracker UI.
    Connected {
        /// The linked change request, when the tracker reports it.
        change_request: Option<PullRequestNumber>,
        /// When the link was made.
        created_at: DateTime<Utc>,
    },
    /// A contributor was assigned (a claim event).
    Assigned {
        /// The new assignee.
        assignee: Login,
        /// When the assignment happened.
        created_at: DateTime<Utc>,
    },
    /// A contributor was unassigned.
    Unassigned {
        /// The removed assignee.
        assignee: Login,
        /// When the removal happened.
        created_at: DateTime<Utc>,
    },
    /// Any event kind the reconciler does not interpret.
    Other {
        /// Raw event name.
        name: String,
    },
}

impl TimelineEvent {
    /// Returns the change request number this event links, when it is a
    /// same-repository change-request cross-reference.
    #[must_use]
    pub fn linked_change_request(&self, repository: &RepositoryFullName) -> Option<PullRequestNumber> {
        match self {
            Self::CrossReferenced { source, .. }
                if source.is_change_request && repository.matches(&source.repository) =>
            {
                PullRequestNumber::new(source.number).ok()
            }
            _ => None,
        }
    }

    /// Returns the change request a connection event names.
    ///
    /// Connection events carry no repository, so the link only counts once
    /// the change request's own body is shown to close the item.
    #[must_use]
    pub const fn connected_change_request(&self) -> Option<PullRequestNumber> {
        match self {
            Self::Connected { change_request, .. } => *change_request,
            _ => None,
        }
    }
}

/// Returns when `claimant` was most recently assigned, from the timeline.
///
/// This is the claim's creation time and the only valid staleness anchor.
#[must_use]
pub fn claimed_at(events: &[TimelineEvent], claimant: &Login) -> Option<DateTime<Utc>> {
    events
        .iter()
        .filter_map(|event| match event {
            TimelineEvent::Assigned {
                assignee,
                created_at,
            } if assignee == claimant => Some(*created_at),
            _ => None,
        })
        .max()
}
