//! Logical claim state projected from labels and assignees.
//!
//! The tracker stores no claim record. [`project`] derives the logical state
//! from an item's labels and assignees, and [`transition`] computes the label
//! and assignee changes plus side effects for an event. Both are pure; the
//! services apply the result through the tracker in order.

use crate::tracker::domain::{IssueNumber, Login, PullRequestNumber, WorkItem};

/// Names of the two mutually exclusive state labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimLabels {
    /// Label carried by an actively claimed item.
    pub claimed: String,
    /// Label carried during a grace window.
    pub pending: String,
}

impl ClaimLabels {
    /// Creates the label pair.
    #[must_use]
    pub fn new(claimed: impl Into<String>, pending: impl Into<String>) -> Self {
        Self {
            claimed: claimed.into(),
            pending: pending.into(),
        }
    }
}

/// Claim state of a work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicalState {
    /// Nobody holds the item.
    Unclaimed,
    /// `claimant` holds the item.
    Claimed {
        /// Active claimant.
        claimant: Login,
    },
    /// A takeover from `incumbent` to `challenger` is in flight.
    PendingTakeover {
        /// Current claimant being replaced.
        incumbent: Login,
        /// Proposed claimant.
        challenger: Login,
    },
    /// `claimant`'s linked change request closed unmerged; the grace window
    /// is open.
    PendingRelease {
        /// Claimant who may still salvage the claim.
        claimant: Login,
    },
    /// The item is closed. No transitions apply.
    Closed,
}

/// Disagreement between the state labels and the assignee list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Divergence {
    /// A state label is present but nobody is assigned.
    LabelWithoutAssignee,
    /// Someone is assigned but neither state label is present.
    AssigneeWithoutLabel,
    /// Both state labels are present.
    ConflictingLabels,
}

/// Result of projecting an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    /// Derived logical state.
    pub state: LogicalState,
    /// Detected divergence, if any.
    pub divergence: Option<Divergence>,
}

impl Projection {
    /// Returns the label mutations that heal the detected divergence.
    #[must_use]
    pub fn healing(&self, labels: &ClaimLabels) -> Vec<Mutation> {
        match self.divergence {
            Some(Divergence::LabelWithoutAssignee | Divergence::ConflictingLabels) => {
                vec![Mutation::RemoveLabel(labels.claimed.clone())]
            }
            Some(Divergence::AssigneeWithoutLabel) => {
                vec![Mutation::AddLabel(labels.claimed.clone())]
            }
            None => Vec::new(),
        }
    }
}

/// Projects the logical claim state of `item`.
///
/// The first assignee is the claimant. A pending label on an item with no
/// assignee is left for the grace-period sweep, which owns that label.
#[must_use]
pub fn project(item: &WorkItem, labels: &ClaimLabels) -> Projection {
    if !item.is_open() {
        return Projection {
            state: LogicalState::Closed,
            divergence: None,
        };
    }
    let claimed = item.has_label(&labels.claimed);
    let pending = item.has_label(&labels.pending);
    let Some(claimant) = item.assignees().first().cloned() else {
        return Projection {
            state: LogicalState::Unclaimed,
            divergence: claimed.then_some(Divergence::LabelWithoutAssignee),
        };
    };
    let (state, divergence) = match (claimed, pending) {
        (_, true) => (
            LogicalState::PendingRelease { claimant },
            claimed.then_some(Divergence::ConflictingLabels),
        ),
        (true, false) => (LogicalState::Claimed { claimant }, None),
        (false, false) => (
            LogicalState::Claimed { claimant },
            Some(Divergence::AssigneeWithoutLabel),
        ),
    };
    Projection { state, divergence }
}

/// Facts gathered by the services before a claim is decided.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClaimGuard {
    /// Other items the actor holds without an open change request, when
    /// they reach the claim limit. Empty when the actor may claim.
    pub blocking_items: Vec<IssueNumber>,
    /// Every change request linked to the current claim is older than the
    /// takeover threshold.
    pub incumbent_abandoned: bool,
}

/// An input to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimEvent {
    /// `actor` asked to claim the item.
    Claim {
        /// Requesting contributor.
        actor: Login,
        /// Pre-computed guard facts.
        guard: ClaimGuard,
    },
    /// `actor` asked to release the item.
    Release {
        /// Requesting contributor.
        actor: Login,
    },
    /// The claim exceeded the staleness threshold with no open linked change
    /// request.
    StaleTimeout,
    /// A linked change request by `author` closed without merging.
    ChangeRequestClosedUnmerged {
        /// Change request author.
        author: Login,
        /// The closed change request.
        number: PullRequestNumber,
    },
    /// A change request referencing the item was opened or reopened.
    ChangeRequestOpened,
    /// The grace window elapsed with no open linked change request.
    GraceExpired {
        /// Claimant recorded in the grace marker.
        marker_claimant: Login,
        /// Whether that claimant is still assigned.
        still_assigned: bool,
    },
}

/// A label or assignee change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Assign a contributor.
    AddAssignee(Login),
    /// Unassign a contributor.
    RemoveAssignee(Login),
    /// Add a label.
    AddLabel(String),
    /// Remove a label.
    RemoveLabel(String),
}

/// User-visible outcome of a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The claim was granted.
    Assigned {
        /// New claimant.
        claimant: Login,
    },
    /// The actor already holds the claim.
    AlreadyClaimed {
        /// Requesting contributor.
        actor: Login,
    },
    /// Somebody else holds the claim.
    ClaimedByOther {
        /// Requesting contributor.
        actor: Login,
        /// Current claimant.
        claimant: Login,
    },
    /// The actor holds too many claims without open change requests.
    ClaimLimitReached {
        /// Requesting contributor.
        actor: Login,
        /// Items blocking the claim.
        blocking_items: Vec<IssueNumber>,
    },
    /// The claimant released the item.
    Released {
        /// Former claimant.
        claimant: Login,
    },
    /// A non-claimant tried to release the item.
    ReleaseDenied {
        /// Requesting contributor.
        actor: Login,
        /// Current claimant.
        claimant: Login,
    },
    /// The claim timed out.
    StaleReleased {
        /// Former claimant.
        claimant: Login,
    },
    /// The grace window opened.
    GraceStarted {
        /// Claimant who may salvage the claim.
        claimant: Login,
        /// Change request that closed unmerged.
        change_request: PullRequestNumber,
    },
    /// A new change request cancelled the grace window.
    GraceCancelled {
        /// Claimant who keeps the claim.
        claimant: Login,
    },
    /// The grace window elapsed.
    GraceExpired {
        /// Claimant recorded in the grace marker.
        claimant: Login,
        /// Whether the claimant was unassigned.
        unassigned: bool,
    },
    /// The claim is to be transferred by the takeover transaction.
    TakeoverRequested {
        /// Current claimant.
        incumbent: Login,
        /// Proposed claimant.
        challenger: Login,
    },
}

/// Result of applying an event to a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// State after the mutations are applied.
    pub next: LogicalState,
    /// Ordered tracker mutations.
    pub mutations: Vec<Mutation>,
    /// Outcome to announce once the mutations succeed, if any.
    pub outcome: Option<Outcome>,
}

impl Transition {
    fn stay(state: &LogicalState) -> Self {
        Self {
            next: state.clone(),
            mutations: Vec::new(),
            outcome: None,
        }
    }

    fn reply(state: &LogicalState, outcome: Outcome) -> Self {
        Self {
            next: state.clone(),
            mutations: Vec::new(),
            outcome: Some(outcome),
        }
    }

    /// Returns `true` when the transition changes nothing and announces
    /// nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.mutations.is_empty() && self.outcome.is_none()
    }
}

/// Computes the transition for `event` in `state`.
#[must_use]
pub fn transition(state: &LogicalState, event: &ClaimEvent, labels: &ClaimLabels) -> Transition {
    match state {
        LogicalState::Closed | LogicalState::PendingTakeover { .. } => Transition::stay(state),
        LogicalState::Unclaimed => from_unclaimed(state, event, labels),
        LogicalState::Claimed { claimant } => from_claimed(state, claimant, event, labels),
        LogicalState::PendingRelease { claimant } => {
            from_pending_release(state, claimant, event, labels)
        }
    }
}

fn from_unclaimed(state: &LogicalState, event: &ClaimEvent, labels: &ClaimLabels) -> Transition {
    match event {
        ClaimEvent::Claim { actor, guard } if !guard.blocking_items.is_empty() => {
            Transition::reply(
                state,
                Outcome::ClaimLimitReached {
                    actor: actor.clone(),
                    blocking_items: guard.blocking_items.clone(),
                },
            )
        }
        ClaimEvent::Claim { actor, .. } => Transition {
            next: LogicalState::Claimed {
                claimant: actor.clone(),
            },
            mutations: vec![
                Mutation::AddAssignee(actor.clone()),
                Mutation::AddLabel(labels.claimed.clone()),
            ],
            outcome: Some(Outcome::Assigned {
                claimant: actor.clone(),
            }),
        },
        ClaimEvent::GraceExpired {
            marker_claimant, ..
        } => Transition {
            next: LogicalState::Unclaimed,
            mutations: vec![Mutation::RemoveLabel(labels.pending.clone())],
            outcome: Some(Outcome::GraceExpired {
                claimant: marker_claimant.clone(),
                unassigned: false,
            }),
        },
        _ => Transition::stay(state),
    }
}

fn from_claimed(
    state: &LogicalState,
    claimant: &Login,
    event: &ClaimEvent,
    labels: &ClaimLabels,
) -> Transition {
    let release = |outcome| Transition {
        next: LogicalState::Unclaimed,
        mutations: vec![
            Mutation::RemoveAssignee(claimant.clone()),
            Mutation::RemoveLabel(labels.claimed.clone()),
        ],
        outcome: Some(outcome),
    };
    match event {
        ClaimEvent::Claim { actor, .. } if actor == claimant => Transition::reply(
            state,
            Outcome::AlreadyClaimed {
                actor: actor.clone(),
            },
        ),
        ClaimEvent::Claim { actor, guard } if guard.incumbent_abandoned => Transition {
            next: LogicalState::PendingTakeover {
                incumbent: claimant.clone(),
                challenger: actor.clone(),
            },
            mutations: Vec::new(),
            outcome: Some(Outcome::TakeoverRequested {
                incumbent: claimant.clone(),
                challenger: actor.clone(),
            }),
        },
        ClaimEvent::Claim { actor, .. } => Transition::reply(
            state,
            Outcome::ClaimedByOther {
                actor: actor.clone(),
                claimant: claimant.clone(),
            },
        ),
        ClaimEvent::Release { actor } if actor == claimant => release(Outcome::Released {
            claimant: claimant.clone(),
        }),
        ClaimEvent::Release { actor } => Transition::reply(
            state,
            Outcome::ReleaseDenied {
                actor: actor.clone(),
                claimant: claimant.clone(),
            },
        ),
        ClaimEvent::StaleTimeout => release(Outcome::StaleReleased {
            claimant: claimant.clone(),
        }),
        ClaimEvent::ChangeRequestClosedUnmerged { author, number } if author == claimant => {
            Transition {
                next: LogicalState::PendingRelease {
                    claimant: claimant.clone(),
                },
                mutations: vec![
                    Mutation::RemoveLabel(labels.claimed.clone()),
                    Mutation::AddLabel(labels.pending.clone()),
                ],
                outcome: Some(Outcome::GraceStarted {
                    claimant: claimant.clone(),
                    change_request: *number,
                }),
            }
        }
        ClaimEvent::ChangeRequestClosedUnmerged { .. }
        | ClaimEvent::ChangeRequestOpened
        | ClaimEvent::GraceExpired { .. } => Transition::stay(state),
    }
}

fn from_pending_release(
    state: &LogicalState,
    claimant: &Login,
    event: &ClaimEvent,
    labels: &ClaimLabels,
) -> Transition {
    match event {
        ClaimEvent::ChangeRequestOpened => Transition {
            next: LogicalState::Claimed {
                claimant: claimant.clone(),
            },
            mutations: vec![
                Mutation::RemoveLabel(labels.pending.clone()),
                Mutation::AddLabel(labels.claimed.clone()),
            ],
            outcome: Some(Outcome::GraceCancelled {
                claimant: claimant.clone(),
            }),
        },
        ClaimEvent::GraceExpired {
            marker_claimant,
            still_assigned: true,
        } => Transition {
            next: LogicalState::Unclaimed,
            mutations: vec![
                Mutation::RemoveAssignee(marker_claimant.clone()),
                Mutation::RemoveLabel(labels.pending.clone()),
            ],
            outcome: Some(Outcome::GraceExpired {
                claimant: marker_claimant.clone(),
                unassigned: true,
            }),
        },
        ClaimEvent::GraceExpired {
            marker_claimant,
            still_assigned: false,
        } => Transition {
            next: LogicalState::Claimed {
                claimant: claimant.clone(),
            },
            mutations: vec![
                Mutation::RemoveLabel(labels.pending.clone()),
                Mutation::AddLabel(labels.claimed.clone()),
            ],
            outcome: Some(Outcome::GraceExpired {
                claimant: marker_claimant.clone(),
                unassigned: false,
            }),
        },
        ClaimEvent::Release { actor } if actor == claimant => Transition {
            next: LogicalState::Unclaimed,
            mutations: vec![
                Mutation::RemoveAssignee(claimant.clone()),
                Mutation::RemoveLabel(labels.pending.clone()),
            ],
            outcome: Some(Outcome::Released {
                claimant: claimant.clone(),
            }),
        },
        ClaimEvent::Release { actor } => Transition::reply(
            state,
            Outcome::ReleaseDenied {
                actor: actor.clone(),
                claimant: claimant.clone(),
            },
        ),
        ClaimEvent::Claim { actor, .. } if actor == claimant => Transition::reply(
            state,
            Outcome::AlreadyClaimed {
                actor: actor.clone(),
            },
        ),
        ClaimEvent::Claim { actor, .. } => Transition::reply(
            state,
            Outcome::ClaimedByOther {
                actor: actor.clone(),
                claimant: claimant.clone(),
            },
        ),
        ClaimEvent::StaleTimeout | ClaimEvent::ChangeRequestClosedUnmerged { .. } => {
            Transition::stay(state)
        }
    }
}
