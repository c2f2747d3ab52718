//! External triggers accepted by the reconciler.

use super::ActorKind;
use crate::tracker::domain::{ChangeRequest, CommentId, IssueNumber, Login};

/// A new comment on a work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentEvent {
    /// Item the comment was posted on.
    pub item: IssueNumber,
    /// Triggering comment.
    pub comment_id: CommentId,
    /// Comment author.
    pub actor: Login,
    /// Whether the author is a person or an automation account.
    pub actor_kind: ActorKind,
    /// Comment body.
    pub text: String,
    /// Whether the commented item is itself a change request.
    pub on_change_request: bool,
}

/// Change request lifecycle action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeRequestAction {
    /// Newly opened.
    Opened,
    /// Reopened after being closed.
    Reopened,
    /// Closed, merged or not.
    Closed,
}

/// A change request lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRequestEvent {
    /// What happened.
    pub action: ChangeRequestAction,
    /// The change request as carried by the event.
    pub change_request: ChangeRequest,
}

/// Entry point input for [`crate::assignment::services::Reconciler::reconcile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// A comment was posted.
    CommentEvent(CommentEvent),
    /// A change request was opened, reopened or closed.
    ChangeRequestEvent(ChangeRequestEvent),
    /// Periodic sweep over every open item.
    ScheduledSweep,
}
