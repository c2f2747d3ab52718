//! Issue-tracker port: every read and mutation the reconciler performs.

use crate::tracker::domain::{
    ChangeRequest, ChangeRequestMention, CommentId, IssueComment, IssueNumber, Login,
    PullRequestNumber, TimelineEvent, WorkItem,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Issue-tracker contract.
///
/// Listing operations return every page. Label and assignee mutations are
/// idempotent: adding a present value or removing an absent one succeeds.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Fetches a single work item.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::NotFound`] when the item does not exist.
    async fn get_item(&self, item: IssueNumber) -> TrackerResult<WorkItem>;

    /// Lists every open work item, excluding change requests.
    async fn list_open_items(&self) -> TrackerResult<Vec<WorkItem>>;

    /// Lists open work items assigned to `login`.
    async fn list_open_items_assigned_to(&self, login: &Login) -> TrackerResult<Vec<WorkItem>>;

    /// Adds assignees to an item.
    async fn add_assignees(&self, item: IssueNumber, logins: &[Login]) -> TrackerResult<()>;

    /// Removes assignees from an item.
    async fn remove_assignees(&self, item: IssueNumber, logins: &[Login]) -> TrackerResult<()>;

    /// Adds a label to an item.
    async fn add_label(&self, item: IssueNumber, label: &str) -> TrackerResult<()>;

    /// Removes a label from an item.
    async fn remove_label(&self, item: IssueNumber, label: &str) -> TrackerResult<()>;

    /// Lists every comment on an item.
    async fn list_comments(&self, item: IssueNumber) -> TrackerResult<Vec<IssueComment>>;

    /// Posts a comment and returns it as recorded.
    async fn create_comment(&self, item: IssueNumber, body: &str) -> TrackerResult<IssueComment>;

    /// Replaces the body of an existing comment.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::NotFound`] when the comment does not exist.
    async fn update_comment(&self, comment: CommentId, body: &str) -> TrackerResult<()>;

    /// Deletes a comment. Deleting an absent comment succeeds.
    async fn delete_comment(&self, comment: CommentId) -> TrackerResult<()>;

    /// Lists the full timeline of an item.
    async fn list_timeline(&self, item: IssueNumber) -> TrackerResult<Vec<TimelineEvent>>;

    /// Fetches current detail for a change request.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::NotFound`] when the change request was
    /// deleted.
    async fn get_change_request(&self, number: PullRequestNumber)
    -> TrackerResult<ChangeRequest>;

    /// Text-searches change requests whose body mentions `item`.
    ///
    /// Results are candidates only; callers confirm them by parsing bodies.
    async fn search_change_request_mentions(
        &self,
        item: IssueNumber,
    ) -> TrackerResult<Vec<ChangeRequestMention>>;
}

/// Errors returned by tracker implementations.
#[derive(Debug, Clone, Error)]
pub enum TrackerError {
    /// The addressed resource does not exist (or no longer exists).
    #[error("not found: {0}")]
    NotFound(String),

    /// Network failure, server error or rate limit. Safe to retry on a
    /// later run.
    #[error("transient tracker failure: {0}")]
    Transient(Arc<dyn std::error::Error + Send + Sync>),

    /// The tracker refused the request.
    #[error("tracker rejected request with status {status}: {message}")]
    Rejected {
        /// HTTP-style status code.
        status: u16,
        /// Response detail.
        message: String,
    },

    /// The tracker answered with a payload that could not be interpreted.
    #[error("invalid tracker response: {0}")]
    InvalidResponse(String),
}

impl TrackerError {
    /// Wraps a transient failure.
    pub fn transient(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transient(Arc::new(err))
    }

    /// Returns `true` for [`TrackerError::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
