//! Domain model for the external issue tracker.
//!
//! These types describe what the reconciler can observe on the tracker:
//! work items with their labels and assignees, comments, change requests,
//! and the timeline that links them. They carry no infrastructure concerns.

mod change_request;
mod comment;
mod error;
mod ids;
mod references;
mod timeline;
mod work_item;

pub use change_request::{ChangeRequest, ChangeRequestMention, ChangeRequestState};
pub use comment::IssueComment;
pub use error::TrackerDomainError;
pub use ids::{CommentId, IssueNumber, Login, PullRequestNumber, RepositoryFullName};
pub use references::extract_issue_references;
pub use timeline::{CrossReferenceSource, TimelineEvent, claimed_at};
pub use work_item::{ItemState, WorkItem};
