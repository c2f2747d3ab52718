//! Comments posted on work items.

use super::{CommentId, Login};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A comment on a work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueComment {
    /// Tracker-assigned identifier.
    pub id: CommentId,
    /// Comment author.
    pub author: Login,
    /// Raw comment body.
    pub body: String,
    /// Creation timestamp as recorded by the tracker.
    pub created_at: DateTime<Utc>,
}

impl IssueComment {
    /// Returns `true` when the body contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.body.contains(needle)
    }
}
