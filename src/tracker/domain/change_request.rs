//! Change request (pull request) value objects.

use super::{
    IssueNumber, Login, PullRequestNumber, RepositoryFullName, TrackerDomainError,
    extract_issue_references,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Lifecycle state of a change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeRequestState {
    /// Open and under review.
    Open,
    /// Closed without merging.
    Closed,
    /// Merged into the target branch.
    Merged,
}

impl ChangeRequestState {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Merged => "merged",
        }
    }
}

impl TryFrom<&str> for ChangeRequestState {
    type Error = TrackerDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            "merged" => Ok(Self::Merged),
            _ => Err(TrackerDomainError::UnknownChangeRequestState(
                value.to_owned(),
            )),
        }
    }
}

/// A pull request proposing a fix, as fetched from the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    number: PullRequestNumber,
    repository: RepositoryFullName,
    state: ChangeRequestState,
    author: Login,
    body: Option<String>,
    created_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
}

impl ChangeRequest {
    /// Creates an open change request with no body.
    #[must_use]
    pub const fn new(
        number: PullRequestNumber,
        repository: RepositoryFullName,
        author: Login,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            number,
            repository,
            state: ChangeRequestState::Open,
            author,
            body: None,
            created_at,
            closed_at: None,
        }
    }

    /// Sets the body text.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        let value = body.into();
        self.body = (!value.trim().is_empty()).then_some(value);
        self
    }

    /// Marks the change request closed (merged or not) at `closed_at`.
    #[must_use]
    pub const fn closed(mut self, merged: bool, closed_at: DateTime<Utc>) -> Self {
        self.state = if merged {
            ChangeRequestState::Merged
        } else {
            ChangeRequestState::Closed
        };
        self.closed_at = Some(closed_at);
        self
    }

    /// Reopens the change request.
    #[must_use]
    pub const fn reopened(mut self) -> Self {
        self.state = ChangeRequestState::Open;
        self.closed_at = None;
        self
    }

    /// Returns the change request number.
    #[must_use]
    pub const fn number(&self) -> PullRequestNumber {
        self.number
    }

    /// Returns the repository hosting the change request.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryFullName {
        &self.repository
    }

    /// Returns the state.
    #[must_use]
    pub const fn state(&self) -> ChangeRequestState {
        self.state
    }

    /// Returns the author.
    #[must_use]
    pub const fn author(&self) -> &Login {
        &self.author
    }

    /// Returns the body, if any.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the close (or merge) timestamp.
    #[must_use]
    pub const fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    /// Returns `true` when the change request is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == ChangeRequestState::Open
    }

    /// Returns the items in `repository` this change request's body closes.
    #[must_use]
    pub fn referenced_items(&self, repository: &RepositoryFullName) -> BTreeSet<IssueNumber> {
        self.body
            .as_deref()
            .map(|body| extract_issue_references(body, repository))
            .unwrap_or_default()
    }
}

/// A change request surfaced by a text search, before detail is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRequestMention {
    /// Change request number.
    pub number: PullRequestNumber,
    /// Body text returned by the search, if any.
    pub body: Option<String>,
}
