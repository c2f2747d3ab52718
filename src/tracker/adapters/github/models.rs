//! GitHub REST wire types and their conversion into tracker domain values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tracker::domain::{
    ChangeRequest, ChangeRequestMention, CommentId, CrossReferenceSource, IssueComment,
    IssueNumber, ItemState, Login, PullRequestNumber, RepositoryFullName, TimelineEvent,
    TrackerDomainError, WorkItem,
};

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitHubUser {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitHubLabel {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitHubRepository {
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitHubIssue {
    pub number: u64,
    pub state: String,
    #[serde(default)]
    pub labels: Vec<GitHubLabel>,
    #[serde(default)]
    pub assignees: Vec<GitHubUser>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub pull_request: Option<Value>,
}

impl GitHubIssue {
    pub(crate) const fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

impl TryFrom<GitHubIssue> for WorkItem {
    type Error = TrackerDomainError;

    fn try_from(issue: GitHubIssue) -> Result<Self, Self::Error> {
        let assignees = issue
            .assignees
            .into_iter()
            .map(|user| Login::new(user.login))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(IssueNumber::new(issue.number)?, issue.created_at)
            .with_state(ItemState::try_from(issue.state.as_str())?)
            .with_labels(issue.labels.into_iter().map(|label| label.name))
            .with_assignees(assignees)
            .with_updated_at(issue.updated_at))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitHubComment {
    pub id: u64,
    pub user: GitHubUser,
    #[serde(default)]
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<GitHubComment> for IssueComment {
    type Error = TrackerDomainError;

    fn try_from(comment: GitHubComment) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CommentId::new(comment.id),
            author: Login::new(comment.user.login)?,
            body: comment.body.unwrap_or_default(),
            created_at: comment.created_at,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitHubBranch {
    pub repo: Option<GitHubRepository>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitHubPullRequest {
    pub number: u64,
    pub state: String,
    pub user: GitHubUser,
    #[serde(default)]
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    pub base: GitHubBranch,
}

impl GitHubPullRequest {
    /// Converts into a domain value, falling back to `repository` when the
    /// base repository was deleted.
    pub(crate) fn into_domain(
        self,
        repository: &RepositoryFullName,
    ) -> Result<ChangeRequest, TrackerDomainError> {
        let hosted_in = match self.base.repo {
            Some(repo) => RepositoryFullName::new(repo.full_name)?,
            None => repository.clone(),
        };
        let mut change_request = ChangeRequest::new(
            PullRequestNumber::new(self.number)?,
            hosted_in,
            Login::new(self.user.login)?,
            self.created_at,
        );
        if let Some(body) = self.body {
            change_request = change_request.with_body(body);
        }
        let closed = match self.state.as_str() {
            "open" => None,
            "closed" => Some(self.merged_at.or(self.closed_at).unwrap_or(self.created_at)),
            other => return Err(TrackerDomainError::UnknownChangeRequestState(other.to_owned())),
        };
        Ok(match closed {
            Some(closed_at) => change_request.closed(self.merged_at.is_some(), closed_at),
            None => change_request,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitHubSourceIssue {
    pub number: u64,
    #[serde(default)]
    pub pull_request: Option<Value>,
    #[serde(default)]
    pub repository: Option<GitHubRepository>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitHubTimelineSource {
    #[serde(default)]
    pub issue: Option<GitHubSourceIssue>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitHubTimelineEvent {
    pub event: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assignee: Option<GitHubUser>,
    #[serde(default)]
    pub source: Option<GitHubTimelineSource>,
}

impl From<GitHubTimelineEvent> for TimelineEvent {
    fn from(event: GitHubTimelineEvent) -> Self {
        let other = || Self::Other {
            name: event.event.clone(),
        };
        let Some(created_at) = event.created_at else {
            return other();
        };
        match event.event.as_str() {
            "cross-referenced" => event
                .source
                .as_ref()
                .and_then(|source| source.issue.as_ref())
                .and_then(|issue| {
                    Some(Self::CrossReferenced {
                        source: CrossReferenceSource {
                            number: issue.number,
                            repository: issue.repository.as_ref()?.full_name.clone(),
                            is_change_request: issue.pull_request.is_some(),
                        },
                        created_at,
                    })
                })
                .unwrap_or_else(other),
            "connected" => Self::Connected {
                change_request: None,
                created_at,
            },
            "assigned" | "unassigned" => {
                let Some(assignee) = event
                    .assignee
                    .as_ref()
                    .and_then(|user| Login::new(user.login.clone()).ok())
                else {
                    return other();
                };
                if event.event == "assigned" {
                    Self::Assigned {
                        assignee,
                        created_at,
                    }
                } else {
                    Self::Unassigned {
                        assignee,
                        created_at,
                    }
                }
            }
            _ => other(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitHubSearchItem {
    pub number: u64,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub pull_request: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitHubSearchResponse {
    #[serde(default)]
    pub items: Vec<GitHubSearchItem>,
}

impl GitHubSearchResponse {
    pub(crate) fn into_mentions(self) -> Vec<ChangeRequestMention> {
        self.items
            .into_iter()
            .filter(|item| item.pull_request.is_some())
            .filter_map(|item| {
                Some(ChangeRequestMention {
                    number: PullRequestNumber::new(item.number).ok()?,
                    body: item.body,
                })
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AssigneesPayload<'a> {
    pub assignees: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LabelsPayload<'a> {
    pub labels: [&'a str; 1],
}

#[derive(Debug, Serialize)]
pub(crate) struct CommentPayload<'a> {
    pub body: &'a str,
}
