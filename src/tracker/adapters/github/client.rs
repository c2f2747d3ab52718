//! GitHub REST v3 implementation of the [`IssueTracker`] port.
//!
//! Every call is attempted once. Failures are classified into the
//! [`TrackerError`] taxonomy and left to the caller, which defers the item
//! to the next run instead of retrying in place.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::models::{
    AssigneesPayload, CommentPayload, GitHubComment, GitHubIssue, GitHubPullRequest,
    GitHubSearchResponse, GitHubTimelineEvent, LabelsPayload,
};
use crate::tracker::{
    domain::{
        ChangeRequest, ChangeRequestMention, CommentId, IssueComment, IssueNumber, Login,
        PullRequestNumber, RepositoryFullName, TimelineEvent, TrackerDomainError, WorkItem,
    },
    ports::{IssueTracker, TrackerError, TrackerResult},
};

const PAGE_SIZE: usize = 100;
const DEFAULT_API_BASE: &str = "https://api.github.com";
const MAX_ERROR_BODY_CHARS: usize = 400;

/// Connection settings for [`GitHubIssueTracker`].
#[derive(Debug, Clone)]
pub struct GitHubTrackerConfig {
    api_base: String,
    token: String,
    repository: RepositoryFullName,
    request_timeout: Duration,
}

impl GitHubTrackerConfig {
    /// Creates settings for `repository` against the public API.
    #[must_use]
    pub fn new(repository: RepositoryFullName, token: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_owned(),
            token: token.into(),
            repository,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Overrides the API base URL (GitHub Enterprise).
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Overrides the per-request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Errors raised while building the GitHub client.
#[derive(Debug, Error)]
pub enum GitHubSetupError {
    /// The token cannot be sent as an HTTP header.
    #[error("github token is empty or not a valid header value")]
    InvalidToken,
    /// The API base is not an absolute URL.
    #[error("invalid github api base '{0}'")]
    InvalidApiBase(String),
    /// The HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Issue tracker backed by the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubIssueTracker {
    http: Client,
    api_base: Url,
    repository: RepositoryFullName,
}

impl GitHubIssueTracker {
    /// Builds a client with bearer authentication.
    ///
    /// # Errors
    ///
    /// Returns [`GitHubSetupError`] when the token or base URL is unusable.
    pub fn new(config: GitHubTrackerConfig) -> Result<Self, GitHubSetupError> {
        let token = config.token.trim();
        if token.is_empty() {
            return Err(GitHubSetupError::InvalidToken);
        }
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("claimwarden"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| GitHubSetupError::InvalidToken)?,
        );

        let api_base = Url::parse(config.api_base.trim_end_matches('/'))
            .map_err(|_| GitHubSetupError::InvalidApiBase(config.api_base.clone()))?;
        if api_base.cannot_be_a_base() {
            return Err(GitHubSetupError::InvalidApiBase(config.api_base));
        }

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            api_base,
            repository: config.repository,
        })
    }

    fn url(&self, segments: &[&str]) -> TrackerResult<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| TrackerError::InvalidResponse("api base cannot carry a path".to_owned()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn repo_url(&self, segments: &[&str]) -> TrackerResult<Url> {
        let mut all = vec![
            "repos",
            self.repository.owner(),
            self.repository.name(),
        ];
        all.extend_from_slice(segments);
        self.url(&all)
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> TrackerResult<Response> {
        let response = request.send().await.map_err(TrackerError::transient)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!(operation, status = status.as_u16(), "github request failed");
        Err(classify_failure(operation, status.as_u16(), &body))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> TrackerResult<T> {
        self.send(operation, request)
            .await?
            .json::<T>()
            .await
            .map_err(|err| TrackerError::InvalidResponse(format!("{operation}: {err}")))
    }

    async fn paginate<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: Url,
        query: &[(&str, &str)],
    ) -> TrackerResult<Vec<T>> {
        let mut rows = Vec::new();
        let mut page = 1_u32;
        let per_page = PAGE_SIZE.to_string();
        loop {
            let page_value = page.to_string();
            let request = self
                .http
                .get(url.clone())
                .query(query)
                .query(&[("per_page", per_page.as_str()), ("page", page_value.as_str())]);
            let chunk: Vec<T> = self.send_json(operation, request).await?;
            let chunk_len = chunk.len();
            rows.extend(chunk);
            if chunk_len < PAGE_SIZE {
                return Ok(rows);
            }
            page = page.saturating_add(1);
        }
    }

    async fn list_issues(&self, query: &[(&str, &str)]) -> TrackerResult<Vec<WorkItem>> {
        let url = self.repo_url(&["issues"])?;
        let issues: Vec<GitHubIssue> = self.paginate("list issues", url, query).await?;
        issues
            .into_iter()
            .filter(|issue| !issue.is_pull_request())
            .map(|issue| WorkItem::try_from(issue).map_err(invalid_response))
            .collect()
    }
}

fn invalid_response(err: TrackerDomainError) -> TrackerError {
    TrackerError::InvalidResponse(err.to_string())
}

fn truncate_for_error(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

/// Maps a non-success HTTP status onto the tracker error taxonomy.
pub(crate) fn classify_failure(operation: &str, status: u16, body: &str) -> TrackerError {
    let detail = format!("github {operation} returned {status}");
    match status {
        404 | 410 => TrackerError::NotFound(detail),
        429 | 500..=599 => TrackerError::transient(std::io::Error::other(detail)),
        403 if body.to_ascii_lowercase().contains("rate limit") => {
            TrackerError::transient(std::io::Error::other(detail))
        }
        _ => TrackerError::Rejected {
            status,
            message: truncate_for_error(body),
        },
    }
}

fn ignore_not_found(result: TrackerResult<Response>) -> TrackerResult<()> {
    match result {
        Ok(_) => Ok(()),
        Err(err) if err.is_not_found() => Ok(()),
        Err(err) => Err(err),
    }
}

fn login_strs(logins: &[Login]) -> Vec<&str> {
    logins.iter().map(Login::as_str).collect()
}

#[async_trait]
impl IssueTracker for GitHubIssueTracker {
    async fn get_item(&self, item: IssueNumber) -> TrackerResult<WorkItem> {
        let url = self.repo_url(&["issues", &item.to_string()])?;
        let issue: GitHubIssue = self.send_json("get issue", self.http.get(url)).await?;
        WorkItem::try_from(issue).map_err(invalid_response)
    }

    async fn list_open_items(&self) -> TrackerResult<Vec<WorkItem>> {
        self.list_issues(&[("state", "open")]).await
    }

    async fn list_open_items_assigned_to(&self, login: &Login) -> TrackerResult<Vec<WorkItem>> {
        self.list_issues(&[("state", "open"), ("assignee", login.as_str())])
            .await
    }

    async fn add_assignees(&self, item: IssueNumber, logins: &[Login]) -> TrackerResult<()> {
        let url = self.repo_url(&["issues", &item.to_string(), "assignees"])?;
        let payload = AssigneesPayload {
            assignees: login_strs(logins),
        };
        self.send("add assignees", self.http.post(url).json(&payload))
            .await
            .map(drop)
    }

    async fn remove_assignees(&self, item: IssueNumber, logins: &[Login]) -> TrackerResult<()> {
        let url = self.repo_url(&["issues", &item.to_string(), "assignees"])?;
        let payload = AssigneesPayload {
            assignees: login_strs(logins),
        };
        self.send("remove assignees", self.http.delete(url).json(&payload))
            .await
            .map(drop)
    }

    async fn add_label(&self, item: IssueNumber, label: &str) -> TrackerResult<()> {
        let url = self.repo_url(&["issues", &item.to_string(), "labels"])?;
        let payload = LabelsPayload { labels: [label] };
        self.send("add label", self.http.post(url).json(&payload))
            .await
            .map(drop)
    }

    async fn remove_label(&self, item: IssueNumber, label: &str) -> TrackerResult<()> {
        let url = self.repo_url(&["issues", &item.to_string(), "labels", label])?;
        ignore_not_found(self.send("remove label", self.http.delete(url)).await)
    }

    async fn list_comments(&self, item: IssueNumber) -> TrackerResult<Vec<IssueComment>> {
        let url = self.repo_url(&["issues", &item.to_string(), "comments"])?;
        let comments: Vec<GitHubComment> = self.paginate("list comments", url, &[]).await?;
        comments
            .into_iter()
            .map(|comment| IssueComment::try_from(comment).map_err(invalid_response))
            .collect()
    }

    async fn create_comment(&self, item: IssueNumber, body: &str) -> TrackerResult<IssueComment> {
        let url = self.repo_url(&["issues", &item.to_string(), "comments"])?;
        let created: GitHubComment = self
            .send_json(
                "create comment",
                self.http.post(url).json(&CommentPayload { body }),
            )
            .await?;
        IssueComment::try_from(created).map_err(invalid_response)
    }

    async fn update_comment(&self, comment: CommentId, body: &str) -> TrackerResult<()> {
        let url = self.repo_url(&["issues", "comments", &comment.to_string()])?;
        self.send(
            "update comment",
            self.http.patch(url).json(&CommentPayload { body }),
        )
        .await
        .map(drop)
    }

    async fn delete_comment(&self, comment: CommentId) -> TrackerResult<()> {
        let url = self.repo_url(&["issues", "comments", &comment.to_string()])?;
        ignore_not_found(self.send("delete comment", self.http.delete(url)).await)
    }

    async fn list_timeline(&self, item: IssueNumber) -> TrackerResult<Vec<TimelineEvent>> {
        let url = self.repo_url(&["issues", &item.to_string(), "timeline"])?;
        let events: Vec<GitHubTimelineEvent> = self.paginate("list timeline", url, &[]).await?;
        Ok(events.into_iter().map(TimelineEvent::from).collect())
    }

    async fn get_change_request(
        &self,
        number: PullRequestNumber,
    ) -> TrackerResult<ChangeRequest> {
        let url = self.repo_url(&["pulls", &number.to_string()])?;
        let pull: GitHubPullRequest = self.send_json("get pull request", self.http.get(url)).await?;
        pull.into_domain(&self.repository).map_err(invalid_response)
    }

    async fn search_change_request_mentions(
        &self,
        item: IssueNumber,
    ) -> TrackerResult<Vec<ChangeRequestMention>> {
        let url = self.url(&["search", "issues"])?;
        let query = format!("repo:{} type:pr {item} in:body", self.repository);
        let per_page = PAGE_SIZE.to_string();
        let request = self
            .http
            .get(url)
            .query(&[("q", query.as_str()), ("per_page", per_page.as_str())]);
        let response: GitHubSearchResponse = self.send_json("search pull requests", request).await?;
        Ok(response.into_mentions())
    }
}
