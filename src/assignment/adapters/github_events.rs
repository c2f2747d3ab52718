//! Turns GitHub webhook deliveries into [`Trigger`]s.

use crate::assignment::domain::{
    ActorKind, ChangeRequestAction, ChangeRequestEvent, CommentEvent, Trigger,
};
use crate::assignment::services::{ReconcileError, ReconcileResult};
use crate::tracker::adapters::github::models::GitHubPullRequest;
use crate::tracker::domain::{CommentId, IssueNumber, Login, RepositoryFullName};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct Sender {
    login: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentedIssue {
    number: u64,
    #[serde(default)]
    pull_request: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Comment {
    id: u64,
    #[serde(default)]
    body: Option<String>,
    user: Sender,
}

#[derive(Debug, Deserialize)]
struct IssueCommentPayload {
    action: String,
    issue: CommentedIssue,
    comment: Comment,
}

#[derive(Debug, Deserialize)]
struct PullRequestPayload {
    action: String,
    pull_request: GitHubPullRequest,
}

/// Parses a webhook delivery named `event_name`.
///
/// Returns `Ok(None)` for events and actions the reconciler does not react
/// to. `repository` is used when the payload's base repository is absent.
///
/// # Errors
///
/// Returns [`ReconcileError::Validation`] when a handled event is missing
/// required fields or carries invalid values.
pub fn parse_webhook(
    event_name: &str,
    payload: &Value,
    repository: &RepositoryFullName,
) -> ReconcileResult<Option<Trigger>> {
    match event_name {
        "issue_comment" => parse_issue_comment(payload),
        "pull_request" | "pull_request_target" => parse_pull_request(payload, repository),
        "schedule" | "workflow_dispatch" => Ok(Some(Trigger::ScheduledSweep)),
        other => {
            debug!(event = other, "webhook event ignored");
            Ok(None)
        }
    }
}

fn decode<P: DeserializeOwned>(event_name: &str, payload: &Value) -> ReconcileResult<P> {
    P::deserialize(payload)
        .map_err(|err| ReconcileError::Validation(format!("{event_name} payload: {err}")))
}

fn parse_issue_comment(payload: &Value) -> ReconcileResult<Option<Trigger>> {
    let delivery: IssueCommentPayload = decode("issue_comment", payload)?;
    if delivery.action != "created" {
        debug!(action = %delivery.action, "comment action ignored");
        return Ok(None);
    }
    let item = IssueNumber::new(delivery.issue.number)
        .map_err(|err| ReconcileError::Validation(err.to_string()))?;
    let actor = Login::new(delivery.comment.user.login)
        .map_err(|err| ReconcileError::Validation(err.to_string()))?;
    let actor_kind = delivery
        .comment
        .user
        .kind
        .as_deref()
        .map_or(ActorKind::Human, ActorKind::from_account_type);
    Ok(Some(Trigger::CommentEvent(CommentEvent {
        item,
        comment_id: CommentId::new(delivery.comment.id),
        actor,
        actor_kind,
        text: delivery.comment.body.unwrap_or_default(),
        on_change_request: delivery.issue.pull_request.is_some(),
    })))
}

fn parse_pull_request(
    payload: &Value,
    repository: &RepositoryFullName,
) -> ReconcileResult<Option<Trigger>> {
    let delivery: PullRequestPayload = decode("pull_request", payload)?;
    let action = match delivery.action.as_str() {
        "opened" => ChangeRequestAction::Opened,
        "reopened" => ChangeRequestAction::Reopened,
        "closed" => ChangeRequestAction::Closed,
        other => {
            debug!(action = other, "change request action ignored");
            return Ok(None);
        }
    };
    let change_request = delivery
        .pull_request
        .into_domain(repository)
        .map_err(|err| ReconcileError::Validation(err.to_string()))?;
    Ok(Some(Trigger::ChangeRequestEvent(ChangeRequestEvent {
        action,
        change_request,
    })))
}
