//! Webhook payload parsing.

use super::support::{item, login, pr, repo};
use crate::assignment::adapters::parse_webhook;
use crate::assignment::domain::{ActorKind, ChangeRequestAction, Trigger};
use crate::assignment::services::ReconcileError;
use crate::tracker::domain::{ChangeRequestState, CommentId};
use eyre::{Result, bail, ensure};
use rstest::rstest;
use serde_json::{Value, json};

fn comment_payload(action: &str, user_type: &str, on_pull_request: bool) -> Value {
    let mut issue = json!({ "number": 7 });
    if on_pull_request {
        issue["pull_request"] = json!({ "url": "https://api.github.com/repos/octo/widgets/pulls/7" });
    }
    json!({
        "action": action,
        "issue": issue,
        "comment": {
            "id": 4242,
            "body": "/assign",
            "user": { "login": "alice", "type": user_type }
        }
    })
}

fn pull_request_payload(action: &str, state: &str, merged: bool) -> Value {
    let closed_at = (state == "closed").then_some("2025-03-02T09:00:00Z");
    let merged_at = merged.then_some("2025-03-02T09:00:00Z");
    json!({
        "action": action,
        "pull_request": {
            "number": 10,
            "state": state,
            "user": { "login": "alice" },
            "body": "Fixes #7",
            "created_at": "2025-03-01T09:00:00Z",
            "closed_at": closed_at,
            "merged_at": merged_at,
            "base": { "repo": { "full_name": "octo/widgets" } }
        }
    })
}

#[rstest]
#[case("User", false, ActorKind::Human)]
#[case("Bot", false, ActorKind::Bot)]
#[case("User", true, ActorKind::Human)]
fn created_comments_become_comment_events(
    #[case] user_type: &str,
    #[case] on_pull_request: bool,
    #[case] expected_kind: ActorKind,
) -> Result<()> {
    let payload = comment_payload("created", user_type, on_pull_request);

    let Some(Trigger::CommentEvent(event)) = parse_webhook("issue_comment", &payload, &repo())?
    else {
        bail!("expected a comment event");
    };

    ensure!(event.item == item(7));
    ensure!(event.comment_id == CommentId::new(4242));
    ensure!(event.actor == login("alice"));
    ensure!(event.actor_kind == expected_kind);
    ensure!(event.text == "/assign");
    ensure!(event.on_change_request == on_pull_request);
    Ok(())
}

#[rstest]
#[case("edited")]
#[case("deleted")]
fn other_comment_actions_are_ignored(#[case] action: &str) -> Result<()> {
    let payload = comment_payload(action, "User", false);
    ensure!(parse_webhook("issue_comment", &payload, &repo())?.is_none());
    Ok(())
}

#[rstest]
fn comment_payload_without_comment_is_rejected() {
    let payload = json!({ "action": "created", "issue": { "number": 7 } });

    let result = parse_webhook("issue_comment", &payload, &repo());

    assert!(matches!(
        result,
        Err(ReconcileError::Validation(message)) if message.starts_with("issue_comment payload")
    ));
}

#[rstest]
#[case("opened", "open", false, ChangeRequestAction::Opened, ChangeRequestState::Open)]
#[case("reopened", "open", false, ChangeRequestAction::Reopened, ChangeRequestState::Open)]
#[case("closed", "closed", false, ChangeRequestAction::Closed, ChangeRequestState::Closed)]
#[case("closed", "closed", true, ChangeRequestAction::Closed, ChangeRequestState::Merged)]
fn pull_request_lifecycle_becomes_change_request_events(
    #[case] action: &str,
    #[case] state: &str,
    #[case] merged: bool,
    #[case] expected_action: ChangeRequestAction,
    #[case] expected_state: ChangeRequestState,
) -> Result<()> {
    let payload = pull_request_payload(action, state, merged);

    let Some(Trigger::ChangeRequestEvent(event)) =
        parse_webhook("pull_request_target", &payload, &repo())?
    else {
        bail!("expected a change request event");
    };

    ensure!(event.action == expected_action);
    ensure!(event.change_request.number() == pr(10));
    ensure!(event.change_request.state() == expected_state);
    ensure!(event.change_request.referenced_items(&repo()).contains(&item(7)));
    Ok(())
}

#[rstest]
fn synchronize_is_ignored() -> Result<()> {
    let payload = pull_request_payload("synchronize", "open", false);
    ensure!(parse_webhook("pull_request", &payload, &repo())?.is_none());
    Ok(())
}

#[rstest]
#[case("schedule")]
#[case("workflow_dispatch")]
fn scheduled_runs_trigger_a_sweep(#[case] event_name: &str) -> Result<()> {
    let trigger = parse_webhook(event_name, &json!({}), &repo())?;
    ensure!(trigger == Some(Trigger::ScheduledSweep));
    Ok(())
}

#[rstest]
fn unknown_events_are_ignored() -> Result<()> {
    ensure!(parse_webhook("star", &json!({ "action": "created" }), &repo())?.is_none());
    Ok(())
}
