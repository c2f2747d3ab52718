//! Takeover of abandoned claims, including compensation.

use super::support::{Harness, harness, login, pr, repo, start};
use crate::assignment::services::{ItemAction, TakeoverOutcome};
use crate::tracker::{
    adapters::memory::TrackerOperation, domain::ChangeRequest, domain::IssueNumber,
    ports::TrackerError,
};
use chrono::Duration;
use rstest::rstest;

/// Alice claims item 1 and opens change request #10, which then sits
/// untouched for 61 days.
async fn abandoned_claim(harness: &Harness) -> IssueNumber {
    let issue = harness.seed(1);
    harness.run(harness.comment(issue, "alice", "/assign")).await;
    harness.link(
        issue,
        ChangeRequest::new(pr(10), repo(), login("alice"), start()).with_body("Fixes #1"),
    );
    harness.clock.advance(Duration::days(61));
    issue
}

fn fail(harness: &Harness, operation: TrackerOperation) {
    harness
        .tracker
        .fail_next(
            operation,
            TrackerError::transient(std::io::Error::other("bad gateway")),
        )
        .expect("inject failure");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn abandoned_claim_moves_to_the_challenger(harness: Harness) {
    let issue = abandoned_claim(&harness).await;

    let report = harness.run(harness.comment(issue, "bob", "/assign")).await;

    assert_eq!(
        report.action_for(issue),
        Some(&ItemAction::Takeover(TakeoverOutcome::Completed))
    );
    let stored = harness.work_item(issue);
    assert_eq!(stored.assignees(), [login("bob")].as_slice());
    assert!(stored.has_label("assigned"));
    assert_eq!(harness.bot_comments_containing(issue, "has taken over"), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn recent_linked_work_blocks_takeover(harness: Harness) {
    let issue = harness.seed(1);
    harness.run(harness.comment(issue, "alice", "/assign")).await;
    harness.link(
        issue,
        ChangeRequest::new(pr(10), repo(), login("alice"), start()).with_body("Fixes #1"),
    );
    harness.clock.advance(Duration::days(59));

    harness.run(harness.comment(issue, "bob", "/assign")).await;

    assert_eq!(harness.work_item(issue).assignees(), [login("alice")].as_slice());
    assert_eq!(harness.bot_comments_containing(issue, "has taken over"), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_assignment_restores_the_incumbent(harness: Harness) {
    let issue = abandoned_claim(&harness).await;
    fail(&harness, TrackerOperation::AddAssignees);

    let report = harness.run(harness.comment(issue, "bob", "/assign")).await;

    assert!(matches!(
        report.action_for(issue),
        Some(ItemAction::Takeover(TakeoverOutcome::RolledBack { .. }))
    ));
    let stored = harness.work_item(issue);
    assert_eq!(stored.assignees(), [login("alice")].as_slice());
    assert!(stored.has_label("assigned"));
    assert_eq!(harness.bot_comments_containing(issue, "could not be completed"), 1);
    assert_eq!(harness.bot_comments_containing(issue, "has taken over"), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_compensation_asks_for_a_maintainer(harness: Harness) {
    let issue = abandoned_claim(&harness).await;
    fail(&harness, TrackerOperation::AddAssignees);
    fail(&harness, TrackerOperation::AddAssignees);

    let report = harness.run(harness.comment(issue, "bob", "/assign")).await;

    assert!(matches!(
        report.action_for(issue),
        Some(ItemAction::Takeover(TakeoverOutcome::ManualIntervention { .. }))
    ));
    assert_eq!(
        harness.bot_comments_containing(issue, "Manual intervention required"),
        1
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn challenger_at_claim_limit_is_ineligible(harness: Harness) {
    let issue = abandoned_claim(&harness).await;
    let held = harness.seed_with(5, &["bob"], &["assigned"]);

    let report = harness.run(harness.comment(issue, "bob", "/assign")).await;

    assert_eq!(
        report.action_for(issue),
        Some(&ItemAction::Takeover(TakeoverOutcome::Ineligible {
            blocking_items: vec![held],
        }))
    );
    assert_eq!(harness.work_item(issue).assignees(), [login("alice")].as_slice());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn every_compensation_runs_after_one_fails(harness: Harness) {
    let issue = abandoned_claim(&harness).await;
    fail(&harness, TrackerOperation::AddAssignees);
    fail(&harness, TrackerOperation::AddLabel);

    let report = harness.run(harness.comment(issue, "bob", "/assign")).await;

    assert!(matches!(
        report.action_for(issue),
        Some(ItemAction::Takeover(TakeoverOutcome::ManualIntervention { .. }))
    ));
    let stored = harness.work_item(issue);
    assert_eq!(stored.assignees(), [login("alice")].as_slice());
    assert!(!stored.has_label("assigned"));
    assert_eq!(
        harness.bot_comments_containing(issue, "Manual intervention required"),
        1
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_takeover_notice_undoes_the_swap(harness: Harness) {
    let issue = abandoned_claim(&harness).await;
    fail(&harness, TrackerOperation::CreateComment);

    let report = harness.run(harness.comment(issue, "bob", "/assign")).await;

    assert!(matches!(
        report.action_for(issue),
        Some(ItemAction::Takeover(TakeoverOutcome::RolledBack { .. }))
    ));
    let stored = harness.work_item(issue);
    assert_eq!(stored.assignees(), [login("alice")].as_slice());
    assert!(stored.has_label("assigned"));
    assert_eq!(harness.bot_comments_containing(issue, "has taken over"), 0);
    assert_eq!(harness.bot_comments_containing(issue, "could not be completed"), 1);
}
