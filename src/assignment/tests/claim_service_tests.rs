//! Claim and release commands through the reconciler.

use super::support::{Harness, default_config, harness, login};
use crate::assignment::domain::{ActorKind, CommentEvent, Outcome, Trigger};
use crate::assignment::services::ItemAction;
use crate::tracker::adapters::memory::TrackerOperation;
use crate::tracker::domain::CommentId;
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn claim_assigns_labels_and_acknowledges(harness: Harness) {
    let issue = harness.seed(1);

    let report = harness.run(harness.comment(issue, "alice", "/assign")).await;

    assert_eq!(
        report.action_for(issue),
        Some(&ItemAction::Applied(Outcome::Assigned {
            claimant: login("alice")
        }))
    );
    let stored = harness.work_item(issue);
    assert_eq!(stored.assignees(), [login("alice")].as_slice());
    assert!(stored.has_label("assigned"));
    assert_eq!(
        harness.bot_comments_containing(issue, "You have 24 hours to open a pull request"),
        1
    );
    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent.iter().all(|message| message.text().contains("@alice claimed")));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn claim_release_claim_ends_with_one_claim_and_one_notice_per_step(harness: Harness) {
    let issue = harness.seed(1);

    let first_claim = harness.comment(issue, "alice", "I'd like to work on this");
    harness.run(first_claim.clone()).await;
    harness.run(harness.comment(issue, "alice", "/unassign")).await;
    harness.run(harness.comment(issue, "alice", "/assign")).await;
    let notices_before_redelivery = harness.bot_comments_containing(issue, "claimwarden:notice");

    let redelivered = harness.run(first_claim).await;

    let stored = harness.work_item(issue);
    assert_eq!(stored.assignees(), [login("alice")].as_slice());
    assert!(stored.has_label("assigned"));
    assert_eq!(notices_before_redelivery, 3);
    assert_eq!(
        harness.bot_comments_containing(issue, "claimwarden:notice"),
        notices_before_redelivery
    );
    assert_eq!(
        redelivered.action_for(issue),
        Some(&ItemAction::Applied(Outcome::AlreadyClaimed {
            actor: login("alice")
        }))
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn releasing_twice_posts_one_unassignment_notice(harness: Harness) {
    let issue = harness.seed(1);
    harness.run(harness.comment(issue, "alice", "/assign")).await;

    harness.run(harness.comment(issue, "alice", "/unassign")).await;
    let mutations_after_first = harness.tracker.mutations().expect("readable").len();
    let second = harness.run(harness.comment(issue, "alice", "/unassign")).await;

    assert_eq!(second.action_for(issue), Some(&ItemAction::NoAction));
    assert_eq!(
        harness.tracker.mutations().expect("readable").len(),
        mutations_after_first
    );
    assert_eq!(
        harness.bot_comments_containing(issue, "you have been unassigned"),
        1
    );
    let stored = harness.work_item(issue);
    assert!(stored.assignees().is_empty());
    assert!(!stored.has_label("assigned"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn release_by_someone_else_is_denied(harness: Harness) {
    let issue = harness.seed_with(1, &["alice"], &["assigned"]);

    let report = harness.run(harness.comment(issue, "bob", "/unassign")).await;

    assert_eq!(
        report.action_for(issue),
        Some(&ItemAction::Applied(Outcome::ReleaseDenied {
            actor: login("bob"),
            claimant: login("alice"),
        }))
    );
    assert_eq!(harness.work_item(issue).assignees(), [login("alice")].as_slice());
    assert_eq!(
        harness.bot_comments_containing(issue, "only the current assignee (@alice)"),
        1
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn competing_claim_without_linked_work_is_refused(harness: Harness) {
    let issue = harness.seed_with(1, &["alice"], &["assigned"]);

    let report = harness.run(harness.comment(issue, "bob", "/assign")).await;

    assert_eq!(
        report.action_for(issue),
        Some(&ItemAction::Applied(Outcome::ClaimedByOther {
            actor: login("bob"),
            claimant: login("alice"),
        }))
    );
    assert_eq!(harness.work_item(issue).assignees(), [login("alice")].as_slice());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn claim_limit_lists_blocking_items() {
    let harness = Harness::with_config(default_config().with_claim_limit(1));
    let held = harness.seed_with(3, &["alice"], &["assigned"]);
    let issue = harness.seed(4);

    let report = harness.run(harness.comment(issue, "alice", "/assign")).await;

    assert_eq!(
        report.action_for(issue),
        Some(&ItemAction::Applied(Outcome::ClaimLimitReached {
            actor: login("alice"),
            blocking_items: vec![held],
        }))
    );
    assert!(harness.work_item(issue).assignees().is_empty());
    assert_eq!(harness.bot_comments_containing(issue, "#3"), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn bot_and_change_request_comments_are_ignored(harness: Harness) {
    let issue = harness.seed(1);
    let bot = Trigger::CommentEvent(CommentEvent {
        item: issue,
        comment_id: CommentId::new(900),
        actor: login("ci[bot]"),
        actor_kind: ActorKind::Bot,
        text: "/assign".to_owned(),
        on_change_request: false,
    });
    let on_change_request = Trigger::CommentEvent(CommentEvent {
        item: issue,
        comment_id: CommentId::new(901),
        actor: login("alice"),
        actor_kind: ActorKind::Human,
        text: "/assign".to_owned(),
        on_change_request: true,
    });

    harness.run(bot).await;
    harness.run(on_change_request).await;

    assert!(harness.work_item(issue).assignees().is_empty());
    assert!(harness.tracker.mutations().expect("readable").is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn orphaned_claim_label_is_healed_before_claiming(harness: Harness) {
    let issue = harness.seed_with(1, &[], &["assigned"]);

    harness.run(harness.comment(issue, "alice", "/assign")).await;

    let stored = harness.work_item(issue);
    assert_eq!(stored.assignees(), [login("alice")].as_slice());
    assert!(stored.has_label("assigned"));
    let removals = harness
        .tracker
        .mutations()
        .expect("readable")
        .into_iter()
        .filter(|mutation| mutation.operation == TrackerOperation::RemoveLabel)
        .count();
    assert_eq!(removals, 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_assignment_is_reported_once_and_retry_succeeds(harness: Harness) {
    let issue = harness.seed(1);
    harness
        .tracker
        .fail_next(
            TrackerOperation::AddAssignees,
            crate::tracker::ports::TrackerError::transient(std::io::Error::other("502")),
        )
        .expect("inject failure");
    let trigger = harness.comment(issue, "alice", "/assign");

    let report = harness.run(trigger.clone()).await;

    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert!(failures.iter().all(|(_, err)| err.is_deferrable()));
    assert_eq!(
        harness.bot_comments_containing(issue, "could not be completed right now"),
        1
    );

    let redelivered = harness.run(trigger).await;

    assert!(matches!(
        redelivered.action_for(issue),
        Some(ItemAction::Applied(Outcome::Assigned { .. }))
    ));
    assert_eq!(harness.work_item(issue).assignees(), [login("alice")].as_slice());
    assert_eq!(
        harness.bot_comments_containing(issue, "could not be completed right now"),
        1
    );
    assert_eq!(
        harness.bot_comments_containing(issue, "You have 24 hours to open a pull request"),
        1
    );
}
