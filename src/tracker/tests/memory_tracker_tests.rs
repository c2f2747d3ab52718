//! Behaviour tests for the in-memory tracker adapter.

use std::sync::Arc;

use crate::tracker::{
    adapters::memory::{InMemoryIssueTracker, ManualClock, TrackerOperation},
    domain::{
        ChangeRequest, IssueNumber, Login, PullRequestNumber, RepositoryFullName, TimelineEvent,
        WorkItem,
    },
    ports::{IssueTracker, TrackerError},
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use eyre::{Result, ensure};
use rstest::{fixture, rstest};

struct Harness {
    clock: Arc<ManualClock>,
    tracker: InMemoryIssueTracker<ManualClock>,
    item: IssueNumber,
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

#[fixture]
fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new(start()));
    let tracker = InMemoryIssueTracker::new(
        Arc::clone(&clock),
        Login::new("claimwarden[bot]").expect("valid login"),
    );
    let item = IssueNumber::new(1).expect("valid number");
    tracker
        .insert_item(WorkItem::new(item, start()))
        .expect("seed item");
    Harness {
        clock,
        tracker,
        item,
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn label_mutations_are_idempotent(harness: Harness) -> Result<()> {
    let Harness { tracker, item, .. } = harness;
    tracker.add_label(item, "assigned").await?;
    tracker.add_label(item, "assigned").await?;
    tracker.remove_label(item, "pending-unassignment").await?;

    let stored = tracker.get_item(item).await?;
    ensure!(stored.labels().len() == 1);
    ensure!(stored.has_label("assigned"));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn assignment_records_timeline_at_clock_time(harness: Harness) -> Result<()> {
    let Harness {
        clock,
        tracker,
        item,
    } = harness;
    let alice = Login::new("alice")?;
    clock.advance(Duration::hours(2));
    tracker
        .add_assignees(item, std::slice::from_ref(&alice))
        .await?;
    tracker
        .add_assignees(item, std::slice::from_ref(&alice))
        .await?;

    let timeline = tracker.list_timeline(item).await?;
    ensure!(
        timeline
            == vec![TimelineEvent::Assigned {
                assignee: alice,
                created_at: start() + Duration::hours(2),
            }]
    );
    ensure!(tracker.get_item(item).await?.updated_at() == start() + Duration::hours(2));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn injected_failures_are_consumed_in_order(harness: Harness) -> Result<()> {
    let Harness { tracker, item, .. } = harness;
    tracker.fail_next(
        TrackerOperation::AddLabel,
        TrackerError::transient(std::io::Error::other("rate limited")),
    )?;

    let first = tracker.add_label(item, "assigned").await;
    ensure!(matches!(first, Err(TrackerError::Transient(_))));
    tracker.add_label(item, "assigned").await?;
    ensure!(tracker.mutations()?.len() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn comments_are_authored_by_the_bot_and_deletion_is_idempotent(
    harness: Harness,
) -> Result<()> {
    let Harness { tracker, item, .. } = harness;
    let comment = tracker.create_comment(item, "hello").await?;
    ensure!(comment.author.as_str() == "claimwarden[bot]");

    tracker.update_comment(comment.id, "edited").await?;
    ensure!(tracker.comments(item)?.first().map(|c| c.body.as_str()) == Some("edited"));

    tracker.delete_comment(comment.id).await?;
    tracker.delete_comment(comment.id).await?;
    ensure!(tracker.comments(item)?.is_empty());
    ensure!(tracker.update_comment(comment.id, "gone").await.is_err());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn missing_items_and_change_requests_are_not_found(harness: Harness) -> Result<()> {
    let Harness { tracker, .. } = harness;
    let absent = IssueNumber::new(404)?;
    ensure!(tracker.get_item(absent).await.is_err_and(|err| err.is_not_found()));
    ensure!(
        tracker
            .get_change_request(PullRequestNumber::new(9)?)
            .await
            .is_err_and(|err| err.is_not_found())
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn search_returns_change_requests_mentioning_the_item(harness: Harness) -> Result<()> {
    let Harness { tracker, item, .. } = harness;
    let repository = RepositoryFullName::new("acme/widgets")?;
    tracker.insert_change_request(
        ChangeRequest::new(PullRequestNumber::new(7)?, repository.clone(), Login::new("a")?, start())
            .with_body("Fixes #1"),
    )?;
    tracker.insert_change_request(
        ChangeRequest::new(PullRequestNumber::new(8)?, repository, Login::new("b")?, start())
            .with_body("Unrelated"),
    )?;

    let mentions = tracker.search_change_request_mentions(item).await?;
    ensure!(mentions.len() == 1);
    ensure!(mentions.first().map(|mention| mention.number.value()) == Some(7));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn assigned_listing_filters_by_login(harness: Harness) -> Result<()> {
    let Harness { tracker, item, .. } = harness;
    let alice = Login::new("alice")?;
    tracker.add_assignees(item, std::slice::from_ref(&alice)).await?;
    tracker.insert_item(WorkItem::new(IssueNumber::new(2)?, start()))?;

    let assigned = tracker.list_open_items_assigned_to(&alice).await?;
    ensure!(assigned.len() == 1);
    ensure!(tracker.list_open_items().await?.len() == 2);
    Ok(())
}
