//! Shared fixtures for reconciler service tests.

use std::sync::Arc;

use crate::assignment::domain::{
    ActorKind, ChangeRequestAction, ChangeRequestEvent, CommentEvent, Trigger,
};
use crate::assignment::services::{ReconcileReport, Reconciler};
use crate::config::ReconcilerConfig;
use crate::notify::memory::RecordingNotifier;
use crate::tracker::{
    adapters::memory::{InMemoryIssueTracker, ManualClock},
    domain::{
        ChangeRequest, CrossReferenceSource, IssueComment, IssueNumber, Login, PullRequestNumber,
        RepositoryFullName, TimelineEvent, WorkItem,
    },
};
use chrono::{DateTime, TimeZone, Utc};
use mockable::Clock;
use rstest::fixture;

pub(super) type Tracker = InMemoryIssueTracker<ManualClock>;

pub(super) const REPO: &str = "octo/widgets";

pub(super) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn login(name: &str) -> Login {
    Login::new(name).expect("valid login")
}

pub(super) fn item(number: u64) -> IssueNumber {
    IssueNumber::new(number).expect("valid item number")
}

pub(super) fn pr(number: u64) -> PullRequestNumber {
    PullRequestNumber::new(number).expect("valid change request number")
}

pub(super) fn repo() -> RepositoryFullName {
    RepositoryFullName::new(REPO).expect("valid repository")
}

pub(super) struct Harness {
    pub clock: Arc<ManualClock>,
    pub tracker: Arc<Tracker>,
    pub notifier: RecordingNotifier,
    pub reconciler: Reconciler<Tracker, ManualClock>,
}

impl Harness {
    pub fn with_config(config: ReconcilerConfig) -> Self {
        let clock = Arc::new(ManualClock::new(start()));
        let tracker = Arc::new(InMemoryIssueTracker::new(
            Arc::clone(&clock),
            login("claimwarden[bot]"),
        ));
        let notifier = RecordingNotifier::new();
        let reconciler = Reconciler::new(
            Arc::clone(&tracker),
            Arc::clone(&clock),
            Arc::new(config),
            Arc::new(notifier.clone()),
        );
        Self {
            clock,
            tracker,
            notifier,
            reconciler,
        }
    }

    pub fn seed(&self, number: u64) -> IssueNumber {
        let seeded = item(number);
        self.tracker
            .insert_item(WorkItem::new(seeded, start()))
            .expect("seed item");
        seeded
    }

    pub fn seed_with(&self, number: u64, assignees: &[&str], labels: &[&str]) -> IssueNumber {
        let seeded = item(number);
        let work_item = WorkItem::new(seeded, start())
            .with_assignees(assignees.iter().map(|name| login(name)))
            .with_labels(labels.iter().copied());
        self.tracker.insert_item(work_item).expect("seed item");
        seeded
    }

    /// Posts a human comment on `target` and returns the trigger for it.
    pub fn comment(&self, target: IssueNumber, actor: &str, text: &str) -> Trigger {
        let comment_id = self
            .tracker
            .insert_comment(target, login(actor), text, self.clock.utc())
            .expect("seed comment");
        Trigger::CommentEvent(CommentEvent {
            item: target,
            comment_id,
            actor: login(actor),
            actor_kind: ActorKind::Human,
            text: text.to_owned(),
            on_change_request: false,
        })
    }

    pub async fn run(&self, trigger: Trigger) -> ReconcileReport {
        self.reconciler
            .reconcile(trigger)
            .await
            .expect("trigger reconciles")
    }

    /// Stores `change_request` and links it to `target` on the timeline.
    pub fn link(&self, target: IssueNumber, change_request: ChangeRequest) {
        self.tracker
            .record_event(
                target,
                TimelineEvent::CrossReferenced {
                    source: CrossReferenceSource {
                        number: change_request.number().value(),
                        repository: REPO.to_owned(),
                        is_change_request: true,
                    },
                    created_at: change_request.created_at(),
                },
            )
            .expect("record cross reference");
        self.tracker
            .insert_change_request(change_request)
            .expect("store change request");
    }

    pub fn change_request_event(
        action: ChangeRequestAction,
        change_request: ChangeRequest,
    ) -> Trigger {
        Trigger::ChangeRequestEvent(ChangeRequestEvent {
            action,
            change_request,
        })
    }

    pub fn work_item(&self, target: IssueNumber) -> WorkItem {
        self.tracker
            .item(target)
            .expect("tracker readable")
            .expect("item exists")
    }

    pub fn comments(&self, target: IssueNumber) -> Vec<IssueComment> {
        self.tracker.comments(target).expect("tracker readable")
    }

    pub fn bot_comments_containing(&self, target: IssueNumber, needle: &str) -> usize {
        self.comments(target)
            .iter()
            .filter(|comment| comment.author.as_str() == "claimwarden[bot]")
            .filter(|comment| comment.contains(needle))
            .count()
    }
}

pub(super) fn default_config() -> ReconcilerConfig {
    ReconcilerConfig::new(repo())
}

#[fixture]
pub(super) fn harness() -> Harness {
    Harness::with_config(default_config())
}
