//! Shared world state for claim lifecycle BDD scenarios.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use claimwarden::assignment::domain::{ActorKind, CommentEvent, Trigger};
use claimwarden::assignment::services::{ReconcileReport, Reconciler};
use claimwarden::config::ReconcilerConfig;
use claimwarden::notify::memory::RecordingNotifier;
use claimwarden::tracker::{
    adapters::memory::{InMemoryIssueTracker, ManualClock},
    domain::{IssueNumber, Login, RepositoryFullName, WorkItem},
};
use eyre::WrapErr;
use mockable::Clock;
use rstest::fixture;

/// Tracker type used by the BDD world.
pub type TestTracker = InMemoryIssueTracker<ManualClock>;

/// Login the in-memory tracker writes bot comments as.
pub const BOT_LOGIN: &str = "claimwarden[bot]";

/// Repository every scenario runs against.
pub const REPOSITORY: &str = "octo/widgets";

/// Scenario world for claim lifecycle behaviour tests.
pub struct ClaimWorld {
    pub clock: Arc<ManualClock>,
    pub tracker: Arc<TestTracker>,
    pub reconciler: Reconciler<TestTracker, ManualClock>,
    pub last_report: Option<ReconcileReport>,
}

impl ClaimWorld {
    /// Creates a world whose clock starts on 2025-03-01 at 09:00 UTC.
    ///
    /// # Panics
    ///
    /// Panics if the fixed start time or bot login is invalid.
    #[must_use]
    pub fn new() -> Self {
        let start: DateTime<Utc> = Utc
            .with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
            .single()
            .expect("fixed start time is valid");
        let clock = Arc::new(ManualClock::new(start));
        let tracker = Arc::new(InMemoryIssueTracker::new(
            Arc::clone(&clock),
            Login::new(BOT_LOGIN).expect("bot login is valid"),
        ));
        let repository = RepositoryFullName::new(REPOSITORY).expect("repository is valid");
        let reconciler = Reconciler::new(
            Arc::clone(&tracker),
            Arc::clone(&clock),
            Arc::new(ReconcilerConfig::new(repository)),
            Arc::new(RecordingNotifier::new()),
        );
        Self {
            clock,
            tracker,
            reconciler,
            last_report: None,
        }
    }

    /// Seeds an open, unassigned item.
    pub fn seed(&self, number: u64) -> Result<(), eyre::Report> {
        let item = IssueNumber::new(number)?;
        self.tracker
            .insert_item(WorkItem::new(item, self.clock.utc()))
            .wrap_err("seed work item")?;
        Ok(())
    }

    /// Posts a human comment and reconciles it.
    pub fn comment(&mut self, actor: &str, text: &str, number: u64) -> Result<(), eyre::Report> {
        let item = IssueNumber::new(number)?;
        let actor = Login::new(actor)?;
        let comment_id = self
            .tracker
            .insert_comment(item, actor.clone(), text, self.clock.utc())
            .wrap_err("seed comment")?;
        self.reconcile(Trigger::CommentEvent(CommentEvent {
            item,
            comment_id,
            actor,
            actor_kind: ActorKind::Human,
            text: text.to_owned(),
            on_change_request: false,
        }))
    }

    /// Reconciles `trigger` and keeps the report.
    pub fn reconcile(&mut self, trigger: Trigger) -> Result<(), eyre::Report> {
        let report = run_async(self.reconciler.reconcile(trigger)).wrap_err("reconcile trigger")?;
        self.last_report = Some(report);
        Ok(())
    }

    /// Returns the stored item.
    pub fn item(&self, number: u64) -> Result<WorkItem, eyre::Report> {
        self.tracker
            .item(IssueNumber::new(number)?)?
            .ok_or_else(|| eyre::eyre!("item #{number} is not seeded"))
    }
}

impl Default for ClaimWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> ClaimWorld {
    ClaimWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
