//! Top-level reconciler: routes triggers to the per-item services and runs
//! the scheduled sweep with bounded concurrency.

use super::{
    AssignmentParts, AssignmentService, ClaimPolicy, GracePeriodReconciler, LinkedItemResolver,
    NoticeBoard, NoticeRenderer, ReconcileError, ReconcileResult, TakeoverOutcome,
    TakeoverTransaction,
};
use crate::assignment::domain::{ChangeRequestAction, ChangeRequestEvent, Outcome, Trigger};
use crate::config::ReconcilerConfig;
use crate::notify::ChatNotifier;
use crate::tracker::{
    domain::{ChangeRequestState, IssueNumber, WorkItem},
    ports::IssueTracker,
};
use mockable::Clock;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

/// What reconciliation did to one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemAction {
    /// Nothing needed doing.
    NoAction,
    /// Only divergent labels were repaired.
    Healed,
    /// A state transition was applied.
    Applied(Outcome),
    /// A takeover was attempted.
    Takeover(TakeoverOutcome),
}

/// Per-item result inside a [`ReconcileReport`].
#[derive(Debug)]
pub struct ItemReport {
    /// The item.
    pub item: IssueNumber,
    /// What happened, or why it was skipped.
    pub result: ReconcileResult<ItemAction>,
}

/// Summary of one `reconcile` call.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    items: Vec<ItemReport>,
}

impl ReconcileReport {
    fn push(&mut self, item: IssueNumber, result: ReconcileResult<ItemAction>) {
        self.items.push(ItemReport { item, result });
    }

    /// Returns every item result, ordered by item number.
    #[must_use]
    pub fn items(&self) -> &[ItemReport] {
        &self.items
    }

    /// Returns the action taken on `item`, if it was reconciled successfully.
    #[must_use]
    pub fn action_for(&self, item: IssueNumber) -> Option<&ItemAction> {
        self.items
            .iter()
            .find(|report| report.item == item)
            .and_then(|report| report.result.as_ref().ok())
    }

    /// Returns the items whose reconciliation failed.
    pub fn failures(&self) -> impl Iterator<Item = (IssueNumber, &ReconcileError)> {
        self.items
            .iter()
            .filter_map(|report| report.result.as_ref().err().map(|err| (report.item, err)))
    }

    /// Returns the number of items that changed state or were healed.
    #[must_use]
    pub fn changed(&self) -> usize {
        self.items
            .iter()
            .filter(|report| {
                matches!(
                    report.result,
                    Ok(ItemAction::Healed | ItemAction::Applied(_) | ItemAction::Takeover(_))
                )
            })
            .count()
    }
}

/// Entry point tying the claim services together.
pub struct Reconciler<T, C>
where
    T: IssueTracker,
    C: Clock + Send + Sync,
{
    tracker: Arc<T>,
    config: Arc<ReconcilerConfig>,
    claims: AssignmentService<T, C>,
    grace: GracePeriodReconciler<T, C>,
}

impl<T, C> Clone for Reconciler<T, C>
where
    T: IssueTracker,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            tracker: Arc::clone(&self.tracker),
            config: Arc::clone(&self.config),
            claims: self.claims.clone(),
            grace: self.grace.clone(),
        }
    }
}

impl<T, C> Reconciler<T, C>
where
    T: IssueTracker + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Wires every service from the tracker, clock, configuration and chat
    /// notifier.
    #[must_use]
    pub fn new(
        tracker: Arc<T>,
        clock: Arc<C>,
        config: Arc<ReconcilerConfig>,
        notifier: Arc<dyn ChatNotifier>,
    ) -> Self {
        let labels = config.labels();
        let timings = config.notice_timings();
        let resolver = LinkedItemResolver::new(
            Arc::clone(&tracker),
            Arc::clone(&clock),
            config.repository().clone(),
        );
        let board = NoticeBoard::new(
            Arc::clone(&tracker),
            NoticeRenderer::new(config.repository().clone()),
            notifier,
            config.chat_channel().map(ToOwned::to_owned),
        );
        let policy = ClaimPolicy::new(
            Arc::clone(&tracker),
            resolver.clone(),
            config.claim_limit(),
            config.takeover_after(),
        );
        let takeover = TakeoverTransaction::new(
            Arc::clone(&tracker),
            policy.clone(),
            board.clone(),
            config.claim_label().to_owned(),
            timings,
        );
        let grace = GracePeriodReconciler::new(
            Arc::clone(&tracker),
            Arc::clone(&clock),
            resolver.clone(),
            board.clone(),
            labels.clone(),
            config.grace_window(),
            timings,
        );
        let claims = AssignmentService::new(
            Arc::clone(&tracker),
            clock,
            AssignmentParts {
                resolver,
                policy,
                takeover,
                board,
            },
            labels,
            config.stale_after(),
            timings,
        );
        Self {
            tracker,
            config,
            claims,
            grace,
        }
    }

    /// Reconciles one trigger.
    ///
    /// Errors affecting a single item are recorded in the report and never
    /// abort the rest of the trigger.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] only when the set of items to reconcile
    /// cannot be determined, such as when listing open items fails.
    pub async fn reconcile(&self, trigger: Trigger) -> ReconcileResult<ReconcileReport> {
        match trigger {
            Trigger::CommentEvent(event) => {
                let mut report = ReconcileReport::default();
                let result = self.claims.handle_comment(&event).await;
                log_item(event.item, &result);
                report.push(event.item, result);
                Ok(report)
            }
            Trigger::ChangeRequestEvent(event) => Ok(self.change_request_event(&event).await),
            Trigger::ScheduledSweep => self.sweep().await,
        }
    }

    #[instrument(skip(self, event), fields(change_request = %event.change_request.number()))]
    async fn change_request_event(&self, event: &ChangeRequestEvent) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let items = event
            .change_request
            .referenced_items(self.config.repository());
        if items.is_empty() {
            debug!("change request references no work item");
            return report;
        }
        for item in items {
            let result = match event.action {
                ChangeRequestAction::Closed
                    if event.change_request.state() == ChangeRequestState::Merged =>
                {
                    Ok(ItemAction::NoAction)
                }
                ChangeRequestAction::Closed => self.grace.begin(item, &event.change_request).await,
                ChangeRequestAction::Opened | ChangeRequestAction::Reopened => {
                    self.grace.cancel(item).await
                }
            };
            log_item(item, &result);
            report.push(item, result);
        }
        report
    }

    #[instrument(skip(self))]
    async fn sweep(&self) -> ReconcileResult<ReconcileReport> {
        let items = self.tracker.list_open_items().await?;
        info!(items = items.len(), "sweep started");
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency()));
        let mut workers: JoinSet<(IssueNumber, ReconcileResult<ItemAction>)> = JoinSet::new();

        for item in items {
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(err) => {
                    error!(error = %err, "sweep worker pool closed");
                    break;
                }
            };
            let reconciler = self.clone();
            workers.spawn(async move {
                let result = reconciler.sweep_item(&item).await;
                drop(permit);
                (item.number(), result)
            });
        }

        let mut report = ReconcileReport::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((item, result)) => {
                    log_item(item, &result);
                    report.push(item, result);
                }
                Err(err) => error!(error = %err, "sweep worker panicked"),
            }
        }
        report.items.sort_by_key(|entry| entry.item);
        info!(
            items = report.items.len(),
            changed = report.changed(),
            failed = report.failures().count(),
            "sweep finished"
        );
        Ok(report)
    }

    async fn sweep_item(&self, item: &WorkItem) -> ReconcileResult<ItemAction> {
        if item.has_label(self.config.pending_label()) {
            self.grace.sweep_item(item).await
        } else {
            self.claims.reconcile_claim(item).await
        }
    }
}

fn log_item(item: IssueNumber, result: &ReconcileResult<ItemAction>) {
    match result {
        Ok(ItemAction::NoAction) => debug!(item = %item, "no action"),
        Ok(action) => debug!(item = %item, action = ?action, "item reconciled"),
        Err(err @ ReconcileError::InvariantViolation { .. }) => {
            error!(item = %item, error = %err, "item left for manual review");
        }
        Err(err) if err.is_deferrable() => {
            warn!(item = %item, error = %err, "item deferred to a later run");
        }
        Err(err) => warn!(item = %item, error = %err, "item reconciliation failed"),
    }
}
