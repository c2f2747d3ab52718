//! Grace-Period Reconciler.
//!
//! The pending label plus the marker comment are the whole durable state of
//! a grace window. The window is measured from the marker comment's own
//! creation time, so sweep cadence never changes the outcome.

use super::{
    ItemAction, LinkedItemResolver, NoticeBoard, ReconcileError, ReconcileResult,
    mutations::apply_mutations,
};
use crate::assignment::domain::{
    ClaimEvent, ClaimLabels, GraceMarker, LogicalState, Notice, NoticeKey, NoticeKind,
    NoticeTimings, project, transition,
};
use crate::tracker::{
    domain::{ChangeRequest, IssueNumber, WorkItem},
    ports::IssueTracker,
};
use chrono::Duration;
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Opens, cancels and expires grace windows.
pub struct GracePeriodReconciler<T, C>
where
    T: IssueTracker,
    C: Clock + Send + Sync,
{
    tracker: Arc<T>,
    clock: Arc<C>,
    resolver: LinkedItemResolver<T, C>,
    board: NoticeBoard<T>,
    labels: ClaimLabels,
    grace_window: Duration,
    timings: NoticeTimings,
}

impl<T, C> Clone for GracePeriodReconciler<T, C>
where
    T: IssueTracker,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            tracker: Arc::clone(&self.tracker),
            clock: Arc::clone(&self.clock),
            resolver: self.resolver.clone(),
            board: self.board.clone(),
            labels: self.labels.clone(),
            grace_window: self.grace_window,
            timings: self.timings,
        }
    }
}

impl<T, C> GracePeriodReconciler<T, C>
where
    T: IssueTracker,
    C: Clock + Send + Sync,
{
    /// Creates the reconciler.
    #[must_use]
    pub const fn new(
        tracker: Arc<T>,
        clock: Arc<C>,
        resolver: LinkedItemResolver<T, C>,
        board: NoticeBoard<T>,
        labels: ClaimLabels,
        grace_window: Duration,
        timings: NoticeTimings,
    ) -> Self {
        Self {
            tracker,
            clock,
            resolver,
            board,
            labels,
            grace_window,
            timings,
        }
    }

    /// Opens a grace window on `item` when `change_request` closed unmerged
    /// and its author holds the claim with no other open linked change
    /// request.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::IncompleteView`] when other linked change
    /// requests cannot be resolved, and tracker or notice errors as they
    /// occur.
    #[instrument(skip(self, change_request), fields(change_request = %change_request.number()))]
    pub async fn begin(
        &self,
        item: IssueNumber,
        change_request: &ChangeRequest,
    ) -> ReconcileResult<ItemAction> {
        let work_item = self.tracker.get_item(item).await?;
        let projection = project(&work_item, &self.labels);
        let LogicalState::Claimed { claimant } = &projection.state else {
            debug!(state = ?projection.state, "item not in a claimed state, no grace window");
            return Ok(ItemAction::NoAction);
        };
        if claimant != change_request.author() {
            debug!(claimant = %claimant, "closed change request was not by the claimant");
            return Ok(ItemAction::NoAction);
        }

        let linked = self.resolver.resolve(item).await?;
        if linked.incomplete {
            return Err(ReconcileError::IncompleteView(item));
        }
        if linked.has_open() {
            debug!("claimant still has an open linked change request");
            return Ok(ItemAction::NoAction);
        }

        let event = ClaimEvent::ChangeRequestClosedUnmerged {
            author: change_request.author().clone(),
            number: change_request.number(),
        };
        let step = transition(&projection.state, &event, &self.labels);
        apply_mutations(self.tracker.as_ref(), item, &step.mutations).await?;
        let Some(outcome) = step.outcome else {
            return Ok(ItemAction::NoAction);
        };
        if let Some(kind) = NoticeKind::from_outcome(&outcome, self.timings) {
            let key = NoticeKey::GraceStart(change_request.number());
            self.board.post(item, &Notice::new(kind, key)).await?;
        }
        info!(claimant = %claimant, "grace window opened");
        Ok(ItemAction::Applied(outcome))
    }

    /// Cancels an open grace window on `item` because a change request
    /// referencing it was opened.
    ///
    /// # Errors
    ///
    /// Returns tracker or notice errors as they occur.
    #[instrument(skip(self))]
    pub async fn cancel(&self, item: IssueNumber) -> ReconcileResult<ItemAction> {
        let work_item = self.tracker.get_item(item).await?;
        let projection = project(&work_item, &self.labels);
        if !matches!(projection.state, LogicalState::PendingRelease { .. }) {
            return Ok(ItemAction::NoAction);
        }
        let comments = self.tracker.list_comments(item).await?;
        let marker = GraceMarker::locate(&comments);
        self.finish(item, &projection.state, &ClaimEvent::ChangeRequestOpened, marker.as_ref())
            .await
    }

    /// Sweeps one item carrying the pending label.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::IncompleteView`] when linked change
    /// requests cannot be resolved, [`ReconcileError::InvariantViolation`]
    /// when the marker names no claimant, and tracker or notice errors as
    /// they occur. A marker without a claimant leaves the label in place and
    /// gets a manual-review notice, posted once per marker.
    #[instrument(skip(self, item), fields(item = %item.number()))]
    pub async fn sweep_item(&self, item: &WorkItem) -> ReconcileResult<ItemAction> {
        let number = item.number();
        let comments = self.tracker.list_comments(number).await?;
        let Some(marker) = GraceMarker::locate(&comments) else {
            warn!("pending label without grace marker, removing label");
            self.tracker
                .remove_label(number, &self.labels.pending)
                .await?;
            return Ok(ItemAction::Healed);
        };
        if !marker.has_elapsed(self.grace_window, self.clock.utc()) {
            debug!(started_at = %marker.started_at(), "grace window still running");
            return Ok(ItemAction::NoAction);
        }

        let linked = self.resolver.resolve(number).await?;
        if linked.incomplete {
            return Err(ReconcileError::IncompleteView(number));
        }
        let projection = project(item, &self.labels);
        if linked.has_open() && matches!(projection.state, LogicalState::PendingRelease { .. }) {
            return self
                .finish(
                    number,
                    &projection.state,
                    &ClaimEvent::ChangeRequestOpened,
                    Some(&marker),
                )
                .await;
        }

        let Some(claimant) = marker.claimant() else {
            let detail = format!("grace marker {} names no claimant", marker.comment_id());
            let kind = NoticeKind::GraceReviewNeeded {
                label: self.labels.pending.clone(),
                detail: detail.clone(),
            };
            let key = NoticeKey::GraceEnd(marker.comment_id());
            self.board.post(number, &Notice::new(kind, key)).await?;
            return Err(ReconcileError::InvariantViolation {
                item: number,
                detail,
            });
        };
        let event = ClaimEvent::GraceExpired {
            marker_claimant: claimant.clone(),
            still_assigned: item.is_assigned_to(claimant),
        };
        self.finish(number, &projection.state, &event, Some(&marker))
            .await
    }

    async fn finish(
        &self,
        item: IssueNumber,
        state: &LogicalState,
        event: &ClaimEvent,
        marker: Option<&GraceMarker>,
    ) -> ReconcileResult<ItemAction> {
        let step = transition(state, event, &self.labels);
        if step.is_noop() {
            return Ok(ItemAction::NoAction);
        }
        apply_mutations(self.tracker.as_ref(), item, &step.mutations).await?;
        let Some(outcome) = step.outcome else {
            return Ok(ItemAction::NoAction);
        };
        let Some(marker) = marker else {
            warn!(item = %item, "grace window closed without a marker comment to remove");
            return Ok(ItemAction::Applied(outcome));
        };
        self.tracker.delete_comment(marker.comment_id()).await?;
        if let Some(kind) = NoticeKind::from_outcome(&outcome, self.timings) {
            let key = NoticeKey::GraceEnd(marker.comment_id());
            self.board.post(item, &Notice::new(kind, key)).await?;
        }
        info!(item = %item, outcome = ?outcome, "grace window closed");
        Ok(ItemAction::Applied(outcome))
    }
}
