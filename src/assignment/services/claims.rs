//! Assignment State Machine service: commands and stale-claim release.

use super::{
    ClaimPolicy, ItemAction, LinkedItemResolver, NoticeBoard, ReconcileError, ReconcileResult,
    TakeoverTransaction, mutations::apply_mutations,
};
use crate::assignment::domain::{
    ClaimEvent, ClaimGuard, ClaimLabels, CommandIntent, CommentEvent, LogicalState, Notice,
    NoticeKey, NoticeKind, NoticeTimings, Outcome, Projection, Transition, classify_command,
    is_stale, project, transition,
};
use crate::tracker::{
    domain::{IssueNumber, Login, WorkItem, claimed_at},
    ports::IssueTracker,
};
use chrono::Duration;
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Applies claim and release commands and releases stale claims.
pub struct AssignmentService<T, C>
where
    T: IssueTracker,
    C: Clock + Send + Sync,
{
    tracker: Arc<T>,
    clock: Arc<C>,
    resolver: LinkedItemResolver<T, C>,
    policy: ClaimPolicy<T, C>,
    takeover: TakeoverTransaction<T, C>,
    board: NoticeBoard<T>,
    labels: ClaimLabels,
    stale_after: Duration,
    timings: NoticeTimings,
}

impl<T, C> Clone for AssignmentService<T, C>
where
    T: IssueTracker,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            tracker: Arc::clone(&self.tracker),
            clock: Arc::clone(&self.clock),
            resolver: self.resolver.clone(),
            policy: self.policy.clone(),
            takeover: self.takeover.clone(),
            board: self.board.clone(),
            labels: self.labels.clone(),
            stale_after: self.stale_after,
            timings: self.timings,
        }
    }
}

/// Collaborators of [`AssignmentService`].
pub struct AssignmentParts<T, C>
where
    T: IssueTracker,
    C: Clock + Send + Sync,
{
    /// Linked-item resolver.
    pub resolver: LinkedItemResolver<T, C>,
    /// Cross-item claim policy.
    pub policy: ClaimPolicy<T, C>,
    /// Takeover saga runner.
    pub takeover: TakeoverTransaction<T, C>,
    /// Notice poster.
    pub board: NoticeBoard<T>,
}

impl<T, C> AssignmentService<T, C>
where
    T: IssueTracker,
    C: Clock + Send + Sync,
{
    /// Creates the service.
    #[must_use]
    pub fn new(
        tracker: Arc<T>,
        clock: Arc<C>,
        parts: AssignmentParts<T, C>,
        labels: ClaimLabels,
        stale_after: Duration,
        timings: NoticeTimings,
    ) -> Self {
        let AssignmentParts {
            resolver,
            policy,
            takeover,
            board,
        } = parts;
        Self {
            tracker,
            clock,
            resolver,
            policy,
            takeover,
            board,
            labels,
            stale_after,
            timings,
        }
    }

    /// Handles a comment that may carry a claim or release command.
    ///
    /// A failed mutation is reported to the commenter once per comment
    /// before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] when the item cannot be read, a guard
    /// cannot be evaluated, or a mutation or notice fails.
    #[instrument(skip(self, event), fields(item = %event.item, actor = %event.actor))]
    pub async fn handle_comment(&self, event: &CommentEvent) -> ReconcileResult<ItemAction> {
        if event.on_change_request {
            debug!("comment on a change request ignored");
            return Ok(ItemAction::NoAction);
        }
        let command = classify_command(&event.text, event.actor.clone(), event.actor_kind);
        if command.intent == CommandIntent::NoOp {
            return Ok(ItemAction::NoAction);
        }

        let item = self.tracker.get_item(event.item).await?;
        let projection = project(&item, &self.labels);
        if projection.state == LogicalState::Closed {
            debug!("item closed, command ignored");
            return Ok(ItemAction::NoAction);
        }
        if let Err(err) = self.heal(&item, &projection).await {
            return self.report_failure(event, err).await;
        }

        let claim_event = match command.intent {
            CommandIntent::Claim => ClaimEvent::Claim {
                guard: self.guard(&projection.state, &command.actor, item.number()).await?,
                actor: command.actor,
            },
            CommandIntent::Release | CommandIntent::NoOp => ClaimEvent::Release {
                actor: command.actor,
            },
        };
        let step = transition(&projection.state, &claim_event, &self.labels);

        if let Some(Outcome::TakeoverRequested { challenger, .. }) = &step.outcome {
            let outcome = self
                .takeover
                .execute(&item, challenger, event.comment_id)
                .await?;
            return Ok(ItemAction::Takeover(outcome));
        }

        let key = match &step.outcome {
            Some(Outcome::Released { claimant }) => self
                .claim_key(item.number(), claimant)
                .await?
                .unwrap_or(NoticeKey::Reply(event.comment_id)),
            _ => NoticeKey::Reply(event.comment_id),
        };
        let number = item.number();
        if let Err(err) = apply_mutations(self.tracker.as_ref(), number, &step.mutations).await {
            return self.report_failure(event, err.into()).await;
        }
        self.announce(number, step.outcome, key).await
    }

    /// Releases the claim on `item` when it is stale and no open change
    /// request is linked.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::InvariantViolation`] when the claim has no
    /// assignment event, [`ReconcileError::IncompleteView`] when linked
    /// change requests cannot be resolved, and tracker or notice errors as
    /// they occur.
    #[instrument(skip(self, item), fields(item = %item.number()))]
    pub async fn reconcile_claim(&self, item: &WorkItem) -> ReconcileResult<ItemAction> {
        let projection = project(item, &self.labels);
        let healed = self.heal(item, &projection).await?;
        let LogicalState::Claimed { claimant } = &projection.state else {
            return Ok(if healed {
                ItemAction::Healed
            } else {
                ItemAction::NoAction
            });
        };

        let timeline = self.tracker.list_timeline(item.number()).await?;
        let Some(anchor) = claimed_at(&timeline, claimant) else {
            return Err(ReconcileError::InvariantViolation {
                item: item.number(),
                detail: format!("no assignment event for claimant {claimant}"),
            });
        };
        if !is_stale(anchor, self.stale_after, self.clock.utc()) {
            return Ok(if healed {
                ItemAction::Healed
            } else {
                ItemAction::NoAction
            });
        }

        let linked = self.resolver.resolve(item.number()).await?;
        if linked.incomplete {
            return Err(ReconcileError::IncompleteView(item.number()));
        }
        if linked.has_open() {
            debug!(claimant = %claimant, "stale claim has an open change request");
            return Ok(ItemAction::NoAction);
        }

        let step = transition(&projection.state, &ClaimEvent::StaleTimeout, &self.labels);
        let key = NoticeKey::Claim {
            claimant: claimant.clone(),
            epoch: anchor,
        };
        self.apply(item.number(), step, key).await
    }

    async fn guard(
        &self,
        state: &LogicalState,
        actor: &Login,
        item: IssueNumber,
    ) -> ReconcileResult<ClaimGuard> {
        match state {
            LogicalState::Unclaimed => Ok(ClaimGuard {
                blocking_items: self.policy.blocking_claims(actor, item).await?,
                incumbent_abandoned: false,
            }),
            LogicalState::Claimed { claimant } if claimant != actor => Ok(ClaimGuard {
                blocking_items: Vec::new(),
                incumbent_abandoned: self.policy.incumbent_abandoned(item).await?,
            }),
            _ => Ok(ClaimGuard::default()),
        }
    }

    async fn claim_key(
        &self,
        item: IssueNumber,
        claimant: &Login,
    ) -> ReconcileResult<Option<NoticeKey>> {
        let timeline = self.tracker.list_timeline(item).await?;
        Ok(claimed_at(&timeline, claimant).map(|epoch| NoticeKey::Claim {
            claimant: claimant.clone(),
            epoch,
        }))
    }

    async fn heal(&self, item: &WorkItem, projection: &Projection) -> ReconcileResult<bool> {
        let healing = projection.healing(&self.labels);
        if healing.is_empty() {
            return Ok(false);
        }
        warn!(
            item = %item.number(),
            divergence = ?projection.divergence,
            "state labels and assignees disagree, healing"
        );
        apply_mutations(self.tracker.as_ref(), item.number(), &healing).await?;
        Ok(true)
    }

    async fn report_failure(
        &self,
        event: &CommentEvent,
        cause: ReconcileError,
    ) -> ReconcileResult<ItemAction> {
        warn!(error = %cause, "command could not be applied");
        let kind = NoticeKind::CommandFailed {
            actor: event.actor.to_string(),
            detail: cause.to_string(),
        };
        let notice = Notice::new(kind, NoticeKey::Failure(event.comment_id));
        if let Err(err) = self.board.post(event.item, &notice).await {
            warn!(error = %err, "failure notice not posted");
        }
        Err(cause)
    }

    async fn apply(
        &self,
        item: IssueNumber,
        step: Transition,
        key: NoticeKey,
    ) -> ReconcileResult<ItemAction> {
        apply_mutations(self.tracker.as_ref(), item, &step.mutations).await?;
        self.announce(item, step.outcome, key).await
    }

    async fn announce(
        &self,
        item: IssueNumber,
        outcome: Option<Outcome>,
        key: NoticeKey,
    ) -> ReconcileResult<ItemAction> {
        let Some(outcome) = outcome else {
            return Ok(ItemAction::NoAction);
        };
        if let Some(kind) = NoticeKind::from_outcome(&outcome, self.timings) {
            self.board.post(item, &Notice::new(kind, key)).await?;
        }
        info!(item = %item, outcome = ?outcome, "claim transition applied");
        Ok(ItemAction::Applied(outcome))
    }
}
