//! Takeover Transaction: replaces an abandoned claimant as a bounded saga.
//!
//! Forward steps are journalled as they succeed. On failure the journal is
//! compensated in reverse. Every compensating step is attempted exactly once,
//! even after an earlier one failed. If any of them fails the item gets a
//! manual-intervention notice instead of further retries.

use super::{ClaimPolicy, NoticeBoard, ReconcileError, ReconcileResult};
use crate::assignment::domain::{Notice, NoticeKey, NoticeKind, NoticeTimings};
use crate::tracker::{
    domain::{CommentId, IssueNumber, Login, WorkItem},
    ports::{IssueTracker, TrackerError, TrackerResult},
};
use mockable::Clock;
use std::slice;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Result of a takeover attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TakeoverOutcome {
    /// The challenger now holds the claim.
    Completed,
    /// The challenger is at the claim limit. Nothing was mutated.
    Ineligible {
        /// Items blocking the challenger.
        blocking_items: Vec<IssueNumber>,
    },
    /// A step failed and the previous claim was restored.
    RolledBack {
        /// Description of the failure.
        cause: String,
    },
    /// A step failed and restoring the previous claim also failed.
    ManualIntervention {
        /// Description of the original failure.
        cause: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SagaStep {
    RemovedIncumbents,
    RemovedLabel,
    AddedChallenger,
    AddedLabel,
}

/// Executes takeovers.
pub struct TakeoverTransaction<T, C>
where
    T: IssueTracker,
    C: Clock + Send + Sync,
{
    tracker: Arc<T>,
    policy: ClaimPolicy<T, C>,
    board: NoticeBoard<T>,
    claim_label: String,
    timings: NoticeTimings,
}

impl<T, C> Clone for TakeoverTransaction<T, C>
where
    T: IssueTracker,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            tracker: Arc::clone(&self.tracker),
            policy: self.policy.clone(),
            board: self.board.clone(),
            claim_label: self.claim_label.clone(),
            timings: self.timings,
        }
    }
}

impl<T, C> TakeoverTransaction<T, C>
where
    T: IssueTracker,
    C: Clock + Send + Sync,
{
    /// Creates the transaction runner.
    #[must_use]
    pub const fn new(
        tracker: Arc<T>,
        policy: ClaimPolicy<T, C>,
        board: NoticeBoard<T>,
        claim_label: String,
        timings: NoticeTimings,
    ) -> Self {
        Self {
            tracker,
            policy,
            board,
            claim_label,
            timings,
        }
    }

    /// Moves the claim on `item` to `challenger`.
    ///
    /// `trigger` is the comment that requested the claim; notices are
    /// keyed on it so a redelivered trigger posts nothing new.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] when eligibility cannot be evaluated (no
    /// mutation has happened yet) or when the final notice of a failed
    /// attempt cannot be posted.
    #[instrument(skip(self, item), fields(item = %item.number()))]
    pub async fn execute(
        &self,
        item: &WorkItem,
        challenger: &Login,
        trigger: CommentId,
    ) -> ReconcileResult<TakeoverOutcome> {
        let number = item.number();
        let blocking_items = self.policy.blocking_claims(challenger, number).await?;
        if !blocking_items.is_empty() {
            let kind = NoticeKind::ClaimLimitReached {
                actor: challenger.to_string(),
                blocking_items: blocking_items.iter().map(|blocking| blocking.value()).collect(),
            };
            self.board
                .post(number, &Notice::new(kind, NoticeKey::Reply(trigger)))
                .await?;
            return Ok(TakeoverOutcome::Ineligible { blocking_items });
        }

        let snapshot = item.assignees().to_vec();
        let previous = snapshot
            .first()
            .map_or_else(String::new, ToString::to_string);
        let mut journal = Vec::with_capacity(4);

        let forward = match self
            .swap_claimant(number, &snapshot, challenger, &mut journal)
            .await
        {
            Ok(()) => {
                let kind = NoticeKind::TakeoverCompleted {
                    previous: previous.clone(),
                    claimant: challenger.to_string(),
                    threshold_days: self.timings.takeover_days,
                };
                self.board
                    .post(number, &Notice::new(kind, NoticeKey::Takeover(trigger)))
                    .await
                    .map(drop)
            }
            Err(err) => Err(ReconcileError::from(err)),
        };

        match forward {
            Ok(()) => {
                info!(previous = %previous, claimant = %challenger, "takeover completed");
                Ok(TakeoverOutcome::Completed)
            }
            Err(cause) => {
                self.compensate(number, &snapshot, challenger, &journal, &previous, trigger, cause)
                    .await
            }
        }
    }

    async fn swap_claimant(
        &self,
        item: IssueNumber,
        snapshot: &[Login],
        challenger: &Login,
        journal: &mut Vec<SagaStep>,
    ) -> TrackerResult<()> {
        self.tracker.remove_assignees(item, snapshot).await?;
        journal.push(SagaStep::RemovedIncumbents);
        self.tracker.remove_label(item, &self.claim_label).await?;
        journal.push(SagaStep::RemovedLabel);
        self.tracker
            .add_assignees(item, slice::from_ref(challenger))
            .await?;
        journal.push(SagaStep::AddedChallenger);
        self.tracker.add_label(item, &self.claim_label).await?;
        journal.push(SagaStep::AddedLabel);
        Ok(())
    }

    /// Compensates every journalled step once, newest first, and returns
    /// the failures.
    async fn undo(
        &self,
        item: IssueNumber,
        snapshot: &[Login],
        challenger: &Login,
        journal: &[SagaStep],
    ) -> Vec<TrackerError> {
        let mut failures = Vec::new();
        for step in journal.iter().rev() {
            let result = match step {
                SagaStep::AddedLabel => Ok(()),
                SagaStep::AddedChallenger => {
                    self.tracker
                        .remove_assignees(item, slice::from_ref(challenger))
                        .await
                }
                SagaStep::RemovedLabel => self.tracker.add_label(item, &self.claim_label).await,
                SagaStep::RemovedIncumbents => self.tracker.add_assignees(item, snapshot).await,
            };
            if let Err(err) = result {
                warn!(step = ?step, error = %err, "compensating step failed");
                failures.push(err);
            }
        }
        failures
    }

    #[expect(
        clippy::too_many_arguments,
        reason = "compensation needs the full saga context"
    )]
    async fn compensate(
        &self,
        item: IssueNumber,
        snapshot: &[Login],
        challenger: &Login,
        journal: &[SagaStep],
        previous: &str,
        trigger: CommentId,
        cause: ReconcileError,
    ) -> ReconcileResult<TakeoverOutcome> {
        warn!(error = %cause, steps = journal.len(), "takeover failed, compensating");
        let cause_text = cause.to_string();
        let failures = self.undo(item, snapshot, challenger, journal).await;
        if failures.is_empty() {
            let kind = NoticeKind::TakeoverRolledBack {
                previous: previous.to_owned(),
                challenger: challenger.to_string(),
            };
            self.board
                .post(item, &Notice::new(kind, NoticeKey::Reply(trigger)))
                .await?;
            return Ok(TakeoverOutcome::RolledBack { cause: cause_text });
        }

        error!(failed_steps = failures.len(), "takeover compensation incomplete");
        let kind = NoticeKind::ManualIntervention {
            previous: previous.to_owned(),
            challenger: challenger.to_string(),
            detail: cause_text.clone(),
        };
        self.board
            .post(item, &Notice::new(kind, NoticeKey::Reply(trigger)))
            .await?;
        Ok(TakeoverOutcome::ManualIntervention { cause: cause_text })
    }
}
