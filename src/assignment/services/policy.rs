//! Cross-item claim policy and takeover eligibility.

use super::{LinkedItemResolver, ReconcileError, ReconcileResult};
use crate::tracker::{
    domain::{IssueNumber, Login},
    ports::IssueTracker,
};
use chrono::Duration;
use mockable::Clock;
use std::sync::Arc;

/// Decides whether a contributor may take on another claim.
pub struct ClaimPolicy<T, C>
where
    T: IssueTracker,
    C: Clock + Send + Sync,
{
    tracker: Arc<T>,
    resolver: LinkedItemResolver<T, C>,
    claim_limit: usize,
    takeover_after: Duration,
}

impl<T, C> Clone for ClaimPolicy<T, C>
where
    T: IssueTracker,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            tracker: Arc::clone(&self.tracker),
            resolver: self.resolver.clone(),
            claim_limit: self.claim_limit,
            takeover_after: self.takeover_after,
        }
    }
}

impl<T, C> ClaimPolicy<T, C>
where
    T: IssueTracker,
    C: Clock + Send + Sync,
{
    /// Creates the policy.
    #[must_use]
    pub const fn new(
        tracker: Arc<T>,
        resolver: LinkedItemResolver<T, C>,
        claim_limit: usize,
        takeover_after: Duration,
    ) -> Self {
        Self {
            tracker,
            resolver,
            claim_limit,
            takeover_after,
        }
    }

    /// Returns the other open items `actor` holds without an open linked
    /// change request, when they reach the claim limit. An empty result
    /// means the claim may proceed.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::IncompleteView`] when another claim's
    /// linked change requests cannot be fully resolved, and tracker errors
    /// as they occur.
    pub async fn blocking_claims(
        &self,
        actor: &Login,
        item: IssueNumber,
    ) -> ReconcileResult<Vec<IssueNumber>> {
        let held = self.tracker.list_open_items_assigned_to(actor).await?;
        let mut without_change_request = Vec::new();
        for other in held.iter().filter(|other| other.number() != item) {
            let linked = self.resolver.resolve(other.number()).await?;
            if linked.incomplete {
                return Err(ReconcileError::IncompleteView(other.number()));
            }
            if !linked.has_open() {
                without_change_request.push(other.number());
            }
        }
        if without_change_request.len() >= self.claim_limit {
            Ok(without_change_request)
        } else {
            Ok(Vec::new())
        }
    }

    /// Returns `true` when every change request linked to `item` is older
    /// than the takeover threshold. An item with no linked change request
    /// is not eligible; the stale sweep releases those.
    ///
    /// # Errors
    ///
    /// Returns tracker errors from resolution.
    pub async fn incumbent_abandoned(&self, item: IssueNumber) -> ReconcileResult<bool> {
        let linked = self.resolver.resolve(item).await?;
        Ok(linked.all_older_than(self.takeover_after))
    }
}
