//! Linked-Item Resolver: change requests that reference a work item.

use super::ReconcileResult;
use crate::tracker::{
    domain::{
        ChangeRequest, IssueNumber, PullRequestNumber, RepositoryFullName, TimelineEvent,
        extract_issue_references,
    },
    ports::IssueTracker,
};
use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// A change request linked to an item, with its age at resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedChangeRequest {
    change_request: ChangeRequest,
    age: Duration,
}

impl LinkedChangeRequest {
    fn new(change_request: ChangeRequest, now: DateTime<Utc>) -> Self {
        let anchor = if change_request.is_open() {
            change_request.created_at()
        } else {
            change_request
                .closed_at()
                .unwrap_or_else(|| change_request.created_at())
        };
        Self {
            age: now.signed_duration_since(anchor),
            change_request,
        }
    }

    /// Returns the change request detail.
    #[must_use]
    pub const fn change_request(&self) -> &ChangeRequest {
        &self.change_request
    }

    /// Returns time since creation (open) or since closing (closed or
    /// merged).
    #[must_use]
    pub const fn age(&self) -> Duration {
        self.age
    }
}

/// Resolution result, split by state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkedChangeRequests {
    /// Open change requests.
    pub open: Vec<LinkedChangeRequest>,
    /// Closed or merged change requests.
    pub closed: Vec<LinkedChangeRequest>,
    /// Set when some change request could not be fetched. Callers defer
    /// instead of acting on a partial view.
    pub incomplete: bool,
}

impl LinkedChangeRequests {
    /// Returns `true` when at least one linked change request is open.
    #[must_use]
    pub fn has_open(&self) -> bool {
        !self.open.is_empty()
    }

    /// Returns `true` when nothing is linked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.open.is_empty() && self.closed.is_empty()
    }

    /// Returns `true` when the view is complete, non-empty, and every
    /// linked change request is older than `threshold`.
    #[must_use]
    pub fn all_older_than(&self, threshold: Duration) -> bool {
        !self.incomplete
            && !self.is_empty()
            && self
                .open
                .iter()
                .chain(&self.closed)
                .all(|linked| linked.age > threshold)
    }
}

/// Finds the change requests linked to a work item.
pub struct LinkedItemResolver<T, C>
where
    T: IssueTracker,
    C: Clock + Send + Sync,
{
    tracker: Arc<T>,
    clock: Arc<C>,
    repository: RepositoryFullName,
}

impl<T, C> Clone for LinkedItemResolver<T, C>
where
    T: IssueTracker,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            tracker: Arc::clone(&self.tracker),
            clock: Arc::clone(&self.clock),
            repository: self.repository.clone(),
        }
    }
}

impl<T, C> LinkedItemResolver<T, C>
where
    T: IssueTracker,
    C: Clock + Send + Sync,
{
    /// Creates a resolver scoped to `repository`.
    #[must_use]
    pub const fn new(tracker: Arc<T>, clock: Arc<C>, repository: RepositoryFullName) -> Self {
        Self {
            tracker,
            clock,
            repository,
        }
    }

    /// Resolves every change request linked to `item`.
    ///
    /// Links come from same-repository cross-reference events on the
    /// timeline, unioned with search hits whose body closes the item.
    /// Connection events only count when the fetched change request's body
    /// closes the item. Deleted change requests are dropped; other fetch
    /// failures mark the result incomplete.
    ///
    /// # Errors
    ///
    /// Returns [`super::ReconcileError::Tracker`] when the timeline cannot be
    /// listed.
    pub async fn resolve(&self, item: IssueNumber) -> ReconcileResult<LinkedChangeRequests> {
        let timeline = self.tracker.list_timeline(item).await?;
        // Candidate number to whether the link is already confirmed.
        let mut candidates: BTreeMap<PullRequestNumber, bool> = timeline
            .iter()
            .filter_map(|event| event.linked_change_request(&self.repository))
            .map(|number| (number, true))
            .collect();
        for number in timeline
            .iter()
            .filter_map(TimelineEvent::connected_change_request)
        {
            candidates.entry(number).or_insert(false);
        }
        let mut result = LinkedChangeRequests::default();

        match self.tracker.search_change_request_mentions(item).await {
            Ok(mentions) => candidates.extend(
                mentions
                    .into_iter()
                    .filter(|mention| {
                        mention.body.as_deref().is_some_and(|body| {
                            extract_issue_references(body, &self.repository).contains(&item)
                        })
                    })
                    .map(|mention| (mention.number, true)),
            ),
            Err(err) => {
                warn!(item = %item, error = %err, "change request search failed");
                result.incomplete = true;
            }
        }

        let now = self.clock.utc();
        for (number, confirmed) in candidates {
            match self.tracker.get_change_request(number).await {
                Ok(change_request)
                    if !confirmed
                        && !change_request
                            .referenced_items(&self.repository)
                            .contains(&item) =>
                {
                    debug!(item = %item, change_request = %number, "connection not confirmed by body");
                }
                Ok(change_request) => {
                    let linked = LinkedChangeRequest::new(change_request, now);
                    if linked.change_request.is_open() {
                        result.open.push(linked);
                    } else {
                        result.closed.push(linked);
                    }
                }
                Err(err) if err.is_not_found() => {
                    debug!(item = %item, change_request = %number, "linked change request deleted");
                }
                Err(err) => {
                    warn!(
                        item = %item,
                        change_request = %number,
                        error = %err,
                        "linked change request could not be fetched"
                    );
                    result.incomplete = true;
                }
            }
        }
        Ok(result)
    }
}
