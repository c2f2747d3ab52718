//! In-memory issue tracker for service tests and dry runs.

use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::tracker::{
    domain::{
        ChangeRequest, ChangeRequestMention, CommentId, IssueComment, IssueNumber, Login,
        PullRequestNumber, TimelineEvent, WorkItem,
    },
    ports::{IssueTracker, TrackerError, TrackerResult},
};

/// Tracker operations that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackerOperation {
    /// [`IssueTracker::get_item`].
    GetItem,
    /// [`IssueTracker::list_open_items`] and
    /// [`IssueTracker::list_open_items_assigned_to`].
    ListOpenItems,
    /// [`IssueTracker::add_assignees`].
    AddAssignees,
    /// [`IssueTracker::remove_assignees`].
    RemoveAssignees,
    /// [`IssueTracker::add_label`].
    AddLabel,
    /// [`IssueTracker::remove_label`].
    RemoveLabel,
    /// [`IssueTracker::list_comments`].
    ListComments,
    /// [`IssueTracker::create_comment`].
    CreateComment,
    /// [`IssueTracker::update_comment`].
    UpdateComment,
    /// [`IssueTracker::delete_comment`].
    DeleteComment,
    /// [`IssueTracker::list_timeline`].
    ListTimeline,
    /// [`IssueTracker::get_change_request`].
    GetChangeRequest,
    /// [`IssueTracker::search_change_request_mentions`].
    SearchMentions,
}

/// A successful mutation, recorded for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMutation {
    /// The mutating operation.
    pub operation: TrackerOperation,
    /// Item the mutation applied to, when item-scoped.
    pub item: Option<IssueNumber>,
    /// Label name, login list or comment id involved.
    pub detail: String,
}

/// Thread-safe in-memory tracker.
///
/// Clones share state, so a test can keep a handle for seeding and
/// inspection while services own another.
#[derive(Debug)]
pub struct InMemoryIssueTracker<C = DefaultClock> {
    state: Arc<RwLock<InMemoryTrackerState>>,
    clock: Arc<C>,
    bot_login: Login,
}

impl<C> Clone for InMemoryIssueTracker<C> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            clock: Arc::clone(&self.clock),
            bot_login: self.bot_login.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct InMemoryTrackerState {
    items: BTreeMap<IssueNumber, WorkItem>,
    comments: BTreeMap<IssueNumber, Vec<IssueComment>>,
    timelines: HashMap<IssueNumber, Vec<TimelineEvent>>,
    change_requests: BTreeMap<PullRequestNumber, ChangeRequest>,
    next_comment_id: u64,
    failures: HashMap<TrackerOperation, VecDeque<TrackerError>>,
    mutations: Vec<RecordedMutation>,
}

impl<C> InMemoryIssueTracker<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an empty tracker whose comments are authored by `bot_login`.
    #[must_use]
    pub fn new(clock: Arc<C>, bot_login: Login) -> Self {
        Self {
            state: Arc::new(RwLock::new(InMemoryTrackerState {
                next_comment_id: 1,
                ..InMemoryTrackerState::default()
            })),
            clock,
            bot_login,
        }
    }

    fn read(&self) -> TrackerResult<RwLockReadGuard<'_, InMemoryTrackerState>> {
        self.state
            .read()
            .map_err(|err| TrackerError::transient(std::io::Error::other(err.to_string())))
    }

    fn write(&self) -> TrackerResult<RwLockWriteGuard<'_, InMemoryTrackerState>> {
        self.state
            .write()
            .map_err(|err| TrackerError::transient(std::io::Error::other(err.to_string())))
    }

    /// Seeds or replaces a work item.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Transient`] when the state lock is poisoned.
    pub fn insert_item(&self, item: WorkItem) -> TrackerResult<()> {
        self.write()?.items.insert(item.number(), item);
        Ok(())
    }

    /// Seeds a comment with an explicit author and timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Transient`] when the state lock is poisoned.
    pub fn insert_comment(
        &self,
        item: IssueNumber,
        author: Login,
        body: impl Into<String>,
        created_at: chrono::DateTime<chrono::Utc>,
    ) -> TrackerResult<CommentId> {
        let mut state = self.write()?;
        let id = allocate_comment_id(&mut state);
        state.comments.entry(item).or_default().push(IssueComment {
            id,
            author,
            body: body.into(),
            created_at,
        });
        Ok(id)
    }

    /// Appends a timeline event to an item.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Transient`] when the state lock is poisoned.
    pub fn record_event(&self, item: IssueNumber, event: TimelineEvent) -> TrackerResult<()> {
        self.write()?.timelines.entry(item).or_default().push(event);
        Ok(())
    }

    /// Seeds or replaces a change request.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Transient`] when the state lock is poisoned.
    pub fn insert_change_request(&self, change_request: ChangeRequest) -> TrackerResult<()> {
        self.write()?
            .change_requests
            .insert(change_request.number(), change_request);
        Ok(())
    }

    /// Queues `error` as the result of the next call to `operation`.
    ///
    /// Multiple queued errors are consumed in order, one per call.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Transient`] when the state lock is poisoned.
    pub fn fail_next(&self, operation: TrackerOperation, error: TrackerError) -> TrackerResult<()> {
        self.write()?
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
        Ok(())
    }

    /// Returns a snapshot of an item.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Transient`] when the state lock is poisoned.
    pub fn item(&self, item: IssueNumber) -> TrackerResult<Option<WorkItem>> {
        Ok(self.read()?.items.get(&item).cloned())
    }

    /// Returns the comments currently on an item.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Transient`] when the state lock is poisoned.
    pub fn comments(&self, item: IssueNumber) -> TrackerResult<Vec<IssueComment>> {
        Ok(self
            .read()?
            .comments
            .get(&item)
            .cloned()
            .unwrap_or_default())
    }

    /// Returns every successful mutation in call order.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Transient`] when the state lock is poisoned.
    pub fn mutations(&self) -> TrackerResult<Vec<RecordedMutation>> {
        Ok(self.read()?.mutations.clone())
    }

    fn take_failure(
        state: &mut InMemoryTrackerState,
        operation: TrackerOperation,
    ) -> TrackerResult<()> {
        match state
            .failures
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn update_item(
        &self,
        operation: TrackerOperation,
        item: IssueNumber,
        detail: String,
        apply: impl FnOnce(WorkItem) -> WorkItem,
    ) -> TrackerResult<()> {
        let now = self.clock.utc();
        let mut state = self.write()?;
        Self::take_failure(&mut state, operation)?;
        let existing = state
            .items
            .remove(&item)
            .ok_or_else(|| TrackerError::NotFound(format!("item #{item}")))?;
        state
            .items
            .insert(item, apply(existing).with_updated_at(now));
        state.mutations.push(RecordedMutation {
            operation,
            item: Some(item),
            detail,
        });
        Ok(())
    }
}

fn allocate_comment_id(state: &mut InMemoryTrackerState) -> CommentId {
    let id = CommentId::new(state.next_comment_id);
    state.next_comment_id = state.next_comment_id.saturating_add(1);
    id
}

fn join_logins(logins: &[Login]) -> String {
    logins
        .iter()
        .map(Login::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait]
impl<C> IssueTracker for InMemoryIssueTracker<C>
where
    C: Clock + Send + Sync,
{
    async fn get_item(&self, item: IssueNumber) -> TrackerResult<WorkItem> {
        let mut state = self.write()?;
        Self::take_failure(&mut state, TrackerOperation::GetItem)?;
        state
            .items
            .get(&item)
            .cloned()
            .ok_or_else(|| TrackerError::NotFound(format!("item #{item}")))
    }

    async fn list_open_items(&self) -> TrackerResult<Vec<WorkItem>> {
        let mut state = self.write()?;
        Self::take_failure(&mut state, TrackerOperation::ListOpenItems)?;
        Ok(state
            .items
            .values()
            .filter(|item| item.is_open())
            .cloned()
            .collect())
    }

    async fn list_open_items_assigned_to(&self, login: &Login) -> TrackerResult<Vec<WorkItem>> {
        let mut state = self.write()?;
        Self::take_failure(&mut state, TrackerOperation::ListOpenItems)?;
        Ok(state
            .items
            .values()
            .filter(|item| item.is_open() && item.is_assigned_to(login))
            .cloned()
            .collect())
    }

    async fn add_assignees(&self, item: IssueNumber, logins: &[Login]) -> TrackerResult<()> {
        let now = self.clock.utc();
        let mut added = Vec::new();
        self.update_item(
            TrackerOperation::AddAssignees,
            item,
            join_logins(logins),
            |existing| {
                let mut assignees = existing.assignees().to_vec();
                for login in logins {
                    if !assignees.contains(login) {
                        assignees.push(login.clone());
                        added.push(login.clone());
                    }
                }
                existing.with_assignees(assignees)
            },
        )?;
        let mut state = self.write()?;
        let timeline = state.timelines.entry(item).or_default();
        timeline.extend(added.into_iter().map(|assignee| TimelineEvent::Assigned {
            assignee,
            created_at: now,
        }));
        Ok(())
    }

    async fn remove_assignees(&self, item: IssueNumber, logins: &[Login]) -> TrackerResult<()> {
        let now = self.clock.utc();
        let mut removed = Vec::new();
        self.update_item(
            TrackerOperation::RemoveAssignees,
            item,
            join_logins(logins),
            |existing| {
                let (gone, kept): (Vec<Login>, Vec<Login>) = existing
                    .assignees()
                    .iter()
                    .cloned()
                    .partition(|login| logins.contains(login));
                removed = gone;
                existing.with_assignees(kept)
            },
        )?;
        let mut state = self.write()?;
        let timeline = state.timelines.entry(item).or_default();
        timeline.extend(removed.into_iter().map(|assignee| TimelineEvent::Unassigned {
            assignee,
            created_at: now,
        }));
        Ok(())
    }

    async fn add_label(&self, item: IssueNumber, label: &str) -> TrackerResult<()> {
        self.update_item(TrackerOperation::AddLabel, item, label.to_owned(), |existing| {
            let mut labels = existing.labels().clone();
            labels.insert(label.to_owned());
            existing.with_labels(labels)
        })
    }

    async fn remove_label(&self, item: IssueNumber, label: &str) -> TrackerResult<()> {
        self.update_item(
            TrackerOperation::RemoveLabel,
            item,
            label.to_owned(),
            |existing| {
                let mut labels = existing.labels().clone();
                labels.remove(label);
                existing.with_labels(labels)
            },
        )
    }

    async fn list_comments(&self, item: IssueNumber) -> TrackerResult<Vec<IssueComment>> {
        let mut state = self.write()?;
        Self::take_failure(&mut state, TrackerOperation::ListComments)?;
        Ok(state.comments.get(&item).cloned().unwrap_or_default())
    }

    async fn create_comment(&self, item: IssueNumber, body: &str) -> TrackerResult<IssueComment> {
        let now = self.clock.utc();
        let mut state = self.write()?;
        Self::take_failure(&mut state, TrackerOperation::CreateComment)?;
        if !state.items.contains_key(&item) {
            return Err(TrackerError::NotFound(format!("item #{item}")));
        }
        let comment = IssueComment {
            id: allocate_comment_id(&mut state),
            author: self.bot_login.clone(),
            body: body.to_owned(),
            created_at: now,
        };
        state
            .comments
            .entry(item)
            .or_default()
            .push(comment.clone());
        state.mutations.push(RecordedMutation {
            operation: TrackerOperation::CreateComment,
            item: Some(item),
            detail: comment.id.to_string(),
        });
        Ok(comment)
    }

    async fn update_comment(&self, comment: CommentId, body: &str) -> TrackerResult<()> {
        let mut state = self.write()?;
        Self::take_failure(&mut state, TrackerOperation::UpdateComment)?;
        let (item, existing) = state
            .comments
            .iter_mut()
            .find_map(|(item, comments)| {
                comments
                    .iter_mut()
                    .find(|candidate| candidate.id == comment)
                    .map(|found| (*item, found))
            })
            .ok_or_else(|| TrackerError::NotFound(format!("comment {comment}")))?;
        body.clone_into(&mut existing.body);
        state.mutations.push(RecordedMutation {
            operation: TrackerOperation::UpdateComment,
            item: Some(item),
            detail: comment.to_string(),
        });
        Ok(())
    }

    async fn delete_comment(&self, comment: CommentId) -> TrackerResult<()> {
        let mut state = self.write()?;
        Self::take_failure(&mut state, TrackerOperation::DeleteComment)?;
        let mut owner = None;
        for (item, comments) in &mut state.comments {
            let before = comments.len();
            comments.retain(|candidate| candidate.id != comment);
            if comments.len() != before {
                owner = Some(*item);
            }
        }
        state.mutations.push(RecordedMutation {
            operation: TrackerOperation::DeleteComment,
            item: owner,
            detail: comment.to_string(),
        });
        Ok(())
    }

    async fn list_timeline(&self, item: IssueNumber) -> TrackerResult<Vec<TimelineEvent>> {
        let mut state = self.write()?;
        Self::take_failure(&mut state, TrackerOperation::ListTimeline)?;
        Ok(state.timelines.get(&item).cloned().unwrap_or_default())
    }

    async fn get_change_request(
        &self,
        number: PullRequestNumber,
    ) -> TrackerResult<ChangeRequest> {
        let mut state = self.write()?;
        Self::take_failure(&mut state, TrackerOperation::GetChangeRequest)?;
        state
            .change_requests
            .get(&number)
            .cloned()
            .ok_or_else(|| TrackerError::NotFound(format!("change request #{number}")))
    }

    async fn search_change_request_mentions(
        &self,
        item: IssueNumber,
    ) -> TrackerResult<Vec<ChangeRequestMention>> {
        let mut state = self.write()?;
        Self::take_failure(&mut state, TrackerOperation::SearchMentions)?;
        let needle = item.to_string();
        Ok(state
            .change_requests
            .values()
            .filter(|change_request| {
                change_request
                    .body()
                    .is_some_and(|body| body.contains(&needle))
            })
            .map(|change_request| ChangeRequestMention {
                number: change_request.number(),
                body: change_request.body().map(str::to_owned),
            })
            .collect())
    }
}
