//! Notice rendering and deduplicated posting.

use super::{NoticeError, ReconcileResult};
use crate::assignment::domain::{Notice, NoticeKind};
use crate::notify::{ChatMessage, ChatNotifier, notify_best_effort};
use crate::tracker::{
    domain::{IssueComment, IssueNumber, RepositoryFullName},
    ports::IssueTracker,
};
use minijinja::{Environment, context};
use std::sync::Arc;
use tracing::debug;

const ASSIGNED: &str = "Hello @{{ notice.claimant }}! You've been assigned to \
[{{ repository }} issue #{{ item }}](https://github.com/{{ repository }}/issues/{{ item }}). \
You have {{ notice.deadline_hours }} hours to open a pull request.";

const ALREADY_CLAIMED: &str =
    "@{{ notice.actor }}, you are already assigned to this issue.";

const CLAIMED_BY_OTHER: &str = "@{{ notice.actor }}, this issue is already assigned to \
@{{ notice.claimant }}. Please pick another issue or wait until it is released.";

const CLAIM_LIMIT: &str = "@{{ notice.actor }}, you cannot be assigned to this issue because \
you are already assigned to the following issues without an open pull request: \
{% for number in notice.blocking_items %}#{{ number }}{% if not loop.last %}, {% endif %}{% endfor %}. \
Please submit a pull request for these issues before getting assigned to a new one.";

const RELEASED: &str = "@{{ notice.claimant }}, you have been unassigned from this issue. \
It's now open for others. You can reassign it anytime by typing /assign.";

const RELEASE_DENIED: &str = "@{{ notice.actor }}, only the current assignee \
(@{{ notice.claimant }}) can release this issue.";

const STALE_RELEASED: &str = "⏰ This issue has been automatically unassigned from \
@{{ notice.claimant }} due to {{ notice.threshold_hours }} hours of inactivity. \
The issue is now available for anyone to work on again.";

const GRACE_STARTED: &str = "@{{ notice.claimant }}, your pull request \
#{{ notice.change_request }} was closed without being merged. You will be unassigned \
in {{ notice.grace_hours }} hours unless a new pull request for this issue is opened.\n\n\
{{ notice.marker }}";

const GRACE_CANCELLED: &str = "A new pull request was opened. @{{ notice.claimant }} \
stays assigned to this issue.";

const GRACE_EXPIRED: &str = "{% if notice.unassigned %}@{{ notice.claimant }} has been \
unassigned because no new pull request was opened during the grace period.{% else %}\
The grace period for @{{ notice.claimant }} ended; they were no longer assigned.{% endif %} \
The issue is now available for anyone to work on.";

const TAKEOVER_COMPLETED: &str = "@{{ notice.claimant }} has taken over this issue from \
@{{ notice.previous }}, whose linked pull requests saw no activity for \
{{ notice.threshold_days }} days.";

const TAKEOVER_ROLLED_BACK: &str = "The takeover by @{{ notice.challenger }} could not be \
completed. @{{ notice.previous }} remains assigned.";

const MANUAL_INTERVENTION: &str = "⚠️ Manual intervention required: the takeover of this \
issue from @{{ notice.previous }} by @{{ notice.challenger }} failed and could not be \
undone ({{ notice.detail }}). A maintainer should check the assignees and labels.";

const COMMAND_FAILED: &str = "@{{ notice.actor }}, your command could not be completed \
right now ({{ notice.detail }}). Please try again later.";

const GRACE_REVIEW_NEEDED: &str = "⚠️ Manual review required: the grace period on this issue \
has ended but its record is incomplete ({{ notice.detail }}). The `{{ notice.label }}` label \
was left in place for a maintainer to resolve.";

const CHAT_ASSIGNED: &str = "@{{ notice.claimant }} claimed \
<https://github.com/{{ repository }}/issues/{{ item }}|#{{ item }}>.";

const CHAT_RELEASED: &str = "<https://github.com/{{ repository }}/issues/{{ item }}|#{{ item }}> \
was released by @{{ notice.claimant }} and is open again.";

const CHAT_STALE: &str = "<https://github.com/{{ repository }}/issues/{{ item }}|#{{ item }}> \
was unassigned from @{{ notice.claimant }} after {{ notice.threshold_hours }} hours of inactivity.";

const CHAT_GRACE_EXPIRED: &str = "<https://github.com/{{ repository }}/issues/{{ item }}|#{{ item }}> \
is open again after @{{ notice.claimant }}'s grace period ended.";

const CHAT_TAKEOVER: &str = "@{{ notice.claimant }} took over \
<https://github.com/{{ repository }}/issues/{{ item }}|#{{ item }}> from @{{ notice.previous }}.";

const fn kind_name(kind: &NoticeKind) -> &'static str {
    match kind {
        NoticeKind::Assigned { .. } => "assigned",
        NoticeKind::AlreadyClaimed { .. } => "already_claimed",
        NoticeKind::ClaimedByOther { .. } => "claimed_by_other",
        NoticeKind::ClaimLimitReached { .. } => "claim_limit_reached",
        NoticeKind::Released { .. } => "released",
        NoticeKind::ReleaseDenied { .. } => "release_denied",
        NoticeKind::StaleReleased { .. } => "stale_released",
        NoticeKind::GraceStarted { .. } => "grace_started",
        NoticeKind::GraceCancelled { .. } => "grace_cancelled",
        NoticeKind::GraceExpired { .. } => "grace_expired",
        NoticeKind::TakeoverCompleted { .. } => "takeover_completed",
        NoticeKind::TakeoverRolledBack { .. } => "takeover_rolled_back",
        NoticeKind::ManualIntervention { .. } => "manual_intervention",
        NoticeKind::CommandFailed { .. } => "command_failed",
        NoticeKind::GraceReviewNeeded { .. } => "grace_review_needed",
    }
}

const fn comment_template(kind: &NoticeKind) -> &'static str {
    match kind {
        NoticeKind::Assigned { .. } => ASSIGNED,
        NoticeKind::AlreadyClaimed { .. } => ALREADY_CLAIMED,
        NoticeKind::ClaimedByOther { .. } => CLAIMED_BY_OTHER,
        NoticeKind::ClaimLimitReached { .. } => CLAIM_LIMIT,
        NoticeKind::Released { .. } => RELEASED,
        NoticeKind::ReleaseDenied { .. } => RELEASE_DENIED,
        NoticeKind::StaleReleased { .. } => STALE_RELEASED,
        NoticeKind::GraceStarted { .. } => GRACE_STARTED,
        NoticeKind::GraceCancelled { .. } => GRACE_CANCELLED,
        NoticeKind::GraceExpired { .. } => GRACE_EXPIRED,
        NoticeKind::TakeoverCompleted { .. } => TAKEOVER_COMPLETED,
        NoticeKind::TakeoverRolledBack { .. } => TAKEOVER_ROLLED_BACK,
        NoticeKind::ManualIntervention { .. } => MANUAL_INTERVENTION,
        NoticeKind::CommandFailed { .. } => COMMAND_FAILED,
        NoticeKind::GraceReviewNeeded { .. } => GRACE_REVIEW_NEEDED,
    }
}

const fn chat_template(kind: &NoticeKind) -> Option<&'static str> {
    match kind {
        NoticeKind::Assigned { .. } => Some(CHAT_ASSIGNED),
        NoticeKind::Released { .. } => Some(CHAT_RELEASED),
        NoticeKind::StaleReleased { .. } => Some(CHAT_STALE),
        NoticeKind::GraceExpired {
            unassigned: true, ..
        } => Some(CHAT_GRACE_EXPIRED),
        NoticeKind::TakeoverCompleted { .. } => Some(CHAT_TAKEOVER),
        _ => None,
    }
}

/// Renders notice bodies and chat texts.
#[derive(Debug, Clone)]
pub struct NoticeRenderer {
    environment: Arc<Environment<'static>>,
    repository: RepositoryFullName,
}

impl NoticeRenderer {
    /// Creates a renderer for notices about `repository`.
    #[must_use]
    pub fn new(repository: RepositoryFullName) -> Self {
        Self {
            environment: Arc::new(Environment::new()),
            repository,
        }
    }

    fn render(
        &self,
        template: &str,
        kind: &NoticeKind,
        item: IssueNumber,
    ) -> Result<String, NoticeError> {
        self.environment
            .render_str(
                template,
                context! {
                    notice => kind,
                    repository => self.repository.as_str(),
                    item => item.value(),
                },
            )
            .map_err(|source| NoticeError::Render {
                kind: kind_name(kind),
                source,
            })
    }

    /// Renders the comment body for `notice`, ending with its dedup marker.
    ///
    /// # Errors
    ///
    /// Returns [`NoticeError::Render`] when the template fails.
    pub fn comment_body(&self, notice: &Notice, item: IssueNumber) -> Result<String, NoticeError> {
        let text = self.render(comment_template(&notice.kind), &notice.kind, item)?;
        Ok(format!("{text}\n\n{}", notice.key.marker()))
    }

    /// Renders the chat text for `kind`, when the kind is announced in chat.
    ///
    /// # Errors
    ///
    /// Returns [`NoticeError::Render`] when the template fails.
    pub fn chat_text(
        &self,
        kind: &NoticeKind,
        item: IssueNumber,
    ) -> Result<Option<String>, NoticeError> {
        chat_template(kind)
            .map(|template| self.render(template, kind, item))
            .transpose()
    }
}

/// Posts notices at most once per dedup key and mirrors selected ones to
/// chat.
pub struct NoticeBoard<T>
where
    T: IssueTracker,
{
    tracker: Arc<T>,
    renderer: NoticeRenderer,
    notifier: Arc<dyn ChatNotifier>,
    chat_channel: Option<String>,
}

impl<T> Clone for NoticeBoard<T>
where
    T: IssueTracker,
{
    fn clone(&self) -> Self {
        Self {
            tracker: Arc::clone(&self.tracker),
            renderer: self.renderer.clone(),
            notifier: Arc::clone(&self.notifier),
            chat_channel: self.chat_channel.clone(),
        }
    }
}

impl<T> NoticeBoard<T>
where
    T: IssueTracker,
{
    /// Creates a notice board.
    #[must_use]
    pub const fn new(
        tracker: Arc<T>,
        renderer: NoticeRenderer,
        notifier: Arc<dyn ChatNotifier>,
        chat_channel: Option<String>,
    ) -> Self {
        Self {
            tracker,
            renderer,
            notifier,
            chat_channel,
        }
    }

    /// Posts `notice` on `item` unless a comment with the same key exists.
    ///
    /// Returns the created comment, or `None` when the notice was already
    /// present.
    ///
    /// # Errors
    ///
    /// Returns [`super::ReconcileError`] when rendering, listing or posting
    /// fails.
    pub async fn post(
        &self,
        item: IssueNumber,
        notice: &Notice,
    ) -> ReconcileResult<Option<IssueComment>> {
        let existing = self.tracker.list_comments(item).await?;
        if existing.iter().any(|comment| notice.key.is_marked_in(comment)) {
            debug!(item = %item, key = %notice.key, "notice already posted");
            return Ok(None);
        }
        let body = self.renderer.comment_body(notice, item)?;
        let comment = self.tracker.create_comment(item, &body).await?;
        self.announce(item, &notice.kind).await;
        Ok(Some(comment))
    }

    async fn announce(&self, item: IssueNumber, kind: &NoticeKind) {
        let text = match self.renderer.chat_text(kind, item) {
            Ok(Some(text)) => text,
            Ok(None) => return,
            Err(err) => {
                debug!(item = %item, error = %err, "chat text not rendered");
                return;
            }
        };
        let message = match &self.chat_channel {
            Some(channel) => ChatMessage::new(text).with_channel(channel.clone()),
            None => ChatMessage::new(text),
        };
        notify_best_effort(self.notifier.as_ref(), message).await;
    }
}
