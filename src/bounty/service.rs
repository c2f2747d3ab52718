//! Applies bounty commands to work items.

use super::domain::{BountyCommand, BountyDomainError, BountyLabel, find_summary, summary_marker};
use crate::assignment::domain::{ActorKind, CommentEvent};
use crate::notify::{ChatMessage, ChatNotifier, notify_best_effort};
use crate::tracker::{
    domain::{IssueNumber, Login, RepositoryFullName},
    ports::{IssueTracker, TrackerError},
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

/// Errors that stop a bounty command from being applied.
#[derive(Debug, Error)]
pub enum BountyError {
    /// The command or current bounty is invalid.
    #[error(transparent)]
    Domain(#[from] BountyDomainError),

    /// The item or its comments could not be read.
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// What a bounty command did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BountyOutcome {
    /// The comment carried no bounty command, or came from a bot.
    NoCommand,
    /// The command was already applied by an earlier delivery.
    AlreadyApplied,
    /// The bounty was raised.
    Added {
        /// Amount added.
        amount: u64,
        /// New total.
        total: u64,
        /// Whether the label swap succeeded.
        label_updated: bool,
        /// Whether the summary comment was written.
        summary_updated: bool,
    },
}

/// Raises bounties from `/bounty $N` comments.
pub struct BountyService<T>
where
    T: IssueTracker,
{
    tracker: Arc<T>,
    notifier: Arc<dyn ChatNotifier>,
    repository: RepositoryFullName,
    label_prefix: String,
    chat_channel: Option<String>,
}

impl<T> Clone for BountyService<T>
where
    T: IssueTracker,
{
    fn clone(&self) -> Self {
        Self {
            tracker: Arc::clone(&self.tracker),
            notifier: Arc::clone(&self.notifier),
            repository: self.repository.clone(),
            label_prefix: self.label_prefix.clone(),
            chat_channel: self.chat_channel.clone(),
        }
    }
}

impl<T> BountyService<T>
where
    T: IssueTracker,
{
    /// Creates the service.
    #[must_use]
    pub fn new(
        tracker: Arc<T>,
        notifier: Arc<dyn ChatNotifier>,
        repository: RepositoryFullName,
        label_prefix: impl Into<String>,
    ) -> Self {
        Self {
            tracker,
            notifier,
            repository,
            label_prefix: label_prefix.into(),
            chat_channel: None,
        }
    }

    /// Routes bounty announcements to a named channel.
    #[must_use]
    pub fn with_chat_channel(mut self, channel: impl Into<String>) -> Self {
        self.chat_channel = Some(channel.into());
        self
    }

    /// Applies the bounty command carried by `event`, if any.
    ///
    /// Label and summary-comment failures are logged and reported in the
    /// outcome; the chat announcement is best-effort.
    ///
    /// # Errors
    ///
    /// Returns [`BountyError`] when the amount is invalid, the total would
    /// overflow, or the item or its comments cannot be read.
    #[instrument(skip(self, event), fields(item = %event.item, actor = %event.actor))]
    pub async fn handle_comment(
        &self,
        event: &CommentEvent,
    ) -> Result<BountyOutcome, BountyError> {
        if event.actor_kind == ActorKind::Bot {
            return Ok(BountyOutcome::NoCommand);
        }
        let Some(command) = BountyCommand::parse(&event.text)? else {
            return Ok(BountyOutcome::NoCommand);
        };

        let comments = self.tracker.list_comments(event.item).await?;
        let summary = find_summary(&comments);
        if summary.is_some_and(|(_, last)| last == event.comment_id) {
            debug!("bounty command already applied");
            return Ok(BountyOutcome::AlreadyApplied);
        }

        let item = self.tracker.get_item(event.item).await?;
        let current = BountyLabel::find(item.labels(), &self.label_prefix);
        let next = BountyLabel::add(current.as_ref(), &self.label_prefix, command.amount())?;

        let label_updated = match self.swap_label(event.item, current.as_ref(), &next).await {
            Ok(()) => true,
            Err(err) => {
                error!(error = %err, label = next.name(), "bounty label update failed");
                false
            }
        };

        let body = format!(
            "💰 A bounty has been added!\n\nThis issue now has a total bounty of **{}** \
             thanks to @{}.\n\nWant to contribute? Solve this issue and claim the reward.\n\n{}",
            next.name(),
            event.actor,
            summary_marker(event.comment_id)
        );
        let written = match summary {
            Some((existing, _)) => self.tracker.update_comment(existing.id, &body).await,
            None => self.tracker.create_comment(event.item, &body).await.map(drop),
        };
        let summary_updated = match written {
            Ok(()) => true,
            Err(err) => {
                error!(error = %err, "bounty summary comment failed");
                false
            }
        };

        self.announce(event.item, &event.actor, command.amount(), &next)
            .await;
        info!(amount = command.amount(), total = next.total(), "bounty added");
        Ok(BountyOutcome::Added {
            amount: command.amount(),
            total: next.total(),
            label_updated,
            summary_updated,
        })
    }

    async fn swap_label(
        &self,
        item: IssueNumber,
        current: Option<&BountyLabel>,
        next: &BountyLabel,
    ) -> Result<(), TrackerError> {
        if let Some(previous) = current {
            self.tracker.remove_label(item, previous.name()).await?;
        }
        self.tracker.add_label(item, next.name()).await
    }

    async fn announce(
        &self,
        item: IssueNumber,
        sponsor: &Login,
        amount: u64,
        total: &BountyLabel,
    ) {
        let text = format!(
            "🚀 *Bounty Alert!*\n@{sponsor} has added a *{prefix}{amount}* bounty to \
             <https://github.com/{repository}/issues/{item}|#{item}>.\n\
             The total bounty for this issue is now *{total}*.",
            prefix = self.label_prefix,
            repository = self.repository.as_str(),
            total = total.name(),
        );
        let message = match &self.chat_channel {
            Some(channel) => ChatMessage::new(text).with_channel(channel.clone()),
            None => ChatMessage::new(text),
        };
        notify_best_effort(self.notifier.as_ref(), message).await;
    }
}
