//! Fire-and-forget chat notifications.
//!
//! Notifications never influence reconciliation: a failed send is logged
//! and dropped. The port is [`ChatNotifier`]; adapters live in [`webhook`]
//! (Slack-compatible incoming webhooks) and [`memory`].

pub mod memory;
pub mod webhook;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// A chat message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<String>,
    text: String,
}

impl ChatMessage {
    /// Creates a message for the webhook's default channel.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            channel: None,
            text: text.into(),
        }
    }

    /// Routes the message to a named channel.
    #[must_use]
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Returns the channel override, if any.
    #[must_use]
    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    /// Returns the message text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Errors returned by notifier adapters.
#[derive(Debug, Clone, Error)]
pub enum NotifierError {
    /// The request could not be delivered.
    #[error("chat transport failure: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),

    /// The chat service refused the message.
    #[error("chat service rejected message with status {0}")]
    Rejected(u16),
}

/// Chat notification port.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatNotifier: Send + Sync {
    /// Delivers one message.
    ///
    /// # Errors
    ///
    /// Returns [`NotifierError`] when delivery fails.
    async fn send(&self, message: &ChatMessage) -> Result<(), NotifierError>;
}

/// Sends `message`, logging and discarding any failure.
pub async fn notify_best_effort(notifier: &dyn ChatNotifier, message: ChatMessage) {
    match notifier.send(&message).await {
        Ok(()) => debug!(text = message.text(), "chat notification sent"),
        Err(err) => warn!(error = %err, "chat notification failed"),
    }
}

#[cfg(test)]
mod tests;
