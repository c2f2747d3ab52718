//! In-process notifiers for tests and unconfigured deployments.

use super::{ChatMessage, ChatNotifier, NotifierError};
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};

/// Keeps every delivered message in memory.
///
/// Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<RwLock<Vec<ChatMessage>>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the messages delivered so far.
    #[must_use]
    pub fn sent(&self) -> Vec<ChatMessage> {
        self.sent
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ChatNotifier for RecordingNotifier {
    async fn send(&self, message: &ChatMessage) -> Result<(), NotifierError> {
        self.sent
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());
        Ok(())
    }
}

/// Discards every message. Used when no chat endpoint is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl ChatNotifier for DisabledNotifier {
    async fn send(&self, _message: &ChatMessage) -> Result<(), NotifierError> {
        Ok(())
    }
}
