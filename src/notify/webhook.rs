//! Slack-compatible incoming-webhook notifier.

use super::{ChatMessage, ChatNotifier, NotifierError};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::sync::Arc;
use std::time::Duration;

/// Posts `{"text": ..}` payloads to a webhook URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    http: Client,
    url: Url,
}

impl WebhookNotifier {
    /// Creates a notifier posting to `url` with a ten second timeout.
    ///
    /// # Errors
    ///
    /// Returns [`NotifierError::Transport`] when the HTTP client cannot be
    /// built.
    pub fn new(url: Url) -> Result<Self, NotifierError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| NotifierError::Transport(Arc::new(err)))?;
        Ok(Self { http, url })
    }
}

#[async_trait]
impl ChatNotifier for WebhookNotifier {
    async fn send(&self, message: &ChatMessage) -> Result<(), NotifierError> {
        let response = self
            .http
            .post(self.url.clone())
            .json(message)
            .send()
            .await
            .map_err(|err| NotifierError::Transport(Arc::new(err)))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotifierError::Rejected(status.as_u16()))
        }
    }
}
