//! Microsoft Teams incoming-webhook channel.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::ChannelError;
use crate::message::ChatMessage;
use crate::NotifyChannel;

/// Default per-request timeout for webhook posts.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest response body kept in an error, in bytes.
const MAX_ERROR_BODY: usize = 512;

/// Teams incoming-webhook notification channel.
pub struct TeamsChannel {
    name: String,
    webhook_url: String,
    client: reqwest::Client,
}

impl TeamsChannel {
    /// Create a channel posting to `webhook_url` with an explicit timeout.
    ///
    /// A blank URL yields a disabled channel whose sends fail with `NotConfigured`.
    pub fn new(
        name: impl Into<String>,
        webhook_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            name: name.into(),
            webhook_url: webhook_url.into().trim().to_string(),
            client,
        })
    }
}

#[async_trait]
impl NotifyChannel for TeamsChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn enabled(&self) -> bool {
        !self.webhook_url.is_empty()
    }

    async fn send(&self, message: &ChatMessage) -> Result<(), ChannelError> {
        if !self.enabled() {
            return Err(ChannelError::NotConfigured(self.name.clone()));
        }

        debug!(channel = %self.name, bytes = message.text.len(), "Sending notification");

        let response = self.client.post(&self.webhook_url).json(message).send().await?;

        if response.status().is_success() {
            debug!(channel = %self.name, "Notification sent successfully");
            Ok(())
        } else {
            let status = response.status();
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }

            warn!(
                channel = %self.name,
                status = %status,
                body = %body,
                "Teams webhook request failed"
            );

            Err(ChannelError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}
