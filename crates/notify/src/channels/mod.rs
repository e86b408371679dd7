//! Notification channel implementations.

pub mod teams;

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::message::ChatMessage;

/// Trait for notification channels (Teams incoming webhooks, test doubles).
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Get the name of this channel.
    fn name(&self) -> &str;

    /// Check if this channel is enabled/configured.
    fn enabled(&self) -> bool;

    /// Deliver a message. Exactly one attempt; no retries.
    async fn send(&self, message: &ChatMessage) -> Result<(), ChannelError>;
}
