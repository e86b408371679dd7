//! Chat message payloads.

use serde::{Deserialize, Serialize};

/// A plain markdown message for an incoming webhook.
///
/// Serializes to `{"text": "..."}`, the simplest payload Teams incoming
/// webhooks render (bold, links and bullets are supported).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
}

impl ChatMessage {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl From<String> for ChatMessage {
    fn from(text: String) -> Self {
        Self { text }
    }
}
