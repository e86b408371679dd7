//! Chat webhook notifications for escalation alerts.
//!
//! This crate delivers plain markdown messages to chat incoming webhooks.
//! Routing (which message goes to which webhook) is the caller's concern;
//! a channel only knows its own destination.
//!
//! # Usage
//!
//! ```no_run
//! use notify::{ChatMessage, NotifyChannel, TeamsChannel};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), notify::ChannelError> {
//! let channel = TeamsChannel::new(
//!     "atlas",
//!     "https://example.webhook.office.com/webhookb2/...",
//!     Duration::from_secs(30),
//! )?;
//! channel.send(&ChatMessage::new("**New Atlas Tickets**: 1 ticket")).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`NotifyChannel`] trait defines the interface for notification channels
//! - [`TeamsChannel`] implements Teams incoming-webhook delivery
//! - [`ChannelError`] separates transport failures from non-2xx answers

pub mod channels;
pub mod error;
pub mod message;

pub use channels::teams::{TeamsChannel, DEFAULT_TIMEOUT};
pub use channels::NotifyChannel;
pub use error::ChannelError;
pub use message::ChatMessage;
