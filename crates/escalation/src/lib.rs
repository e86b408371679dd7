//! Escalation ticket monitor.
//!
//! Polls a saved work item query, picks out new escalations, works out
//! which product team owns each one and posts a grouped alert to that
//! team's chat webhook.
//!
//! # Architecture
//!
//! - [`source`]: where tickets come from (live tracker or fixed samples)
//! - [`classifier`]: ticket → [`ServiceTag`] routing rules
//! - [`dedup`]: tickets already alerted in this process
//! - [`format`]: alert message rendering
//! - [`dispatch`]: per-service webhook delivery
//! - [`monitor`]: the cycle loop tying the above together
//! - [`config`]: file + environment settings

pub mod classifier;
pub mod config;
pub mod dedup;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod monitor;
pub mod source;
pub mod ticket;

pub use classifier::{classify, ServiceTag};
pub use config::{MonitorConfig, SourceKind, WebhookConfig};
pub use dedup::SeenSet;
pub use dispatch::Dispatcher;
pub use error::{ConfigError, DispatchError, FetchError};
pub use format::{format_alert, AlertBatch};
pub use monitor::{CycleSummary, Monitor, SeenPolicy};
pub use source::{LiveSource, SimulatedSource, TicketSource};
pub use ticket::Ticket;
