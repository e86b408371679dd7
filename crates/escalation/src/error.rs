//! Error taxonomy for the escalation monitor.
//!
//! - [`ConfigError`]: fatal at startup; a missing webhook is recoverable
//!   per service at dispatch time (see [`DispatchError::NotConfigured`]).
//! - [`FetchError`]: fails one cycle, retried on the next tick.
//! - [`DispatchError`]: isolated to one service batch.

use thiserror::Error;

use crate::classifier::ServiceTag;

/// Invalid or incomplete startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting `{key}` (set {env} or `{key}` in the config file)")]
    Missing { key: &'static str, env: &'static str },

    #[error("invalid value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("no webhook configured for any service (set ATLAS_WEBHOOK_URL, SNOWFLAKE_WEBHOOK_URL or SALESFORCE_WEBHOOK_URL)")]
    NoWebhooks,

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// The tracker could not be queried or answered with something unusable.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("malformed response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("ticket source unavailable: {0}")]
    Unavailable(String),
}

/// A service batch could not be delivered.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no webhook configured for service `{0}`")]
    NotConfigured(ServiceTag),

    #[error("delivery to `{service}` webhook failed: {source}")]
    Channel {
        service: ServiceTag,
        #[source]
        source: notify::ChannelError,
    },
}

impl DispatchError {
    /// The service whose batch failed.
    #[must_use]
    pub const fn service(&self) -> ServiceTag {
        match self {
            Self::NotConfigured(service) | Self::Channel { service, .. } => *service,
        }
    }
}
