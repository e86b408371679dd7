//! Per-service delivery of alert messages.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use notify::{ChatMessage, NotifyChannel, TeamsChannel};
use tracing::{error, info, warn};

use crate::classifier::ServiceTag;
use crate::config::WebhookConfig;
use crate::error::DispatchError;
use crate::format::format_test_message;

/// Routes messages to the webhook owned by each service.
pub struct Dispatcher {
    channels: BTreeMap<ServiceTag, Arc<dyn NotifyChannel>>,
}

impl Dispatcher {
    /// One Teams channel per configured webhook, each with its own timeout.
    pub fn from_config(webhooks: &WebhookConfig, timeout: Duration) -> Result<Self, DispatchError> {
        let mut channels: BTreeMap<ServiceTag, Arc<dyn NotifyChannel>> = BTreeMap::new();
        for (service, url) in webhooks.iter() {
            let channel = TeamsChannel::new(service.as_str(), url, timeout)
                .map_err(|source| DispatchError::Channel { service, source })?;
            channels.insert(service, Arc::new(channel));
        }
        Ok(Self { channels })
    }

    /// Create a dispatcher with specific channels.
    #[must_use]
    pub fn with_channels(
        channels: impl IntoIterator<Item = (ServiceTag, Arc<dyn NotifyChannel>)>,
    ) -> Self {
        Self {
            channels: channels
                .into_iter()
                .filter(|(service, _)| service.is_routable())
                .collect(),
        }
    }

    /// Services with a channel, in dispatch order.
    pub fn services(&self) -> impl Iterator<Item = ServiceTag> + '_ {
        self.channels.keys().copied()
    }

    /// Deliver a message, returning the failure cause.
    pub async fn try_dispatch(&self, service: ServiceTag, message: &str) -> Result<(), DispatchError> {
        let channel = self
            .channels
            .get(&service)
            .filter(|channel| channel.enabled())
            .ok_or(DispatchError::NotConfigured(service))?;

        channel
            .send(&ChatMessage::new(message))
            .await
            .map_err(|source| DispatchError::Channel { service, source })
    }

    /// Deliver a message; failures are logged and reported as `false`.
    pub async fn dispatch(&self, service: ServiceTag, message: &str) -> bool {
        match self.try_dispatch(service, message).await {
            Ok(()) => {
                info!(service = %service, "Alert sent");
                true
            }
            Err(e @ DispatchError::NotConfigured(_)) => {
                error!(service = %service, error = %e, "Configuration error, alert not sent");
                false
            }
            Err(e) => {
                let transient = matches!(&e, DispatchError::Channel { source, .. } if source.is_transient());
                warn!(service = %service, transient, error = %e, "Failed to send alert");
                false
            }
        }
    }

    /// Post a connectivity test message to every configured webhook.
    pub async fn test_webhooks(&self) -> Vec<(ServiceTag, Result<(), DispatchError>)> {
        let now = Local::now().naive_local();
        let mut results = Vec::with_capacity(self.channels.len());
        for service in self.services() {
            let message = format_test_message(service, &now);
            let result = self.try_dispatch(service, &message).await;
            results.push((service, result));
        }
        results
    }
}
