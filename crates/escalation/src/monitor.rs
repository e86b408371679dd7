//! The polling loop: fetch → filter → classify → group → format → dispatch.
//!
//! Cycles run strictly one at a time. A fetch failure fails the cycle, not
//! the process; one service's dead webhook never blocks another's batch.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::Local;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::classifier::{classify, ServiceTag};
use crate::dedup::SeenSet;
use crate::dispatch::Dispatcher;
use crate::error::FetchError;
use crate::format::{format_alert, AlertBatch};
use crate::source::TicketSource;

/// When a dispatched ticket counts as seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeenPolicy {
    /// Mark every processed ticket, even if its batch failed to deliver.
    /// A permanently broken webhook cannot cause a retry storm, but a
    /// transient outage loses those alerts.
    #[default]
    Always,
    /// Only mark tickets whose batch was delivered; failed batches are
    /// retried on the next cycle.
    OnSuccess,
}

impl fmt::Display for SeenPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Always => "always",
            Self::OnSuccess => "on-success",
        })
    }
}

impl FromStr for SeenPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "always" => Ok(Self::Always),
            "on-success" => Ok(Self::OnSuccess),
            other => Err(format!("expected `always` or `on-success`, got `{other}`")),
        }
    }
}

/// Counts for one completed cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub cycle: u64,
    /// Tickets returned by the source.
    pub fetched: usize,
    /// Of those, tickets in the `New` state.
    pub actionable: usize,
    /// Of those, tickets not seen in an earlier cycle.
    pub new: usize,
    /// New tickets no rule matched.
    pub unclassified: usize,
    /// Batches delivered.
    pub dispatched: usize,
    /// Batches that failed to deliver.
    pub failed: usize,
    /// Tickets contained in delivered batches.
    pub alerted_tickets: usize,
}

impl fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycle #{}: fetched {}, new {}, unclassified {}, alerts sent {}, alerts failed {}",
            self.cycle, self.fetched, self.new, self.unclassified, self.dispatched, self.failed
        )
    }
}

/// Escalation monitor state: the source, the routes and what was already alerted.
pub struct Monitor {
    source: Box<dyn TicketSource>,
    dispatcher: Dispatcher,
    seen: SeenSet,
    policy: SeenPolicy,
    cycles: u64,
}

impl Monitor {
    #[must_use]
    pub fn new(source: Box<dyn TicketSource>, dispatcher: Dispatcher) -> Self {
        Self {
            source,
            dispatcher,
            seen: SeenSet::new(),
            policy: SeenPolicy::default(),
            cycles: 0,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: SeenPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    pub fn policy(&self) -> SeenPolicy {
        self.policy
    }

    /// Run a single fetch-classify-dispatch cycle.
    pub async fn run_once(&mut self) -> Result<CycleSummary, FetchError> {
        self.cycles += 1;
        let mut summary = CycleSummary {
            cycle: self.cycles,
            ..CycleSummary::default()
        };

        debug!(cycle = summary.cycle, source = self.source.name(), "Fetching tickets");
        let tickets = match self.source.fetch().await {
            Ok(tickets) => tickets,
            Err(e) => {
                error!(
                    cycle = summary.cycle,
                    source = self.source.name(),
                    error = %e,
                    "Failed to fetch escalation tickets"
                );
                return Err(e);
            }
        };
        summary.fetched = tickets.len();

        let mut batches: BTreeMap<ServiceTag, AlertBatch> = BTreeMap::new();
        let mut in_cycle: HashSet<String> = HashSet::new();

        for ticket in tickets {
            if !ticket.is_actionable() {
                debug!(ticket = %ticket.id, state = %ticket.state, "Skipping non-new ticket");
                continue;
            }
            summary.actionable += 1;

            if !self.seen.is_new(&ticket.id) || !in_cycle.insert(ticket.id.clone()) {
                continue;
            }
            summary.new += 1;

            let service = classify(&ticket);
            if !service.is_routable() {
                warn!(
                    cycle = summary.cycle,
                    ticket = %ticket.id,
                    title = %ticket.summary(),
                    "Ticket did not match any service"
                );
                summary.unclassified += 1;
                self.seen.mark_seen(&ticket.id);
                continue;
            }

            info!(
                cycle = summary.cycle,
                ticket = %ticket.id,
                service = %service,
                "Detected escalation"
            );
            batches
                .entry(service)
                .or_insert_with(|| AlertBatch::new(service))
                .tickets
                .push(ticket);
        }

        let report_time = Local::now().naive_local();
        for batch in batches.into_values() {
            let message = format_alert(&batch, &report_time);
            let delivered = self.dispatcher.dispatch(batch.service, &message).await;

            if delivered {
                summary.dispatched += 1;
                summary.alerted_tickets += batch.len();
            } else {
                summary.failed += 1;
                let ids: Vec<&str> = batch.tickets.iter().map(|t| t.id.as_str()).collect();
                warn!(
                    cycle = summary.cycle,
                    service = %batch.service,
                    tickets = ?ids,
                    policy = %self.policy,
                    "Alert batch not delivered"
                );
            }

            if delivered || self.policy == SeenPolicy::Always {
                for ticket in &batch.tickets {
                    self.seen.mark_seen(&ticket.id);
                }
            }
        }

        info!(
            cycle = summary.cycle,
            fetched = summary.fetched,
            new = summary.new,
            dispatched = summary.dispatched,
            failed = summary.failed,
            seen = self.seen.len(),
            "Cycle complete"
        );

        Ok(summary)
    }

    /// Run cycles until `shutdown` is cancelled, sleeping `interval` between
    /// them. Cancellation is observed between cycles only. Returns the number
    /// of cycles run.
    pub async fn run_continuous(&mut self, interval: Duration, shutdown: CancellationToken) -> u64 {
        info!(
            interval_secs = interval.as_secs(),
            source = self.source.name(),
            policy = %self.policy,
            "Starting continuous monitoring"
        );

        let mut ran = 0;
        while !shutdown.is_cancelled() {
            if let Err(e) = self.run_once().await {
                debug!(error = %e, "Cycle failed, retrying at next interval");
            }
            ran += 1;

            tokio::select! {
                () = shutdown.cancelled() => {}
                () = tokio::time::sleep(interval) => {}
            }
        }

        info!(cycles = ran, "Monitoring stopped");
        ran
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockTicketSource;
    use crate::ticket::Ticket;
    use async_trait::async_trait;
    use notify::{ChannelError, ChatMessage, NotifyChannel};
    use std::sync::{Arc, Mutex};

    struct RecordingChannel {
        fail: bool,
        sent: Mutex<Vec<String>>,
    }

    impl RecordingChannel {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fail,
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotifyChannel for RecordingChannel {
        fn name(&self) -> &str {
            "recording"
        }

        fn enabled(&self) -> bool {
            true
        }

        async fn send(&self, message: &ChatMessage) -> Result<(), ChannelError> {
            self.sent.lock().unwrap().push(message.text.clone());
            if self.fail {
                Err(ChannelError::Other("webhook down".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn dispatcher(channels: &[(ServiceTag, &Arc<RecordingChannel>)]) -> Dispatcher {
        Dispatcher::with_channels(channels.iter().map(|(tag, channel)| {
            let channel: Arc<dyn NotifyChannel> = Arc::clone(*channel) as Arc<dyn NotifyChannel>;
            (*tag, channel)
        }))
    }

    fn source_returning(tickets: Vec<Ticket>) -> MockTicketSource {
        let mut source = MockTicketSource::new();
        source.expect_name().return_const("mock");
        source
            .expect_fetch()
            .returning(move || Ok(tickets.clone()));
        source
    }

    #[test]
    fn test_seen_policy_parse() {
        assert_eq!("always".parse::<SeenPolicy>().unwrap(), SeenPolicy::Always);
        assert_eq!("on_success".parse::<SeenPolicy>().unwrap(), SeenPolicy::OnSuccess);
        assert!("sometimes".parse::<SeenPolicy>().is_err());
        assert_eq!(SeenPolicy::OnSuccess.to_string(), "on-success");
    }

    #[tokio::test]
    async fn test_groups_tickets_per_service() {
        let atlas = RecordingChannel::new(false);
        let tickets = vec![
            Ticket::new("#1", "DAC report stuck"),
            Ticket::new("#2", "Dashboard blank"),
        ];
        let mut monitor = Monitor::new(
            Box::new(source_returning(tickets)),
            dispatcher(&[(ServiceTag::Atlas, &atlas)]),
        );

        let summary = monitor.run_once().await.unwrap();
        assert_eq!(summary.dispatched, 1);
        assert_eq!(summary.alerted_tickets, 2);

        let sent = atlas.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("**New Atlas Tickets**: 2 tickets"));
    }

    #[tokio::test]
    async fn test_duplicate_ids_in_one_fetch_alert_once() {
        let atlas = RecordingChannel::new(false);
        let tickets = vec![
            Ticket::new("#1", "DAC report stuck"),
            Ticket::new("#1", "DAC report stuck"),
        ];
        let mut monitor = Monitor::new(
            Box::new(source_returning(tickets)),
            dispatcher(&[(ServiceTag::Atlas, &atlas)]),
        );

        let summary = monitor.run_once().await.unwrap();
        assert_eq!(summary.new, 1);
        assert_eq!(summary.alerted_tickets, 1);
    }

    #[tokio::test]
    async fn test_unknown_tickets_are_never_dispatched() {
        let atlas = RecordingChannel::new(false);
        let mut monitor = Monitor::new(
            Box::new(source_returning(vec![Ticket::new("#9", "Agent crash")])),
            dispatcher(&[(ServiceTag::Atlas, &atlas)]),
        );

        let summary = monitor.run_once().await.unwrap();
        assert_eq!(summary.unclassified, 1);
        assert_eq!(summary.dispatched + summary.failed, 0);
        assert!(atlas.sent().is_empty());
        assert!(!monitor.seen().is_new("#9"));
    }

    #[tokio::test]
    async fn test_failed_batch_marked_seen_by_default() {
        let snowflake = RecordingChannel::new(true);
        let mut monitor = Monitor::new(
            Box::new(source_returning(vec![Ticket::new("#2", "Snowflake lag")])),
            dispatcher(&[(ServiceTag::Snowflake, &snowflake)]),
        );

        let first = monitor.run_once().await.unwrap();
        assert_eq!(first.failed, 1);
        let second = monitor.run_once().await.unwrap();
        assert_eq!(second.new, 0);
        assert_eq!(snowflake.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_on_success_policy_retries_failed_batch() {
        let snowflake = RecordingChannel::new(true);
        let mut monitor = Monitor::new(
            Box::new(source_returning(vec![Ticket::new("#2", "Snowflake lag")])),
            dispatcher(&[(ServiceTag::Snowflake, &snowflake)]),
        )
        .with_policy(SeenPolicy::OnSuccess);

        monitor.run_once().await.unwrap();
        let second = monitor.run_once().await.unwrap();
        assert_eq!(second.new, 1);
        assert_eq!(second.failed, 1);
        assert_eq!(snowflake.sent().len(), 2);
        assert!(monitor.seen().is_new("#2"));
    }

    #[tokio::test]
    async fn test_fetch_error_fails_cycle_only() {
        let atlas = RecordingChannel::new(false);
        let mut source = MockTicketSource::new();
        source.expect_name().return_const("mock");
        let mut calls = 0;
        source.expect_fetch().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Err(FetchError::Unavailable("tracker down".to_string()))
            } else {
                Ok(vec![Ticket::new("#1", "Atlas scan")])
            }
        });

        let mut monitor = Monitor::new(Box::new(source), dispatcher(&[(ServiceTag::Atlas, &atlas)]));
        assert!(monitor.run_once().await.is_err());

        let summary = monitor.run_once().await.unwrap();
        assert_eq!(summary.cycle, 2);
        assert_eq!(summary.dispatched, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_continuous_survives_fetch_errors_until_cancelled() {
        let atlas = RecordingChannel::new(false);
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();

        let mut source = MockTicketSource::new();
        source.expect_name().return_const("mock");
        let mut calls = 0;
        source.expect_fetch().times(3).returning(move || {
            calls += 1;
            match calls {
                1 => Err(FetchError::Unavailable("tracker down".to_string())),
                2 => Ok(vec![Ticket::new("#1", "Atlas scan")]),
                _ => {
                    token.cancel();
                    Ok(vec![Ticket::new("#1", "Atlas scan")])
                }
            }
        });

        let mut monitor = Monitor::new(Box::new(source), dispatcher(&[(ServiceTag::Atlas, &atlas)]));
        let cycles = monitor
            .run_continuous(Duration::from_secs(300), shutdown)
            .await;

        assert_eq!(cycles, 3);
        assert_eq!(atlas.sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_cycle_completes_the_cycle() {
        let atlas = RecordingChannel::new(false);
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();

        let mut source = MockTicketSource::new();
        source.expect_name().return_const("mock");
        source.expect_fetch().times(1).returning(move || {
            token.cancel();
            Ok(vec![Ticket::new("#1", "Atlas scan")])
        });

        let mut monitor = Monitor::new(Box::new(source), dispatcher(&[(ServiceTag::Atlas, &atlas)]));
        let cycles = monitor.run_continuous(Duration::from_secs(60), shutdown).await;

        assert_eq!(cycles, 1);
        assert_eq!(atlas.sent().len(), 1);
    }

    #[test]
    fn test_summary_display() {
        let summary = CycleSummary {
            cycle: 4,
            fetched: 3,
            new: 2,
            dispatched: 1,
            failed: 1,
            ..CycleSummary::default()
        };
        assert_eq!(
            summary.to_string(),
            "cycle #4: fetched 3, new 2, unclassified 0, alerts sent 1, alerts failed 1"
        );
    }
}
