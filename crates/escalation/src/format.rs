//! Alert message rendering.

use std::fmt::Write as _;

use chrono::NaiveDateTime;

use crate::classifier::ServiceTag;
use crate::ticket::Ticket;

/// Timestamp format used in alert headers.
pub const REPORT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Tickets routed to one service during one cycle, in fetch order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertBatch {
    pub service: ServiceTag,
    pub tickets: Vec<Ticket>,
}

impl AlertBatch {
    #[must_use]
    pub fn new(service: ServiceTag) -> Self {
        Self {
            service,
            tickets: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}

/// Render the chat message for a batch.
pub fn format_alert(batch: &AlertBatch, report_time: &NaiveDateTime) -> String {
    let service = batch.service.display_name();
    let count = batch.len();
    let noun = if count == 1 { "ticket" } else { "tickets" };

    let mut text = format!("New {service} ticket detected\n\n");
    let _ = writeln!(text, "**New {service} Tickets**: {count} {noun}");
    let _ = writeln!(
        text,
        "**Report Time**: {}\n",
        report_time.format(REPORT_TIME_FORMAT)
    );

    for ticket in &batch.tickets {
        let id = ticket.display_id();
        let link = ticket.link.trim();
        if link.is_empty() {
            let _ = write!(text, "• **Ticket {id}**");
        } else {
            let _ = write!(text, "• **[Ticket {id}]({link})**");
        }
        let _ = write!(text, " - {}", ticket.summary());
        if let Some(severity) = ticket.severity_label() {
            let _ = write!(text, " ({severity})");
        }
        text.push('\n');
    }

    text
}

/// Connectivity check message posted by `test-webhooks`.
pub fn format_test_message(service: ServiceTag, report_time: &NaiveDateTime) -> String {
    format!(
        "🧪 **Test Alert for {}**\n\nThis is a test message sent at {}\nIf you receive this, the webhook is working correctly!",
        service.display_name(),
        report_time.format(REPORT_TIME_FORMAT)
    )
}
