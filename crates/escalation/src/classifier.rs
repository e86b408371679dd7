//! Routing of tickets to the service team that owns them.
//!
//! Rules are evaluated in a fixed order and the first match wins:
//!
//! 1. the structured platform field ([`PLATFORM_RULES`]),
//! 2. keywords in the title ([`KEYWORD_RULES`]),
//! 3. the same keywords in the description,
//! 4. otherwise [`ServiceTag::Unknown`].
//!
//! All comparisons are case-insensitive substring matches.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ticket::Ticket;

/// Service team a ticket is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceTag {
    Atlas,
    Snowflake,
    Salesforce,
    /// No rule matched; never dispatched.
    Unknown,
}

impl ServiceTag {
    /// Tags that own a webhook, in dispatch order.
    pub const ROUTABLE: [Self; 3] = [Self::Atlas, Self::Snowflake, Self::Salesforce];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Atlas => "atlas",
            Self::Snowflake => "snowflake",
            Self::Salesforce => "salesforce",
            Self::Unknown => "unknown",
        }
    }

    /// Name used in alert headlines.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Atlas => "Atlas",
            Self::Snowflake => "Snowflake",
            Self::Salesforce => "Salesforce",
            Self::Unknown => "Unknown",
        }
    }

    #[must_use]
    pub const fn is_routable(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for ServiceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "atlas" => Ok(Self::Atlas),
            "snowflake" => Ok(Self::Snowflake),
            "salesforce" => Ok(Self::Salesforce),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("unknown service `{other}`")),
        }
    }
}

/// Platform field values, checked first.
pub const PLATFORM_RULES: &[(ServiceTag, &[&str])] = &[
    (ServiceTag::Atlas, &["mongodb", "mongo"]),
    (ServiceTag::Snowflake, &["snowflake"]),
    (ServiceTag::Salesforce, &["salesforce"]),
];

/// Title/description keywords, checked when the platform is inconclusive.
/// Order is the tie-break when several sets match.
pub const KEYWORD_RULES: &[(ServiceTag, &[&str])] = &[
    (
        ServiceTag::Atlas,
        &["dac", "data access", "atlas", "dashboard", "file analysis"],
    ),
    (ServiceTag::Snowflake, &["snowflake", "snow", "scope template"]),
    (
        ServiceTag::Salesforce,
        &["salesforce", "sfdc", "permission set"],
    ),
];

/// Classify a ticket. Pure and total.
pub fn classify(ticket: &Ticket) -> ServiceTag {
    match_rules(PLATFORM_RULES, &ticket.platform)
        .or_else(|| match_rules(KEYWORD_RULES, &ticket.title))
        .or_else(|| match_rules(KEYWORD_RULES, &ticket.description))
        .unwrap_or(ServiceTag::Unknown)
}

fn match_rules(rules: &[(ServiceTag, &[&str])], text: &str) -> Option<ServiceTag> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let haystack = text.to_lowercase();
    rules
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| haystack.contains(k)))
        .map(|(tag, _)| *tag)
}
