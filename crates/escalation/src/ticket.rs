//! Escalation ticket model.

use serde::{Deserialize, Serialize};

/// The only tracker state that triggers an alert.
pub const ACTIONABLE_STATE: &str = "New";

/// Longest summary rendered in an alert bullet, in characters.
const MAX_SUMMARY_CHARS: usize = 80;

/// Separator the tracker uses between title, customer and region segments.
const TITLE_SEGMENT_SEPARATOR: &str = " @ ";

/// An escalation ticket as fetched from the tracker.
///
/// Every field defaults to empty so partially populated records still
/// classify and format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ticket {
    /// Human-facing identifier, e.g. `#0934994`.
    pub id: String,
    pub title: String,
    pub description: String,
    /// Originating platform (e.g. `Salesforce`, `MongoDB`); often empty.
    pub platform: String,
    pub state: String,
    /// Browser URL of the work item.
    pub link: String,
    /// Raw tracker severity, e.g. `2 - High` or `HIGH`.
    pub severity: String,
    /// Numeric work item id in the tracker, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_item_id: Option<u64>,
    pub customer: String,
}

impl Ticket {
    /// Minimal ticket for fixtures and ad-hoc classification.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            state: ACTIONABLE_STATE.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = state.into();
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = severity.into();
        self
    }

    #[must_use]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = link.into();
        self
    }

    /// Whether the ticket is in the state that warrants an alert.
    pub fn is_actionable(&self) -> bool {
        self.state == ACTIONABLE_STATE
    }

    /// Identifier with a leading `#`.
    pub fn display_id(&self) -> String {
        let id = self.id.trim();
        if id.starts_with('#') {
            id.to_string()
        } else {
            format!("#{id}")
        }
    }

    /// Normalised severity label, `None` when the tracker left it empty.
    ///
    /// Tracker values look like `1 - Critical` / `2 - High`; both the
    /// numeric prefix and the word are recognised.
    pub fn severity_label(&self) -> Option<String> {
        let raw = self.severity.trim();
        if raw.is_empty() {
            return None;
        }

        let lower = raw.to_lowercase();
        let tokens: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();
        let has = |word: &str| tokens.contains(&word);

        let label = match tokens.first().copied() {
            Some("1") => "CRITICAL",
            Some("2") => "HIGH",
            Some("3") => "MEDIUM",
            Some("4") => "LOW",
            _ if has("critical") => "CRITICAL",
            _ if has("high") => "HIGH",
            _ if has("medium") => "MEDIUM",
            _ if has("low") => "LOW",
            _ => return Some(raw.to_uppercase()),
        };
        Some(label.to_string())
    }

    /// Short title for an alert bullet.
    ///
    /// `[Ticket #0934821] Snowflake scope template missing @ Acme @ (AMER)`
    /// becomes `Snowflake scope template missing`.
    pub fn summary(&self) -> String {
        let mut title = self.title.trim();
        if title.starts_with('[') {
            if let Some(end) = title.find(']') {
                title = title[end + 1..].trim_start();
            }
        }
        if let Some(cut) = title.find(TITLE_SEGMENT_SEPARATOR) {
            title = &title[..cut];
        }
        let title = title.trim();

        let text = if !title.is_empty() {
            title
        } else if !self.customer.trim().is_empty() {
            self.customer.trim()
        } else {
            "(no title)"
        };

        truncate_chars(text, MAX_SUMMARY_CHARS)
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actionable_state_is_exact() {
        assert!(Ticket::new("#1", "t").is_actionable());
        assert!(!Ticket::new("#1", "t").with_state("Resolved").is_actionable());
        assert!(!Ticket::new("#1", "t").with_state("new").is_actionable());
    }

    #[test]
    fn test_display_id() {
        assert_eq!(Ticket::new("#0934994", "").display_id(), "#0934994");
        assert_eq!(Ticket::new("0934994", "").display_id(), "#0934994");
    }

    #[test]
    fn test_severity_label() {
        let label = |s: &str| Ticket::new("#1", "").with_severity(s).severity_label();
        assert_eq!(label("1 - Critical").as_deref(), Some("CRITICAL"));
        assert_eq!(label("2 - High").as_deref(), Some("HIGH"));
        assert_eq!(label("3 - Medium").as_deref(), Some("MEDIUM"));
        assert_eq!(label("LOW").as_deref(), Some("LOW"));
        assert_eq!(label("sev-a").as_deref(), Some("SEV-A"));
        assert_eq!(label("   "), None);
    }

    #[test]
    fn test_severity_label_matches_whole_words() {
        let label = |s: &str| Ticket::new("#1", "").with_severity(s).severity_label();
        assert_eq!(label("below threshold").as_deref(), Some("BELOW THRESHOLD"));
        assert_eq!(label("slowdown").as_deref(), Some("SLOWDOWN"));
        assert_eq!(label("Highway outage").as_deref(), Some("HIGHWAY OUTAGE"));
        assert_eq!(label("4 - Low").as_deref(), Some("LOW"));
        assert_eq!(label("Priority: high").as_deref(), Some("HIGH"));
    }

    #[test]
    fn test_summary_strips_ticket_tag_and_segments() {
        let ticket = Ticket::new(
            "#0934821",
            "[Ticket #0934821] Snowflake scope template suddenly missing @ VS Services @ (AMER) @ EVAL",
        );
        assert_eq!(ticket.summary(), "Snowflake scope template suddenly missing");
    }

    #[test]
    fn test_summary_fallbacks() {
        let mut ticket = Ticket::new("#1", "  ");
        assert_eq!(ticket.summary(), "(no title)");

        ticket.customer = "Interface".to_string();
        assert_eq!(ticket.summary(), "Interface");
    }

    #[test]
    fn test_summary_truncates_long_titles() {
        let ticket = Ticket::new("#1", "x".repeat(200));
        let summary = ticket.summary();
        assert_eq!(summary.chars().count(), 80);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_deserialize_with_missing_fields() {
        let ticket: Ticket = serde_json::from_str(r##"{"id": "#7", "title": "DAC broken"}"##).unwrap();
        assert_eq!(ticket.platform, "");
        assert_eq!(ticket.state, "");
        assert!(ticket.work_item_id.is_none());
    }
}
