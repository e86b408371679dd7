//! Fixed sample tickets for running without tracker access.

use async_trait::async_trait;
use tracing::debug;

use super::TicketSource;
use crate::error::FetchError;
use crate::ticket::Ticket;

/// Returns the same tickets on every fetch.
#[derive(Debug, Clone)]
pub struct SimulatedSource {
    tickets: Vec<Ticket>,
}

impl SimulatedSource {
    /// Sample escalations covering each routable service.
    #[must_use]
    pub fn new() -> Self {
        Self::with_tickets(sample_tickets())
    }

    #[must_use]
    pub fn with_tickets(tickets: Vec<Ticket>) -> Self {
        Self { tickets }
    }
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TicketSource for SimulatedSource {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn fetch(&self) -> Result<Vec<Ticket>, FetchError> {
        debug!(count = self.tickets.len(), "Returning simulated tickets");
        Ok(self.tickets.clone())
    }
}

fn sample_tickets() -> Vec<Ticket> {
    const EDIT_URL: &str = "https://dev.azure.com/example/Escalations/_workitems/edit";

    vec![
        Ticket {
            id: "#0934994".to_string(),
            title: "[Ticket #0934994] Salesforce integration failing to add permission set to user @ Interface @ (RSE-US)".to_string(),
            platform: "Salesforce".to_string(),
            state: "New".to_string(),
            link: format!("{EDIT_URL}/2360743"),
            severity: "2 - High".to_string(),
            work_item_id: Some(2_360_743),
            customer: "Interface".to_string(),
            ..Ticket::default()
        },
        Ticket {
            id: "#0934821".to_string(),
            title: "[Ticket #0934821] Snowflake scope template suddenly missing @ VS Services Company, LLC @ (AMER) @ EVAL".to_string(),
            platform: "Snowflake".to_string(),
            state: "New".to_string(),
            link: format!("{EDIT_URL}/2360167"),
            severity: "3 - Medium".to_string(),
            work_item_id: Some(2_360_167),
            customer: "VS Services Company, LLC".to_string(),
            ..Ticket::default()
        },
        Ticket {
            id: "#0934760".to_string(),
            title: "[Ticket #0934760] DAC dashboard shows no file analysis results @ Northwind @ (EMEA)".to_string(),
            description: "Data access dashboard is empty since the last collector upgrade.".to_string(),
            state: "New".to_string(),
            link: format!("{EDIT_URL}/2360151"),
            severity: "1 - Critical".to_string(),
            work_item_id: Some(2_360_151),
            customer: "Northwind".to_string(),
            ..Ticket::default()
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{classify, ServiceTag};

    #[tokio::test]
    async fn test_samples_cover_every_service() {
        let tickets = SimulatedSource::new().fetch().await.unwrap();
        let mut tags: Vec<ServiceTag> = tickets.iter().map(classify).collect();
        tags.sort();
        assert_eq!(tags, ServiceTag::ROUTABLE.to_vec());
        assert!(tickets.iter().all(Ticket::is_actionable));
    }

    #[tokio::test]
    async fn test_custom_tickets_are_returned_unchanged() {
        let source = SimulatedSource::with_tickets(vec![Ticket::new("#9", "x")]);
        assert_eq!(source.fetch().await.unwrap(), vec![Ticket::new("#9", "x")]);
        assert_eq!(source.name(), "simulated");
    }
}
