//! Azure DevOps work item source.
//!
//! Runs a saved query, then loads the matching work items in batches.
//! Uses the REST API directly (api-version 7.1) with PAT basic auth.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::TicketSource;
use crate::config::MonitorConfig;
use crate::error::FetchError;
use crate::ticket::Ticket;

const API_VERSION: &str = "7.1";

/// Work items endpoint accepts at most this many ids per call.
const MAX_BATCH: usize = 200;

const FIELD_TITLE: &str = "System.Title";
const FIELD_STATE: &str = "System.State";
const FIELD_DESCRIPTION: &str = "System.Description";
const FIELD_SEVERITY: &str = "Microsoft.VSTS.Common.Severity";
const FIELD_PLATFORM: &str = "VaronisSupport.SupportTicket.Platform";
const FIELD_TICKET_NUMBER: &str = "VaronisSupport.SupportTicket.TicketNumber";
const FIELD_CUSTOMER: &str = "VaronisSupport.SupportTicket.CustomerName";

const FIELDS: [&str; 7] = [
    FIELD_TITLE,
    FIELD_STATE,
    FIELD_DESCRIPTION,
    FIELD_SEVERITY,
    FIELD_PLATFORM,
    FIELD_TICKET_NUMBER,
    FIELD_CUSTOMER,
];

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(rename = "workItems", default)]
    work_items: Vec<WorkItemRef>,
}

#[derive(Debug, Deserialize)]
struct WorkItemRef {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct WorkItemBatch {
    /// `errorPolicy=omit` leaves `null` in place of items that could not be loaded.
    #[serde(default)]
    value: Vec<Option<WorkItem>>,
}

#[derive(Debug, Deserialize)]
struct WorkItem {
    id: u64,
    #[serde(default)]
    fields: HashMap<String, Value>,
}

impl WorkItem {
    fn field(&self, name: &str) -> String {
        match self.fields.get(name) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        }
    }
}

/// Escalation tickets from an Azure DevOps saved query.
pub struct LiveSource {
    client: reqwest::Client,
    base_url: String,
    organization: String,
    project: String,
    query_id: String,
    pat: String,
}

impl LiveSource {
    pub fn new(
        base_url: impl Into<String>,
        organization: impl Into<String>,
        project: impl Into<String>,
        query_id: impl Into<String>,
        pat: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| FetchError::Http {
                url: base_url.clone(),
                source,
            })?;

        Ok(Self {
            client,
            base_url,
            organization: organization.into(),
            project: project.into(),
            query_id: query_id.into(),
            pat: pat.into(),
        })
    }

    /// Build from validated configuration.
    pub fn from_config(config: &MonitorConfig) -> Result<Self, FetchError> {
        let organization = config
            .organization
            .clone()
            .ok_or_else(|| FetchError::Unavailable("no tracker organization configured".into()))?;
        let pat = config
            .pat
            .clone()
            .ok_or_else(|| FetchError::Unavailable("no tracker access token configured".into()))?;

        Self::new(
            &config.api_base_url,
            organization,
            &config.project,
            &config.query_id,
            pat,
            config.request_timeout,
        )
    }

    fn project_segment(&self) -> String {
        urlencoding::encode(&self.project).into_owned()
    }

    fn edit_link(&self, work_item_id: u64) -> String {
        format!(
            "{}/{}/{}/_workitems/edit/{work_item_id}",
            self.base_url,
            self.organization,
            self.project_segment()
        )
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .basic_auth("", Some(&self.pat))
            .send()
            .await
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: body.chars().take(512).collect(),
            });
        }

        serde_json::from_str(&body).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn query_ids(&self) -> Result<Vec<u64>, FetchError> {
        let url = format!(
            "{}/{}/{}/_apis/wit/wiql/{}",
            self.base_url,
            self.organization,
            self.project_segment(),
            self.query_id
        );
        let result: QueryResult = self
            .get_json(&url, &[("api-version", API_VERSION.to_string())])
            .await?;
        Ok(result.work_items.into_iter().map(|w| w.id).collect())
    }

    async fn work_items(&self, ids: &[u64]) -> Result<Vec<WorkItem>, FetchError> {
        let url = format!("{}/{}/_apis/wit/workitems", self.base_url, self.organization);
        let mut items = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(MAX_BATCH) {
            let ids_param = chunk
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(",");
            let before = items.len();
            let batch: WorkItemBatch = self
                .get_json(
                    &url,
                    &[
                        ("ids", ids_param),
                        ("fields", FIELDS.join(",")),
                        ("errorPolicy", "omit".to_string()),
                        ("api-version", API_VERSION.to_string()),
                    ],
                )
                .await?;
            let loaded = batch.value.len();
            items.extend(batch.value.into_iter().flatten());
            let omitted = chunk.len().saturating_sub(items.len() - before);
            if omitted > 0 {
                debug!(omitted, returned = loaded, "Work items omitted from batch");
            }
        }

        Ok(items)
    }

    fn to_ticket(&self, item: &WorkItem) -> Ticket {
        let number = item.field(FIELD_TICKET_NUMBER);
        let id = if number.is_empty() {
            format!("#{}", item.id)
        } else {
            format!("#{}", number.trim_start_matches('#'))
        };

        Ticket {
            id,
            title: item.field(FIELD_TITLE),
            description: item.field(FIELD_DESCRIPTION),
            platform: item.field(FIELD_PLATFORM),
            state: item.field(FIELD_STATE),
            link: self.edit_link(item.id),
            severity: item.field(FIELD_SEVERITY),
            work_item_id: Some(item.id),
            customer: item.field(FIELD_CUSTOMER),
        }
    }
}

#[async_trait]
impl TicketSource for LiveSource {
    fn name(&self) -> &'static str {
        "azure-devops"
    }

    async fn fetch(&self) -> Result<Vec<Ticket>, FetchError> {
        let ids = self.query_ids().await?;
        debug!(query_id = %self.query_id, count = ids.len(), "Query returned work items");
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut items = self.work_items(&ids).await?;

        // Keep query order; the batch endpoint does not promise it.
        let position: HashMap<u64, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        items.sort_by_key(|item| position.get(&item.id).copied().unwrap_or(usize::MAX));

        info!(
            project = %self.project,
            requested = ids.len(),
            retrieved = items.len(),
            "Fetched escalation work items"
        );

        Ok(items.iter().map(|item| self.to_ticket(item)).collect())
    }
}
