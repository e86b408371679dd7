//! Startup configuration.
//!
//! Settings come from an optional TOML file overlaid by environment
//! variables, and are validated once before the first cycle runs.
//!
//! # Environment Variables
//! - `ESCALATION_QUERY_ID`, `ESCALATION_PROJECT`: saved query to poll (required)
//! - `AZURE_DEVOPS_ORGANIZATION`, `AZURE_DEVOPS_PAT`: live tracker access
//! - `AZURE_DEVOPS_BASE_URL`: tracker base URL (default: `https://dev.azure.com`)
//! - `ESCALATION_SOURCE`: `live` or `simulated` (default: live when credentials exist)
//! - `ESCALATION_INTERVAL_SECS`: continuous-mode interval (default: 300)
//! - `ESCALATION_HTTP_TIMEOUT_SECS`: per-request timeout (default: 30)
//! - `ESCALATION_SEEN_POLICY`: `always` or `on-success` (default: always)
//! - `ATLAS_WEBHOOK_URL`, `SNOWFLAKE_WEBHOOK_URL`, `SALESFORCE_WEBHOOK_URL`

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::classifier::ServiceTag;
use crate::error::ConfigError;
use crate::monitor::SeenPolicy;

/// Default tracker base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://dev.azure.com";

/// Default continuous-mode interval in seconds.
pub const DEFAULT_INTERVAL_SECS: u64 = 300;

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const ENV_QUERY_ID: &str = "ESCALATION_QUERY_ID";
const ENV_PROJECT: &str = "ESCALATION_PROJECT";
const ENV_ORGANIZATION: &str = "AZURE_DEVOPS_ORGANIZATION";
const ENV_PAT: &str = "AZURE_DEVOPS_PAT";
const ENV_BASE_URL: &str = "AZURE_DEVOPS_BASE_URL";
const ENV_SOURCE: &str = "ESCALATION_SOURCE";
const ENV_INTERVAL: &str = "ESCALATION_INTERVAL_SECS";
const ENV_TIMEOUT: &str = "ESCALATION_HTTP_TIMEOUT_SECS";
const ENV_SEEN_POLICY: &str = "ESCALATION_SEEN_POLICY";

/// Environment variable holding the webhook URL for a service.
#[must_use]
pub const fn webhook_env(service: ServiceTag) -> &'static str {
    match service {
        ServiceTag::Atlas => "ATLAS_WEBHOOK_URL",
        ServiceTag::Snowflake => "SNOWFLAKE_WEBHOOK_URL",
        ServiceTag::Salesforce => "SALESFORCE_WEBHOOK_URL",
        ServiceTag::Unknown => "UNKNOWN_WEBHOOK_URL",
    }
}

/// Destination webhook per service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookConfig {
    urls: BTreeMap<ServiceTag, String>,
}

impl WebhookConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, service: ServiceTag, url: impl Into<String>) -> Self {
        self.insert(service, url);
        self
    }

    /// Set the URL for a service. `unknown` is never routable and is ignored.
    pub fn insert(&mut self, service: ServiceTag, url: impl Into<String>) {
        if service.is_routable() {
            self.urls.insert(service, url.into());
        }
    }

    pub fn get(&self, service: ServiceTag) -> Option<&str> {
        self.urls.get(&service).map(String::as_str)
    }

    /// Configured services and their URLs, in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = (ServiceTag, &str)> {
        self.urls.iter().map(|(tag, url)| (*tag, url.as_str()))
    }

    /// Routable services with no URL.
    pub fn missing(&self) -> Vec<ServiceTag> {
        ServiceTag::ROUTABLE
            .into_iter()
            .filter(|tag| !self.urls.contains_key(tag))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Which ticket source backs the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Azure DevOps saved query.
    Live,
    /// Fixed sample tickets.
    Simulated,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Live => "live",
            Self::Simulated => "simulated",
        })
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "live" => Ok(Self::Live),
            "simulated" | "simulation" => Ok(Self::Simulated),
            other => Err(format!("expected `live` or `simulated`, got `{other}`")),
        }
    }
}

/// On-disk configuration file. Every key is optional; environment wins.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub query_id: Option<String>,
    pub project: Option<String>,
    pub organization: Option<String>,
    pub pat: Option<String>,
    pub api_base_url: Option<String>,
    pub source: Option<String>,
    pub interval_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub seen_policy: Option<String>,
    pub webhooks: HashMap<String, String>,
}

impl FileConfig {
    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    fn parse(content: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })
    }
}

/// Validated monitor configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub query_id: String,
    pub project: String,
    pub organization: Option<String>,
    pub pat: Option<String>,
    pub api_base_url: String,
    pub source: SourceKind,
    pub interval: Duration,
    pub request_timeout: Duration,
    pub seen_policy: SeenPolicy,
    pub webhooks: WebhookConfig,
}

impl MonitorConfig {
    /// Load from an optional file plus the process environment.
    ///
    /// `source` takes precedence over both and is applied before validation.
    pub fn load(path: Option<&Path>, source: Option<SourceKind>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(file, |key| std::env::var(key).ok(), source)
    }

    /// Merge a file config with an environment lookup and validate.
    pub fn resolve<F>(
        file: FileConfig,
        env: F,
        source_override: Option<SourceKind>,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let query_id = env(ENV_QUERY_ID)
            .or(file.query_id)
            .ok_or(ConfigError::Missing {
                key: "query_id",
                env: ENV_QUERY_ID,
            })?;
        let project = env(ENV_PROJECT)
            .or(file.project)
            .ok_or(ConfigError::Missing {
                key: "project",
                env: ENV_PROJECT,
            })?;
        let organization = env(ENV_ORGANIZATION).or(file.organization);
        let pat = env(ENV_PAT).or(file.pat);
        let api_base_url = env(ENV_BASE_URL)
            .or(file.api_base_url)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let source = match source_override {
            Some(source) => source,
            None => pick_source(
                env(ENV_SOURCE).or(file.source),
                organization.is_some() && pat.is_some(),
            )?,
        };

        let interval_secs = parse_secs(env(ENV_INTERVAL), file.interval_secs, "interval_secs")?
            .unwrap_or(DEFAULT_INTERVAL_SECS);
        let timeout_secs = parse_secs(
            env(ENV_TIMEOUT),
            file.request_timeout_secs,
            "request_timeout_secs",
        )?
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let seen_policy = match env(ENV_SEEN_POLICY).or(file.seen_policy) {
            Some(raw) => raw
                .parse::<SeenPolicy>()
                .map_err(|reason| ConfigError::Invalid {
                    key: "seen_policy",
                    reason,
                })?,
            None => SeenPolicy::default(),
        };

        let mut webhooks = WebhookConfig::new();
        for (key, url) in file.webhooks {
            let service = key
                .parse::<ServiceTag>()
                .ok()
                .filter(ServiceTag::is_routable)
                .ok_or_else(|| ConfigError::Invalid {
                    key: "webhooks",
                    reason: format!("`{key}` is not a routable service"),
                })?;
            webhooks.insert(service, url);
        }
        for service in ServiceTag::ROUTABLE {
            if let Some(url) = env(webhook_env(service)) {
                webhooks.insert(service, url);
            }
        }

        let config = Self {
            query_id: query_id.trim().to_string(),
            project: project.trim().to_string(),
            organization,
            pat,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            source,
            interval: Duration::from_secs(interval_secs),
            request_timeout: Duration::from_secs(timeout_secs),
            seen_policy,
            webhooks,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants. Missing per-service webhooks only warn.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query_id.is_empty() {
            return Err(ConfigError::Missing {
                key: "query_id",
                env: ENV_QUERY_ID,
            });
        }
        if self.project.is_empty() {
            return Err(ConfigError::Missing {
                key: "project",
                env: ENV_PROJECT,
            });
        }
        if self.interval.is_zero() {
            return Err(ConfigError::Invalid {
                key: "interval_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "request_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.source == SourceKind::Live {
            if self.organization.is_none() {
                return Err(ConfigError::Missing {
                    key: "organization",
                    env: ENV_ORGANIZATION,
                });
            }
            if self.pat.is_none() {
                return Err(ConfigError::Missing {
                    key: "pat",
                    env: ENV_PAT,
                });
            }
        }

        if self.webhooks.is_empty() {
            return Err(ConfigError::NoWebhooks);
        }
        for (service, url) in self.webhooks.iter() {
            check_http_url(url).map_err(|reason| ConfigError::Invalid {
                key: webhook_env(service),
                reason,
            })?;
        }
        check_http_url(&self.api_base_url).map_err(|reason| ConfigError::Invalid {
            key: "api_base_url",
            reason,
        })?;

        for service in self.webhooks.missing() {
            warn!(
                service = %service,
                env = webhook_env(service),
                "No webhook configured; alerts for this service will fail"
            );
        }

        Ok(())
    }
}

fn pick_source(raw: Option<String>, has_credentials: bool) -> Result<SourceKind, ConfigError> {
    match raw {
        Some(raw) => raw
            .parse::<SourceKind>()
            .map_err(|reason| ConfigError::Invalid {
                key: "source",
                reason,
            }),
        None if has_credentials => Ok(SourceKind::Live),
        None => Ok(SourceKind::Simulated),
    }
}

fn parse_secs(
    env: Option<String>,
    file: Option<u64>,
    key: &'static str,
) -> Result<Option<u64>, ConfigError> {
    match env {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                key,
                reason: format!("`{raw}` is not a number of seconds: {e}"),
            }),
        None => Ok(file),
    }
}

fn check_http_url(raw: &str) -> Result<(), String> {
    let url = reqwest::Url::parse(raw).map_err(|e| format!("not a URL: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme `{other}`")),
    }
}
