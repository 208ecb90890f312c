//! Single fetch-and-transform cycle against the SimpleFIN API.

use super::AccountsResponse;
use crate::config::{redact_url, ConfigError, ExporterConfig};
use crate::metrics::MetricSet;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode, Url};
use std::future::Future;
use thiserror::Error;

/// Path appended to the access URL to list accounts.
pub const ACCOUNTS_ENDPOINT: &str = "/accounts";

/// Reasons a poll cycle can fail.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to upstream failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("api error {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("failed to decode accounts response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("api returned errors: {}", .0.join("; "))]
    UpstreamApplication(Vec<String>),
}

impl FetchError {
    /// Stable label for the failure kind, used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport(_) => "transport",
            FetchError::UpstreamStatus { .. } => "upstream_status",
            FetchError::Decode(_) => "decode",
            FetchError::UpstreamApplication(_) => "upstream_application",
        }
    }
}

/// Anything that can produce a metric set for one poll cycle.
///
/// This abstraction lets the poller run against the real API or
/// against scripted sources in tests.
pub trait AccountSource: Send + Sync {
    /// Performs one fetch-and-transform cycle.
    fn fetch(&self) -> impl Future<Output = Result<MetricSet, FetchError>> + Send;
}

/// Fetches account balances over HTTP.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    accounts_url: Url,
}

impl Fetcher {
    /// Creates a fetcher from validated configuration.
    ///
    /// The HTTP client carries the configured request timeout, so a hung
    /// upstream fails the cycle instead of stalling the poller.
    pub fn new(config: &ExporterConfig) -> Result<Self, ConfigError> {
        config.parsed_access_url()?;

        let target = format!(
            "{}{}",
            config.access_url.trim_end_matches('/'),
            ACCOUNTS_ENDPOINT
        );
        let accounts_url =
            Url::parse(&target).map_err(|e| ConfigError::InvalidAccessUrl(e.to_string()))?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("simplefin-exporter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            accounts_url,
        })
    }

    /// Accounts URL with the password hidden, for logging.
    pub fn redacted_url(&self) -> String {
        redact_url(&self.accounts_url)
    }

    /// Issues the request and converts the response into metrics.
    ///
    /// Userinfo in the access URL is sent by reqwest as Basic auth.
    pub async fn fetch_accounts(&self) -> Result<MetricSet, FetchError> {
        tracing::debug!(url = %self.redacted_url(), "Requesting accounts");

        let response = self
            .client
            .get(self.accounts_url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if status != StatusCode::OK {
            return Err(FetchError::UpstreamStatus {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let accounts: AccountsResponse = serde_json::from_slice(&body)?;
        if !accounts.errors.is_empty() {
            return Err(FetchError::UpstreamApplication(accounts.errors));
        }

        let timestamp = chrono::Utc::now().timestamp();
        tracing::trace!(
            accounts = accounts.accounts.len(),
            timestamp,
            "Decoded accounts response"
        );

        Ok(accounts.to_metric_set(timestamp))
    }
}

impl AccountSource for Fetcher {
    async fn fetch(&self) -> Result<MetricSet, FetchError> {
        self.fetch_accounts().await
    }
}
