use super::config::{self, MandiConfig};
use super::models::{title_case, RawPriceRecord};
use crate::error::{PriceError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;

/// Live market-price source for one state on one exact calendar date.
///
/// `Ok(vec![])` means the upstream answered but had nothing for that date, which is
/// common before the day's arrivals are reported.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_live(&self, state: &str, date: NaiveDate) -> Result<Vec<RawPriceRecord>>;
}

#[derive(Debug, Deserialize)]
struct MandiApiResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    // Kept loose so one malformed entry does not sink the whole page
    #[serde(default)]
    records: Vec<Value>,
}

#[derive(Debug)]
enum FetchFailure {
    Transient(String),
    Permanent(String),
}

impl FetchFailure {
    fn is_transient(&self) -> bool {
        matches!(self, FetchFailure::Transient(_))
    }

    fn into_message(self) -> String {
        match self {
            FetchFailure::Transient(msg) | FetchFailure::Permanent(msg) => msg,
        }
    }
}

// -----------------------------------------------
// DATA.GOV.IN CLIENT
// -----------------------------------------------
pub struct MandiClient {
    client: Client,
    api_key: Option<String>,
    resource_url: String,
    fetch_timeout: Duration,
}

impl MandiClient {
    pub fn new(config: &MandiConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.live_fetch_timeout)?,
            api_key: config.api_key.clone(),
            resource_url: config::mandi_resource_url(&config.api_base_url),
            fetch_timeout: config.live_fetch_timeout,
        })
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// GET with retry on 429 / 5xx / connection failures
    async fn fetch_json(&self, params: &[(&str, String)]) -> std::result::Result<String, FetchFailure> {
        let backoff = ExponentialBackoff::from_millis(config::RETRY_BASE_DELAY_MS)
            .factor(config::RETRY_FACTOR)
            .max_delay(Duration::from_secs(config::RETRY_MAX_DELAY_SECS))
            .take(config::RETRY_MAX_ATTEMPTS);

        RetryIf::start(backoff, || self.attempt(params), FetchFailure::is_transient).await
    }

    async fn attempt(&self, params: &[(&str, String)]) -> std::result::Result<String, FetchFailure> {
        let res = self
            .client
            .get(&self.resource_url)
            .query(params)
            .send()
            .await
            .map_err(|e| FetchFailure::Transient(format!("Request send failed: {}", e)))?;

        let status = res.status();

        if status.is_success() {
            let text = res
                .text()
                .await
                .map_err(|e| FetchFailure::Transient(format!("Failed to read body: {}", e)))?;

            // Validate JSON
            let trimmed = text.trim();
            if !trimmed.starts_with('{') {
                let preview: String = text.chars().take(200).collect();
                return Err(FetchFailure::Permanent(format!("Non-JSON response: {}", preview)));
            }

            Ok(text)
        } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            tracing::warn!("Mandi API returned {}, retrying", status);
            Err(FetchFailure::Transient(format!("Retryable error: {}", status)))
        } else {
            let body = res.text().await.unwrap_or_default();
            let preview: String = body.chars().take(200).collect();
            Err(FetchFailure::Permanent(format!("Client error {}: {}", status, preview)))
        }
    }
}

#[async_trait]
impl PriceSource for MandiClient {
    async fn fetch_live(&self, state: &str, date: NaiveDate) -> Result<Vec<RawPriceRecord>> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!("Live fetch skipped for '{}': DATA_GOV_IN_API_KEY not set", state);
            return Err(PriceError::ConfigurationMissing);
        };

        let state_name = title_case(state);
        let api_date = date.format(config::API_DATE_FORMAT).to_string();
        let params = [
            ("api-key", api_key.to_string()),
            ("format", "json".to_string()),
            ("limit", config::API_PAGE_LIMIT.to_string()),
            ("filters[state]", state_name.clone()),
            ("filters[arrival_date]", api_date.clone()),
        ];

        tracing::info!("Live fetch: requesting '{}' on {}", state_name, api_date);

        let text = match tokio::time::timeout(self.fetch_timeout, self.fetch_json(&params)).await {
            Ok(Ok(text)) => text,
            Ok(Err(failure)) => {
                let msg = failure.into_message();
                tracing::error!("Live fetch failed for '{}' on {}: {}", state_name, api_date, msg);
                return Err(PriceError::UpstreamUnavailable(msg));
            }
            Err(_) => {
                tracing::error!(
                    "Live fetch for '{}' on {} timed out after {}s",
                    state_name,
                    api_date,
                    self.fetch_timeout.as_secs()
                );
                return Err(PriceError::UpstreamUnavailable("timed out".to_string()));
            }
        };

        let response: MandiApiResponse = serde_json::from_str(&text).map_err(|e| {
            tracing::error!("Malformed live price payload for '{}': {}", state_name, e);
            PriceError::UpstreamUnavailable(format!("Failed to parse mandi records: {}", e))
        })?;

        if response.status.as_deref() == Some("error") {
            let msg = response.message.unwrap_or_else(|| "unknown upstream error".to_string());
            tracing::error!("Mandi API reported an error for '{}': {}", state_name, msg);
            return Err(PriceError::UpstreamUnavailable(msg));
        }

        let total = response.records.len();
        let records: Vec<RawPriceRecord> = response
            .records
            .into_iter()
            .filter_map(|record| serde_json::from_value(record).ok())
            .collect();

        if records.len() < total {
            tracing::warn!(
                "Dropped {} malformed records from the live payload for '{}'",
                total - records.len(),
                state_name
            );
        }

        if total >= config::API_PAGE_LIMIT {
            tracing::warn!(
                "Live fetch for '{}' hit the {} record page cap, snapshot may be incomplete",
                state_name,
                config::API_PAGE_LIMIT
            );
        }

        tracing::info!("Live fetch: got {} records for '{}' on {}", records.len(), state_name, api_date);
        Ok(records)
    }
}

// -----------------------------------------------
// HTTP CLIENT BUILDER
// -----------------------------------------------
fn build_client(timeout: Duration) -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

    Ok(Client::builder()
        .default_headers(headers)
        .user_agent(config::USER_AGENT)
        .timeout(timeout)
        .build()?)
}
