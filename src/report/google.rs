//! reqwest-backed Google Analytics Data and Google Ads providers

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use super::client::{AdsProvider, AnalyticsProvider};
use super::error::{ProviderErrorKind, ReportError, ReportResult};
use super::models::{RawReport, RawReportRow};
use super::query::{schema_for, AdsSearchRequest, RunReportRequest};
use super::ReportKind;
use crate::auth::TokenSource;

pub fn build_http_client(timeout: Duration) -> ReportResult<Client> {
    Client::builder()
        .user_agent(concat!("reportdeck/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(|e| ReportError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// Google Analytics Data API `runReport`
pub struct GoogleAnalyticsProvider {
    base_url: String,
    client: Client,
    tokens: Arc<dyn TokenSource>,
}

impl GoogleAnalyticsProvider {
    pub fn new(base_url: &str, client: Client, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            tokens,
        }
    }
}

#[async_trait]
impl AnalyticsProvider for GoogleAnalyticsProvider {
    async fn run_report(&self, request: &RunReportRequest) -> ReportResult<RawReport> {
        let token = self.tokens.access_token().await?;
        let url = format!("{}/v1beta/{}:runReport", self.base_url, request.property);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;
        let body: RunReportResponse = read_json(response, "analytics").await?;
        Ok(body.into_raw_report())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunReportResponse {
    #[serde(default)]
    dimension_headers: Vec<Header>,
    #[serde(default)]
    metric_headers: Vec<Header>,
    #[serde(default)]
    rows: Vec<ResponseRow>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseRow {
    #[serde(default)]
    dimension_values: Vec<CellValue>,
    #[serde(default)]
    metric_values: Vec<CellValue>,
}

#[derive(Debug, Deserialize)]
struct CellValue {
    #[serde(default)]
    value: String,
}

impl RunReportResponse {
    fn into_raw_report(self) -> RawReport {
        RawReport {
            dimensions: self.dimension_headers.into_iter().map(|h| h.name).collect(),
            metrics: self.metric_headers.into_iter().map(|h| h.name).collect(),
            rows: self
                .rows
                .into_iter()
                .map(|row| RawReportRow {
                    dimension_values: row.dimension_values.into_iter().map(|c| c.value).collect(),
                    metric_values: row.metric_values.into_iter().map(|c| c.value).collect(),
                })
                .collect(),
        }
    }
}

/// Google Ads API `googleAds:search`
pub struct GoogleAdsProvider {
    base_url: String,
    api_version: String,
    developer_token: String,
    client: Client,
    tokens: Arc<dyn TokenSource>,
}

impl GoogleAdsProvider {
    pub fn new(
        base_url: &str,
        api_version: &str,
        developer_token: &str,
        client: Client,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
            developer_token: developer_token.to_string(),
            client,
            tokens,
        }
    }
}

#[async_trait]
impl AdsProvider for GoogleAdsProvider {
    async fn search(&self, request: &AdsSearchRequest) -> ReportResult<RawReport> {
        let token = self.tokens.access_token().await?;
        let url = format!(
            "{}/{}/customers/{}/googleAds:search",
            self.base_url, self.api_version, request.customer_id
        );

        let mut builder = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("developer-token", &self.developer_token);
        if let Some(login) = &request.login_customer_id {
            builder = builder.header("login-customer-id", login);
        }

        let response = builder.json(request).send().await?;
        let body: SearchResponse = read_json(response, "ads").await?;

        let schema = schema_for(ReportKind::CampaignPerformance);
        Ok(RawReport {
            dimensions: schema.dimensions.iter().map(|d| d.to_string()).collect(),
            metrics: schema.metrics.iter().map(|m| m.to_string()).collect(),
            rows: body.results.iter().map(project_ads_row).collect(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Value>,
}

/// Flatten one nested search result into the positional campaign layout.
///
/// int64 fields arrive as JSON strings and doubles as numbers; missing
/// metrics count as zero.
pub fn project_ads_row(result: &Value) -> RawReportRow {
    let campaign = &result["campaign"];
    let metrics = &result["metrics"];
    let metric = |name: &str| scalar_text(&metrics[name]).unwrap_or_else(|| "0".to_string());

    RawReportRow {
        dimension_values: vec![
            scalar_text(&campaign["id"]).unwrap_or_default(),
            scalar_text(&campaign["name"]).unwrap_or_default(),
        ],
        metric_values: vec![
            metric("impressions"),
            metric("clicks"),
            metric("costMicros"),
            metric("conversions"),
        ],
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response, provider: &str) -> ReportResult<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(status_error(status, &body, provider));
    }

    serde_json::from_str(&body)
        .map_err(|e| ReportError::Format(format!("{provider} response did not match the expected shape: {e}")))
}

/// Map an HTTP error status to a provider error, keeping the raw body.
pub fn status_error(status: StatusCode, body: &str, provider: &str) -> ReportError {
    let kind = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderErrorKind::Unauthenticated,
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => ProviderErrorKind::InvalidConfig,
        StatusCode::GATEWAY_TIMEOUT | StatusCode::SERVICE_UNAVAILABLE => ProviderErrorKind::Transport,
        _ => ProviderErrorKind::Unknown,
    };

    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_owned))
        .unwrap_or_else(|| format!("{provider} request failed with status {status}"));

    ReportError::provider(kind, message).with_details(body.to_string())
}
