//! Provider boundary and report dispatch

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use super::error::ReportResult;
use super::models::RawReport;
use super::query::{AdsSearchRequest, ProviderQuery, RunReportRequest};

/// Web-analytics reporting service
#[async_trait]
pub trait AnalyticsProvider: Send + Sync {
    async fn run_report(&self, request: &RunReportRequest) -> ReportResult<RawReport>;
}

/// Ads reporting service
#[async_trait]
pub trait AdsProvider: Send + Sync {
    async fn search(&self, request: &AdsSearchRequest) -> ReportResult<RawReport>;
}

/// Sends built queries to the matching provider. Single attempt, no retries.
#[derive(Clone)]
pub struct ReportClient {
    analytics: Arc<dyn AnalyticsProvider>,
    ads: Arc<dyn AdsProvider>,
}

impl ReportClient {
    pub fn new(analytics: Arc<dyn AnalyticsProvider>, ads: Arc<dyn AdsProvider>) -> Self {
        Self { analytics, ads }
    }

    pub async fn send(&self, query: &ProviderQuery) -> ReportResult<RawReport> {
        let (provider, result) = match query {
            ProviderQuery::Analytics(request) => ("analytics", self.analytics.run_report(request).await),
            ProviderQuery::Ads(request) => ("ads", self.ads.search(request).await),
        };

        match &result {
            Ok(report) => debug!(provider, rows = report.rows.len(), "provider report received"),
            Err(err) => error!(
                provider,
                error = %err,
                kind = ?err.provider_kind(),
                details = err.details().unwrap_or(""),
                "provider request failed"
            ),
        }
        result
    }
}
