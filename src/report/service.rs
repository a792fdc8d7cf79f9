//! Report pipeline: build query, call provider, format, aggregate

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use super::aggregate::{peak, ranked_by_group, series_by_date, totals, AggregatedSeries, RankedGroup};
use super::client::{AdsProvider, AnalyticsProvider, ReportClient};
use super::error::ReportResult;
use super::format::{format_campaigns, format_conversion_card, format_page_views, RowIssue};
use super::google::{build_http_client, GoogleAdsProvider, GoogleAnalyticsProvider};
use super::models::{
    metric_value, CampaignPerformance, ConversionCardRow, DateRange, RawReport, ReportKind,
    ReportRequest,
};
use super::query::QueryBuilder;
use crate::auth::{RefreshTokenSource, ServiceAccountKey, ServiceAccountTokenSource};
use crate::config::Config;

/// Pages kept in the dashboard's visitors-by-page ranking
pub const PAGE_VISITORS_TOP_N: usize = 10;

/// Header names plus formatted rows for one report
#[derive(Debug, Clone, Serialize)]
pub struct ReportTable<T> {
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
    pub rows: Vec<T>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<RowIssue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardInsights {
    pub total_page_views: f64,
    pub top_page: Option<RankedGroup>,
    pub peak_day: Option<RankedGroup>,
    pub total_ad_cost: f64,
    pub total_conversions: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub date_range: DashboardRange,
    pub page_views: AggregatedSeries,
    pub visitors_by_page: Vec<RankedGroup>,
    pub campaigns: Vec<CampaignPerformance>,
    pub insights: DashboardInsights,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardRange {
    pub start_date: String,
    pub end_date: String,
}

/// Entry point used by the HTTP handlers and the export CLI
#[derive(Clone)]
pub struct ReportService {
    builder: QueryBuilder,
    client: ReportClient,
}

impl ReportService {
    pub fn new(builder: QueryBuilder, client: ReportClient) -> Self {
        Self { builder, client }
    }

    /// Wire the Google providers from a validated config.
    pub fn from_config(config: &Config) -> ReportResult<Self> {
        let builder = QueryBuilder::new(&config.analytics, &config.ads)?;
        let http = build_http_client(config.http.timeout())?;

        let key = ServiceAccountKey::from_json(&config.analytics.credentials_json)?;
        let analytics_tokens =
            ServiceAccountTokenSource::new(&key, &config.http.oauth_token_url, http.clone())?;
        let ads_tokens = RefreshTokenSource::new(
            &config.ads.client_id,
            &config.ads.client_secret,
            &config.ads.refresh_token,
            &config.http.oauth_token_url,
            http.clone(),
        );

        let analytics: Arc<dyn AnalyticsProvider> = Arc::new(GoogleAnalyticsProvider::new(
            &config.analytics.base_url,
            http.clone(),
            Arc::new(analytics_tokens),
        ));
        let ads: Arc<dyn AdsProvider> = Arc::new(GoogleAdsProvider::new(
            &config.ads.base_url,
            &config.ads.api_version,
            &config.ads.developer_token,
            http,
            Arc::new(ads_tokens),
        ));

        info!(property = builder.property(), "Report providers configured");
        Ok(Self::new(builder, ReportClient::new(analytics, ads)))
    }

    async fn fetch(&self, request: &ReportRequest, today: NaiveDate) -> ReportResult<RawReport> {
        let query = self.builder.build(request, today)?;
        self.client.send(&query).await
    }

    /// Raw page-view report (date, page path)
    pub async fn page_views(&self, range: DateRange) -> ReportResult<RawReport> {
        let request = ReportRequest::new(ReportKind::PageViews).with_range(range);
        self.fetch(&request, range.end).await
    }

    /// Raw traffic-source report (session source, medium)
    pub async fn traffic_sources(&self, range: DateRange) -> ReportResult<RawReport> {
        let request = ReportRequest::new(ReportKind::TrafficSource).with_range(range);
        self.fetch(&request, range.end).await
    }

    pub async fn conversion_card(
        &self,
        request: &ReportRequest,
        today: NaiveDate,
    ) -> ReportResult<ReportTable<ConversionCardRow>> {
        let raw = self.fetch(request, today).await?;
        let formatted = format_conversion_card(&raw.rows);
        Ok(ReportTable {
            dimensions: raw.dimensions,
            metrics: raw.metrics,
            rows: formatted.rows,
            issues: formatted.issues,
        })
    }

    /// Enabled campaigns over the last seven days, cost in currency units
    pub async fn campaign_performance(&self, today: NaiveDate) -> ReportResult<Vec<CampaignPerformance>> {
        let raw = self
            .fetch(&ReportRequest::new(ReportKind::CampaignPerformance), today)
            .await?;
        Ok(format_campaigns(&raw.rows).rows)
    }

    /// Page-view trend, top pages and campaign totals for one range.
    ///
    /// Both providers are queried concurrently; either failure fails the
    /// whole summary.
    pub async fn dashboard(&self, range: DateRange, today: NaiveDate) -> ReportResult<DashboardSummary> {
        let (page_views, campaigns) =
            tokio::try_join!(self.page_views(range), self.campaign_performance(today))?;

        let pages = format_page_views(&page_views.rows);
        if !pages.is_clean() {
            warn!(issues = pages.issues.len(), "Dashboard page-view rows had issues");
        }

        let series = series_by_date(&pages.rows, |row| metric_value(row.page_views));
        let visitors_by_page = ranked_by_group(
            &pages.rows,
            |row| row.page_path.clone(),
            |row| metric_value(row.active_users),
            PAGE_VISITORS_TOP_N,
        );

        let insights = DashboardInsights {
            total_page_views: series.total(),
            top_page: visitors_by_page.first().cloned(),
            peak_day: peak(&series).map(|(label, total)| RankedGroup {
                key: label.to_string(),
                total,
            }),
            total_ad_cost: totals(&campaigns, |c| metric_value(c.cost)),
            total_conversions: totals(&campaigns, |c| metric_value(c.conversions)),
        };

        Ok(DashboardSummary {
            date_range: DashboardRange {
                start_date: range.start_str(),
                end_date: range.end_str(),
            },
            page_views: series,
            visitors_by_page,
            campaigns,
            insights,
        })
    }
}
