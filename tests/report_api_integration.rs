//! Integration tests for the report API endpoints
//!
//! The router is driven with `oneshot` against in-process fake providers, so
//! these tests cover request parsing, query construction, formatting and the
//! error-to-status mapping without any network access.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use reportdeck::config::{AdsConfig, AnalyticsConfig};
use reportdeck::report::query::{AdsSearchRequest, RunReportRequest};
use reportdeck::report::{
    AdsProvider, AnalyticsProvider, ProviderErrorKind, QueryBuilder, RawReport, RawReportRow,
    ReportClient, ReportError, ReportResult, ReportService,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Answers every runReport call with canned rows and records the request
struct FakeAnalytics {
    rows: Vec<RawReportRow>,
    requests: Mutex<Vec<RunReportRequest>>,
}

#[async_trait]
impl AnalyticsProvider for FakeAnalytics {
    async fn run_report(&self, request: &RunReportRequest) -> ReportResult<RawReport> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(RawReport {
            dimensions: request.dimensions.iter().map(|d| d.name.clone()).collect(),
            metrics: request.metrics.iter().map(|m| m.name.clone()).collect(),
            rows: self.rows.clone(),
        })
    }
}

struct FakeAds {
    result: Result<Vec<RawReportRow>, ProviderErrorKind>,
}

#[async_trait]
impl AdsProvider for FakeAds {
    async fn search(&self, _request: &AdsSearchRequest) -> ReportResult<RawReport> {
        match &self.result {
            Ok(rows) => Ok(RawReport {
                dimensions: vec!["campaign.id".to_string(), "campaign.name".to_string()],
                metrics: Vec::new(),
                rows: rows.clone(),
            }),
            Err(kind) => Err(ReportError::provider(*kind, "ads call failed").with_details("upstream body")),
        }
    }
}

fn query_builder() -> QueryBuilder {
    QueryBuilder::new(
        &AnalyticsConfig {
            property_id: "123456".to_string(),
            credentials_json: "{}".to_string(),
            base_url: "http://localhost".to_string(),
        },
        &AdsConfig {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            developer_token: "dev".to_string(),
            refresh_token: "refresh".to_string(),
            customer_id: "123-456-7890".to_string(),
            login_customer_id: None,
            base_url: "http://localhost".to_string(),
            api_version: "v19".to_string(),
        },
    )
    .unwrap()
}

fn create_test_app(
    analytics_rows: Vec<RawReportRow>,
    ads: Result<Vec<RawReportRow>, ProviderErrorKind>,
) -> (Router, Arc<FakeAnalytics>) {
    let analytics = Arc::new(FakeAnalytics {
        rows: analytics_rows,
        requests: Mutex::new(Vec::new()),
    });
    let client = ReportClient::new(analytics.clone(), Arc::new(FakeAds { result: ads }));
    let service = Arc::new(ReportService::new(query_builder(), client));
    (reportdeck::api::create_api_router(service, None), analytics)
}

fn page_view_rows() -> Vec<RawReportRow> {
    vec![
        RawReportRow::new(["20240101", "/"], ["3", "2"]),
        RawReportRow::new(["20240101", "/pricing"], ["2", "4"]),
        RawReportRow::new(["20240102", "/"], ["7", "1"]),
    ]
}

fn conversion_rows() -> Vec<RawReportRow> {
    vec![
        RawReportRow::new(
            ["20240102", "google", "cpc", "mobile", "contact_submit", "spring, sale", "shoes"],
            ["4", "3", "2"],
        ),
        RawReportRow::new(
            ["20240101", "naver", "organic", "desktop", "contact_call", "(not set)", "(not set)"],
            ["1", "1", "1"],
        ),
    ]
}

fn campaign_rows() -> Vec<RawReportRow> {
    vec![
        RawReportRow::new(["11", "Brand"], ["1000", "20", "2500000", "3"]),
        RawReportRow::new(["12", "Search"], ["400", "0", "0", "0"]),
    ]
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>, Option<String>, Option<String>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .map(|v| v.to_str().unwrap().to_string());
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec(), content_type, disposition)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, body, _, _) = get(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = create_test_app(Vec::new(), Ok(Vec::new()));
    let (status, json) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "OK");
}

#[tokio::test]
async fn test_page_views_returns_raw_rows_for_requested_range() {
    let (app, analytics) = create_test_app(page_view_rows(), Ok(Vec::new()));
    let (status, json) = get_json(app, "/api/analytics?startDate=2024-01-01&endDate=2024-01-07").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["dimensions"], serde_json::json!(["date", "pagePath"]));
    assert_eq!(json["rows"].as_array().unwrap().len(), 3);
    assert_eq!(json["rows"][0]["dimensions"][1], "/");
    assert_eq!(json["rows"][0]["metrics"][0], "3");

    let requests = analytics.requests.lock().unwrap();
    assert_eq!(requests[0].property, "properties/123456");
    assert_eq!(requests[0].date_ranges[0].start_date, "2024-01-01");
    assert_eq!(requests[0].date_ranges[0].end_date, "2024-01-07");
}

#[tokio::test]
async fn test_inverted_range_is_bad_request() {
    let (app, analytics) = create_test_app(page_view_rows(), Ok(Vec::new()));
    let (status, json) = get_json(app, "/api/analytics?startDate=2024-02-01&endDate=2024-01-01").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("after end date"));
    assert!(json.get("kind").is_none());
    assert!(analytics.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_traffic_sources_post_uses_body_range() {
    let (app, analytics) = create_test_app(
        vec![RawReportRow::new(["google", "organic"], ["10", "8", "5"])],
        Ok(Vec::new()),
    );

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/analytics")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"dateRange":{"startDate":"2024-03-01","endDate":"2024-03-31"}}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["metrics"], serde_json::json!(["sessions", "totalUsers", "newUsers"]));

    let requests = analytics.requests.lock().unwrap();
    assert_eq!(requests[0].dimensions[0].name, "sessionSource");
    assert_eq!(requests[0].date_ranges[0].start_date, "2024-03-01");
    assert_eq!(requests[0].date_ranges[0].end_date, "2024-03-31");
}

#[tokio::test]
async fn test_conversion_card_formats_rows_and_forwards_filter() {
    let (app, analytics) = create_test_app(conversion_rows(), Ok(Vec::new()));
    let (status, json) = get_json(
        app,
        "/api/analytics/conversion-card?startDate=2024-01-01&endDate=2024-01-07&limit=5&eventFilter=contact",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let rows = json["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["eventName"], "contact_submit");
    assert_eq!(rows[0]["deviceCategory"], "mobile");
    assert_eq!(rows[0]["eventCount"], 4.0);
    assert_eq!(rows[1]["source"], "naver");
    assert!(json.get("issues").is_none());

    let requests = analytics.requests.lock().unwrap();
    assert_eq!(requests[0].limit, Some(5));
    let filter = requests[0].dimension_filter.as_ref().unwrap();
    assert_eq!(filter.filter.field_name, "eventName");
    assert_eq!(filter.filter.string_filter.value, "contact");
}

#[tokio::test]
async fn test_conversion_card_reports_short_rows_as_issues() {
    let (app, _) = create_test_app(
        vec![RawReportRow::new(["20240101", "google"], ["2"])],
        Ok(Vec::new()),
    );
    let (status, json) = get_json(app, "/api/analytics/conversion-card?startDate=2024-01-01&endDate=2024-01-01").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["rows"][0]["source"], "google");
    assert!(json["rows"][0].get("eventName").is_none());
    assert_eq!(json["issues"][0]["kind"], "short_row");
}

#[tokio::test]
async fn test_conversion_card_export_is_csv_attachment() {
    let (app, _) = create_test_app(conversion_rows(), Ok(Vec::new()));
    let (status, body, content_type, disposition) = get(
        app,
        "/api/analytics/conversion-card/export?startDate=2024-01-01&endDate=2024-01-07",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/csv; charset=utf-8"));
    let disposition = disposition.unwrap();
    assert!(disposition.starts_with("attachment; filename=\"conversion-card_"));
    assert!(disposition.ends_with(".csv\""));

    let text = String::from_utf8(body).unwrap();
    let lines: Vec<&str> = text.split('\n').collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Date,Source,Medium"));
    assert_eq!(
        lines[1],
        "2024-01-02,google,cpc,mobile,contact_submit,\"spring, sale\",shoes,4,3,2"
    );
}

#[tokio::test]
async fn test_google_ads_scales_cost() {
    let (app, _) = create_test_app(Vec::new(), Ok(campaign_rows()));
    let (status, json) = get_json(app, "/api/google-ads").await;

    assert_eq!(status, StatusCode::OK);
    let campaigns = json.as_array().unwrap();
    assert_eq!(campaigns.len(), 2);
    assert_eq!(campaigns[0]["campaignName"], "Brand");
    assert_eq!(campaigns[0]["cost"], 2.5);
    assert_eq!(campaigns[0]["impressions"], 1000.0);
}

#[tokio::test]
async fn test_provider_failures_map_to_gateway_errors() {
    let (app, _) = create_test_app(Vec::new(), Err(ProviderErrorKind::Unauthenticated));
    let (status, json) = get_json(app, "/api/google-ads").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"], "Failed to fetch Google Ads data");
    assert_eq!(json["details"], "ads call failed");
    assert_eq!(json["kind"], "unauthenticated");

    let (app, _) = create_test_app(Vec::new(), Err(ProviderErrorKind::Transport));
    let (status, _) = get_json(app, "/api/google-ads").await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn test_dashboard_summarizes_both_providers() {
    let (app, _) = create_test_app(page_view_rows(), Ok(campaign_rows()));
    let (status, json) = get_json(app, "/api/dashboard?startDate=2024-01-01&endDate=2024-01-07").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["dateRange"]["startDate"], "2024-01-01");
    assert_eq!(json["pageViews"]["labels"], serde_json::json!(["20240101", "20240102"]));
    assert_eq!(json["pageViews"]["values"], serde_json::json!([5.0, 7.0]));
    assert_eq!(json["visitorsByPage"][0]["key"], "/pricing");
    assert_eq!(json["visitorsByPage"][1]["key"], "/");
    assert_eq!(json["visitorsByPage"][1]["total"], 3.0);

    let insights = &json["insights"];
    assert_eq!(insights["totalPageViews"], 12.0);
    assert_eq!(insights["peakDay"]["key"], "20240102");
    assert_eq!(insights["topPage"]["key"], "/pricing");
    assert_eq!(insights["totalAdCost"], 2.5);
    assert_eq!(insights["totalConversions"], 3.0);
}
