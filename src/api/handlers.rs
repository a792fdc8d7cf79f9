use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use crate::report::export::{
    export_file_name, to_delimited_text, CONVERSION_CARD_COLUMNS, CONVERSION_CARD_HEADERS,
};
use crate::report::models::{CampaignPerformance, ConversionCardRow};
use crate::report::{
    DashboardSummary, DateRange, ProviderErrorKind, RawReport, ReportError, ReportKind,
    ReportRequest, ReportService, ReportTable,
};

pub struct AppState {
    pub reports: Arc<ReportService>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ProviderErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSourceBody {
    #[serde(default)]
    pub date_range: Option<RangeQuery>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionCardQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<u32>,
    pub event_filter: Option<String>,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn status_for(err: &ReportError) -> StatusCode {
    match err {
        ReportError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        ReportError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ReportError::Provider {
            kind: ProviderErrorKind::Transport,
            ..
        } => StatusCode::GATEWAY_TIMEOUT,
        ReportError::Provider { .. } | ReportError::Format(_) => StatusCode::BAD_GATEWAY,
    }
}

/// Log the full error and turn it into `{error, kind, details}`
fn report_failure(context: &str, err: ReportError) -> ApiError {
    let status = status_for(&err);
    error!(
        status = status.as_u16(),
        kind = ?err.provider_kind(),
        details = err.details().unwrap_or(""),
        "{context}: {err}"
    );

    let error = match &err {
        ReportError::InvalidRequest(_) => err.to_string(),
        _ => context.to_string(),
    };
    (
        status,
        Json(ErrorResponse {
            error,
            kind: err.provider_kind(),
            details: Some(err.to_string()),
        }),
    )
}

fn resolve_range(start: Option<&str>, end: Option<&str>) -> Result<DateRange, ApiError> {
    DateRange::resolve(start, end, today()).map_err(|e| report_failure("Invalid date range", e))
}

fn conversion_card_request(query: &ConversionCardQuery) -> Result<ReportRequest, ApiError> {
    let range = resolve_range(query.start_date.as_deref(), query.end_date.as_deref())?;
    let mut request = ReportRequest::new(ReportKind::ConversionCard).with_range(range);
    if let Some(limit) = query.limit {
        request = request.with_limit(limit);
    }
    if let Some(filter) = query.event_filter.as_deref().filter(|f| !f.is_empty()) {
        request = request.with_text_filter(filter);
    }
    Ok(request)
}

/// Page views by date and page path
pub async fn page_views(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<RawReport>, ApiError> {
    let range = resolve_range(query.start_date.as_deref(), query.end_date.as_deref())?;
    state
        .reports
        .page_views(range)
        .await
        .map(Json)
        .map_err(|e| report_failure("Failed to fetch analytics data", e))
}

/// Sessions and users by traffic source
pub async fn traffic_sources(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TrafficSourceBody>,
) -> Result<Json<RawReport>, ApiError> {
    let range = body.date_range.unwrap_or_default();
    let range = resolve_range(range.start_date.as_deref(), range.end_date.as_deref())?;
    state
        .reports
        .traffic_sources(range)
        .await
        .map(Json)
        .map_err(|e| report_failure("Failed to fetch traffic source data", e))
}

pub async fn conversion_card(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConversionCardQuery>,
) -> Result<Json<ReportTable<ConversionCardRow>>, ApiError> {
    let request = conversion_card_request(&query)?;
    state
        .reports
        .conversion_card(&request, today())
        .await
        .map(Json)
        .map_err(|e| report_failure("Failed to fetch conversion card data", e))
}

/// Conversion card as a CSV attachment
pub async fn conversion_card_export(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConversionCardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let request = conversion_card_request(&query)?;
    let table = state
        .reports
        .conversion_card(&request, today())
        .await
        .map_err(|e| report_failure("Failed to fetch conversion card data", e))?;

    let csv = to_delimited_text(&table.rows, CONVERSION_CARD_COLUMNS, CONVERSION_CARD_HEADERS)
        .map_err(|e| {
            error!("Failed to export conversion card: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to export conversion card".to_string(),
                    kind: None,
                    details: Some(e.to_string()),
                }),
            )
        })?;

    let file_name = export_file_name(ReportKind::ConversionCard.name(), today());
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        csv,
    ))
}

/// Enabled campaigns, last seven days
pub async fn campaign_performance(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CampaignPerformance>>, ApiError> {
    state
        .reports
        .campaign_performance(today())
        .await
        .map(Json)
        .map_err(|e| report_failure("Failed to fetch Google Ads data", e))
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<DashboardSummary>, ApiError> {
    let range = resolve_range(query.start_date.as_deref(), query.end_date.as_deref())?;
    state
        .reports
        .dashboard(range, today())
        .await
        .map(Json)
        .map_err(|e| report_failure("Failed to build dashboard", e))
}

/// Health check endpoint
pub async fn health_check() -> Json<SuccessResponse> {
    Json(SuccessResponse {
        message: "OK".to_string(),
    })
}
