use axum::{
    http::HeaderValue,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::report::ReportService;

use super::handlers::{
    campaign_performance, conversion_card, conversion_card_export, dashboard, health_check,
    page_views, traffic_sources, AppState,
};

pub fn create_api_router(reports: Arc<ReportService>, cors_allow_origin: Option<&str>) -> Router {
    let state = Arc::new(AppState { reports });

    let api_routes = Router::new()
        .route("/analytics", get(page_views).post(traffic_sources))
        .route("/analytics/conversion-card", get(conversion_card))
        .route("/analytics/conversion-card/export", get(conversion_card_export))
        .route("/google-ads", get(campaign_performance))
        .route("/dashboard", get(dashboard))
        .with_state(state);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(cors_layer(cors_allow_origin))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => layer.allow_origin(origin),
        Some(Err(e)) => {
            warn!("Ignoring invalid CORS_ALLOW_ORIGIN: {e}");
            layer.allow_origin(Any)
        }
        None => layer.allow_origin(Any),
    }
}
