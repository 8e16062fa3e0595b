use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::services::metrics::FeedMetrics;

/// Handler for GET /metrics endpoint
/// Returns Prometheus metrics in text format
pub async fn get_metrics(State(metrics): State<Arc<FeedMetrics>>) -> Response {
    match metrics.export() {
        Ok(output) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4")],
            output,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to export metrics: {}", e),
        )
            .into_response(),
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub feed: &'static str,
    pub version: &'static str,
}

/// Handler for GET /health endpoint
/// The service is up whenever this answers; `feed` reflects the last health gauge
pub async fn health_check(State(metrics): State<Arc<FeedMetrics>>) -> Json<HealthResponse> {
    let feed = if metrics.health_state.get() > 0.0 {
        "degraded"
    } else {
        "healthy"
    };

    Json(HealthResponse {
        status: "ok",
        feed,
        version: env!("CARGO_PKG_VERSION"),
    })
}
