use axum::{routing::get, Router};
use std::sync::Arc;

use super::controller::{get_metrics, health_check};
use crate::services::metrics::FeedMetrics;

pub fn metrics_routes(metrics: Arc<FeedMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(get_metrics))
        .route("/health", get(health_check))
        .with_state(metrics)
}
