pub mod config;
pub mod modules;
pub mod services;

use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use modules::metrics::metrics_routes;
use services::metrics::FeedMetrics;

/// Status surface of the service: `/health` and `/metrics`
pub fn create_app(metrics: Arc<FeedMetrics>) -> Router {
    metrics_routes(metrics)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
