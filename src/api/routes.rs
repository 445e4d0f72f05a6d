use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{echo_status, health, hello};
use crate::middleware::{MetricsMiddleware, MetricsRouterExt};

pub fn create_router(metrics: MetricsMiddleware) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/hello/:id", get(hello))
        .route("/status/:code", get(echo_status))
        // Must come after every route it should instrument
        .with_http_metrics(metrics)
        .layer(TraceLayer::new_for_http())
}
