use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "http-metrics-demo",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
pub struct HelloParams {
    /// Artificial latency before answering, in milliseconds
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct HelloResponse {
    pub message: String,
}

pub async fn hello(Path(id): Path<String>, Query(params): Query<HelloParams>) -> Json<HelloResponse> {
    if let Some(delay) = params.delay_ms {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    Json(HelloResponse {
        message: format!("hello {}", id),
    })
}

/// Answer with the requested status code; unknown codes give 400
pub async fn echo_status(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}
