pub mod interceptor;
pub mod recorder;
pub mod registry;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

pub use interceptor::StatusInterceptor;
pub use recorder::{MetricsExporter, MetricsRecorder, RequestLabels};
pub use registry::{BuildInfo, HttpMetrics, MetricsSchema, DURATION_BUCKETS};

/// Serve the exporter's current snapshot
pub fn export_response(exporter: &dyn MetricsExporter) -> Response {
    match exporter.export() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, exporter.content_type())],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{MetricsError, Result};

    struct BrokenExporter;

    impl MetricsExporter for BrokenExporter {
        fn content_type(&self) -> String {
            "text/plain".to_string()
        }

        fn export(&self) -> Result<Vec<u8>> {
            Err(MetricsError::Encoding("broken".to_string()))
        }
    }

    #[tokio::test]
    async fn test_export_response_ok() {
        let metrics = HttpMetrics::new(MetricsSchema::default()).unwrap();
        metrics.increment_total("localhost");

        let response = export_response(&metrics);
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains(r#"http_request_total{host="localhost"} 1"#));
    }

    #[test]
    fn test_export_response_error() {
        let response = export_response(&BrokenExporter);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
