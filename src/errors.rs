//! Error types for metric registration and exposition

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    /// Metric construction or registration was rejected by the engine
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    /// Exposition output could not be produced
    #[error("failed to encode metrics: {0}")]
    Encoding(String),
}

pub type Result<T> = std::result::Result<T, MetricsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = MetricsError::Encoding("invalid utf-8".to_string());
        assert_eq!(err.to_string(), "failed to encode metrics: invalid utf-8");

        let err: MetricsError = prometheus::Error::Msg("duplicate".to_string()).into();
        assert!(err.to_string().contains("duplicate"));
    }
}
