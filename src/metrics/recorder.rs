use crate::errors::Result;

/// Labels of one finished request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLabels<'a> {
    pub host: &'a str,
    pub method: &'a str,
    pub route: &'a str,
    pub status: u16,
}

/// Write side of the metrics engine used by the middleware.
///
/// Implementations must tolerate concurrent calls from many in-flight
/// requests; the middleware holds no lock around them.
pub trait MetricsRecorder: Send + Sync + 'static {
    /// Count every instrumented request, labelled by host when host-tagged.
    fn increment_total(&self, host: &str);

    /// Count one request outcome.
    fn increment_count(&self, labels: &RequestLabels<'_>);

    /// Record the request latency in seconds.
    fn observe_duration(&self, labels: &RequestLabels<'_>, seconds: f64);
}

/// Read side of the metrics engine, served on the scrape path.
pub trait MetricsExporter: Send + Sync + 'static {
    /// Content type of the exposition body
    fn content_type(&self) -> String;

    /// Encode the current snapshot
    fn export(&self) -> Result<Vec<u8>>;
}
