use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::collections::HashMap;
use tracing::info;

use super::recorder::{MetricsExporter, MetricsRecorder, RequestLabels};
use crate::errors::{MetricsError, Result};

/// Latency buckets in seconds, from fast paths up to one minute.
pub const DURATION_BUCKETS: [f64; 17] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 45.0,
    60.0,
];

/// Constant labels for the `app_build_info` gauge. Git labels are only
/// attached when set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub name: String,
    pub version: String,
    pub branch: Option<String>,
    pub tag: Option<String>,
    pub commit: Option<String>,
}

impl BuildInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            branch: None,
            tag: None,
            commit: None,
        }
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn commit(mut self, commit: impl Into<String>) -> Self {
        self.commit = Some(commit.into());
        self
    }

    fn const_labels(&self) -> HashMap<String, String> {
        let mut labels = HashMap::from([
            ("name".to_string(), self.name.clone()),
            ("version".to_string(), self.version.clone()),
        ]);
        let git = [("branch", &self.branch), ("tag", &self.tag), ("commit", &self.commit)];
        for (key, value) in git {
            if let Some(value) = value {
                labels.insert(key.to_string(), value.clone());
            }
        }
        labels
    }
}

/// Metric names and label set of an [`HttpMetrics`] instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSchema {
    /// Prefix of every metric name, e.g. `http` gives `http_request_total`
    pub namespace: String,
    /// Add a `host` label to every metric
    pub host_label: bool,
    /// Name of the route template label (`route` or `path`)
    pub route_label: String,
    /// Name of the status code label
    pub status_label: String,
    pub build_info: Option<BuildInfo>,
}

impl Default for MetricsSchema {
    fn default() -> Self {
        Self {
            namespace: "http".to_string(),
            host_label: true,
            route_label: "route".to_string(),
            status_label: "code".to_string(),
            build_info: None,
        }
    }
}

impl MetricsSchema {
    /// Label set without the `host` label
    pub fn single_tenant() -> Self {
        Self {
            host_label: false,
            ..Self::default()
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn route_label(mut self, name: impl Into<String>) -> Self {
        self.route_label = name.into();
        self
    }

    pub fn status_label(mut self, name: impl Into<String>) -> Self {
        self.status_label = name.into();
        self
    }

    pub fn build_info(mut self, info: BuildInfo) -> Self {
        self.build_info = Some(info);
        self
    }

    fn total_label_names(&self) -> Vec<&str> {
        if self.host_label {
            vec!["host"]
        } else {
            Vec::new()
        }
    }

    fn outcome_label_names(&self) -> Vec<&str> {
        let mut names = self.total_label_names();
        names.extend(["method", self.route_label.as_str(), self.status_label.as_str()]);
        names
    }
}

/// Prometheus-backed HTTP request metrics with their own registry.
///
/// Registered metrics (with the default namespace):
/// - `http_request_total{host}` - counter of every instrumented request
/// - `http_request_count{host, method, route, code}` - counter per outcome
/// - `http_request_duration_seconds{host, method, route, code}` - latency histogram
/// - `app_build_info{name, version, branch?, tag?, commit?}` - gauge set to 1, when configured
pub struct HttpMetrics {
    registry: Registry,
    schema: MetricsSchema,
    request_total: IntCounterVec,
    request_count: IntCounterVec,
    request_duration: HistogramVec,
}

impl HttpMetrics {
    pub fn new(schema: MetricsSchema) -> Result<Self> {
        Self::with_registry(Registry::new(), schema)
    }

    /// Register the request metrics on an existing registry
    pub fn with_registry(registry: Registry, schema: MetricsSchema) -> Result<Self> {
        let request_total = IntCounterVec::new(
            Opts::new("request_total", "Total number of HTTP requests received")
                .namespace(schema.namespace.clone()),
            &schema.total_label_names(),
        )?;

        let request_count = IntCounterVec::new(
            Opts::new("request_count", "HTTP requests by method, route and status code")
                .namespace(schema.namespace.clone()),
            &schema.outcome_label_names(),
        )?;

        let request_duration = HistogramVec::new(
            HistogramOpts::new("request_duration_seconds", "HTTP request duration in seconds")
                .namespace(schema.namespace.clone())
                .buckets(DURATION_BUCKETS.to_vec()),
            &schema.outcome_label_names(),
        )?;

        registry.register(Box::new(request_total.clone()))?;
        registry.register(Box::new(request_count.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;

        if let Some(build) = &schema.build_info {
            let gauge = IntGauge::with_opts(
                Opts::new("build_info", "Application build information")
                    .namespace("app")
                    .const_labels(build.const_labels()),
            )?;
            gauge.set(1);
            registry.register(Box::new(gauge))?;
        }

        info!(
            namespace = %schema.namespace,
            host_label = schema.host_label,
            route_label = %schema.route_label,
            "Registered HTTP request metrics"
        );

        Ok(Self {
            registry,
            schema,
            request_total,
            request_count,
            request_duration,
        })
    }

    /// Also export process CPU, memory and file descriptor metrics.
    /// Only available on Linux; a no-op elsewhere.
    pub fn with_process_collector(self) -> Result<Self> {
        #[cfg(target_os = "linux")]
        self.registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;
        Ok(self)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn request_total(&self) -> &IntCounterVec {
        &self.request_total
    }

    pub fn request_count(&self) -> &IntCounterVec {
        &self.request_count
    }

    pub fn request_duration(&self) -> &HistogramVec {
        &self.request_duration
    }

    /// Current snapshot in the text exposition format
    pub fn render(&self) -> Result<String> {
        let buffer = self.export()?;
        String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
    }

    fn total_values<'a>(&self, host: &'a str) -> Vec<&'a str> {
        if self.schema.host_label {
            vec![host]
        } else {
            Vec::new()
        }
    }

    fn outcome_values<'a>(&self, labels: &RequestLabels<'a>, code: &'a str) -> Vec<&'a str> {
        let mut values = self.total_values(labels.host);
        values.extend([labels.method, labels.route, code]);
        values
    }
}

impl MetricsRecorder for HttpMetrics {
    fn increment_total(&self, host: &str) {
        self.request_total
            .with_label_values(&self.total_values(host))
            .inc();
    }

    fn increment_count(&self, labels: &RequestLabels<'_>) {
        let code = labels.status.to_string();
        self.request_count
            .with_label_values(&self.outcome_values(labels, &code))
            .inc();
    }

    fn observe_duration(&self, labels: &RequestLabels<'_>, seconds: f64) {
        let code = labels.status.to_string();
        self.request_duration
            .with_label_values(&self.outcome_values(labels, &code))
            .observe(seconds);
    }
}

impl MetricsExporter for HttpMetrics {
    fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }

    fn export(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}
