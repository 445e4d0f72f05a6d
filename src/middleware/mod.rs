//! Request instrumentation shared by every host adapter.
//!
//! Each request enters through [`MetricsMiddleware::enter`]:
//! - the scrape path is served (or refused) without touching any counter
//! - every other request increments the total counter, runs the rest of the
//!   chain, then records its outcome through [`MetricsMiddleware::complete`]

pub mod layer;
pub mod router;

use axum::{
    extract::MatchedPath,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::allow_list::AllowList;
use crate::client_ip::client_ip_of;
use crate::config::{MetricsOption, MetricsOptions};
use crate::metrics::{
    export_response, HttpMetrics, MetricsExporter, MetricsRecorder, RequestLabels,
    StatusInterceptor,
};

pub use layer::{MetricsLayer, MetricsService};
pub use router::{track_metrics, MetricsRouterExt};

/// Per-request data captured on entry and consumed on exit.
#[derive(Debug)]
pub struct RequestObservation {
    host: String,
    method: String,
    route: String,
    start: Instant,
}

/// Where a request goes after entry.
#[derive(Debug)]
pub enum Entry {
    /// The request targets the scrape path and is never instrumented
    MetricsEndpoint,
    /// The request was counted and must be completed once the chain returns
    Instrumented(RequestObservation),
}

/// Instrumentation core. Cheap to clone; configuration is immutable.
#[derive(Clone)]
pub struct MetricsMiddleware {
    inner: Arc<Inner>,
}

struct Inner {
    options: MetricsOptions,
    allow_list: AllowList,
    recorder: Arc<dyn MetricsRecorder>,
    exporter: Arc<dyn MetricsExporter>,
}

impl MetricsMiddleware {
    /// Instrument with prometheus-backed metrics, serving their registry on the scrape path
    pub fn new<I>(metrics: Arc<HttpMetrics>, options: I) -> Self
    where
        I: IntoIterator<Item = MetricsOption>,
    {
        Self::with_backend(metrics.clone(), metrics, options)
    }

    pub fn with_backend<I>(
        recorder: Arc<dyn MetricsRecorder>,
        exporter: Arc<dyn MetricsExporter>,
        options: I,
    ) -> Self
    where
        I: IntoIterator<Item = MetricsOption>,
    {
        let options = MetricsOptions::merge(options);
        let allow_list = AllowList::new(options.allow_list().iter().cloned());

        info!(
            scrape_path = %options.scrape_path(),
            allow_list_enabled = options.allow_list_enabled(),
            allowed_ips = allow_list.len(),
            "Initialized HTTP metrics middleware"
        );

        Self {
            inner: Arc::new(Inner {
                options,
                allow_list,
                recorder,
                exporter,
            }),
        }
    }

    pub fn options(&self) -> &MetricsOptions {
        &self.inner.options
    }

    pub fn scrape_path(&self) -> &str {
        self.inner.options.scrape_path()
    }

    /// A tower layer that instruments any service and answers the scrape path itself
    pub fn layer(&self) -> MetricsLayer {
        MetricsLayer::new(self.clone())
    }

    pub fn is_scrape_path(&self, route: &str) -> bool {
        route == self.scrape_path()
    }

    /// Whether a client may read the scrape path. Always true with enforcement off.
    pub fn admits(&self, client_ip: &str) -> bool {
        !self.inner.options.allow_list_enabled() || self.inner.allow_list.contains(client_ip)
    }

    /// Answer a scrape: 404 for clients outside the allow list, otherwise the
    /// exporter's snapshot.
    pub fn serve_scrape(&self, client_ip: &str) -> Response {
        if !self.admits(client_ip) {
            debug!(client_ip = %client_ip, "Denied metrics scrape");
            return StatusCode::NOT_FOUND.into_response();
        }
        export_response(self.inner.exporter.as_ref())
    }

    /// Answer a scrape request, resolving the client IP only when the allow
    /// list is enforced.
    pub fn scrape<B>(&self, request: &Request<B>) -> Response {
        if self.inner.options.allow_list_enabled() {
            return self.serve_scrape(&client_ip_of(request));
        }
        export_response(self.inner.exporter.as_ref())
    }

    /// Resolve the route of a request and, unless it is the scrape path,
    /// count it and start its timer.
    pub fn enter<B>(&self, request: &Request<B>) -> Entry {
        let route = route_template(request);
        if self.is_scrape_path(&route) {
            return Entry::MetricsEndpoint;
        }
        Entry::Instrumented(self.begin(request_host(request), request.method().as_str(), route))
    }

    pub fn begin(
        &self,
        host: impl Into<String>,
        method: impl Into<String>,
        route: impl Into<String>,
    ) -> RequestObservation {
        let start = Instant::now();
        let host = host.into();
        self.inner.recorder.increment_total(&host);
        RequestObservation {
            host,
            method: method.into(),
            route: route.into(),
            start,
        }
    }

    /// Record the outcome of an instrumented request. Durations of 404
    /// responses are not observed.
    pub fn finish(&self, observation: RequestObservation, status: StatusCode) {
        let labels = RequestLabels {
            host: &observation.host,
            method: &observation.method,
            route: &observation.route,
            status: status.as_u16(),
        };
        self.inner.recorder.increment_count(&labels);
        if status == StatusCode::NOT_FOUND {
            return;
        }
        self.inner
            .recorder
            .observe_duration(&labels, observation.start.elapsed().as_secs_f64());
    }

    /// Capture the status of the downstream response and finish the observation
    pub fn complete(&self, observation: RequestObservation, response: Response) -> Response {
        let mut interceptor = StatusInterceptor::new();
        let response = interceptor.intercept(response);
        self.finish(observation, interceptor.status());
        response
    }
}

/// Matched route template of a request, or its raw path when the router
/// exposes none.
pub fn route_template<B>(request: &Request<B>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path().to_string(), |mp| mp.as_str().to_string())
}

/// `Host` header of a request, falling back to the URI authority.
pub fn request_host<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().authority().map(|a| a.as_str()))
        .unwrap_or("")
        .to_string()
}


#[cfg(test)]
mod tests {
    use super::testing::middleware;
    use super::*;
    use crate::config::{allow_ips, enable_allow_list, scrape_path};
    use axum::body::Body;

    fn request(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::HOST, "api.example.com")
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_enter_scrape_path_is_not_counted() {
        let (mw, backend) = middleware(vec![]);

        assert!(matches!(mw.enter(&request("/metrics")), Entry::MetricsEndpoint));
        assert!(backend.totals().is_empty());
    }

    #[test]
    fn test_enter_without_template_uses_raw_path() {
        let (mw, backend) = middleware(vec![]);

        let Entry::Instrumented(observation) = mw.enter(&request("/users/42")) else {
            panic!("expected an instrumented request");
        };
        assert_eq!(observation.route, "/users/42");
        assert_eq!(observation.method, "POST");
        assert_eq!(observation.host, "api.example.com");
        assert_eq!(backend.totals(), vec!["api.example.com".to_string()]);
    }

    #[test]
    fn test_finish_records_count_and_duration() {
        let (mw, backend) = middleware(vec![]);

        let observation = mw.begin("h", "GET", "/a");
        mw.finish(observation, StatusCode::OK);

        assert_eq!(backend.counts().len(), 1);
        assert_eq!(backend.counts()[0].status, 200);
        let durations = backend.durations();
        assert_eq!(durations.len(), 1);
        assert!(durations[0].1 >= 0.0);
    }

    #[test]
    fn test_finish_skips_duration_for_not_found() {
        let (mw, backend) = middleware(vec![]);

        let observation = mw.begin("h", "GET", "/missing");
        mw.finish(observation, StatusCode::NOT_FOUND);

        assert_eq!(backend.counts().len(), 1);
        assert_eq!(backend.counts()[0].status, 404);
        assert!(backend.durations().is_empty());
    }

    #[test]
    fn test_complete_passes_response_through() {
        let (mw, backend) = middleware(vec![]);

        let observation = mw.begin("h", "GET", "/teapot");
        let response = mw.complete(observation, StatusCode::IM_A_TEAPOT.into_response());

        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(backend.counts()[0].status, 418);
    }

    #[test]
    fn test_admits() {
        let (open, _) = middleware(vec![allow_ips(["127.0.0.1"])]);
        assert!(open.admits("10.0.0.1"));

        let (gated, _) = middleware(vec![allow_ips(["127.0.0.1"]), enable_allow_list(true)]);
        assert!(gated.admits("127.0.0.1"));
        assert!(!gated.admits("10.0.0.1"));
        assert!(!gated.admits(""));

        let (closed, _) = middleware(vec![enable_allow_list(true)]);
        assert!(!closed.admits("127.0.0.1"));
    }

    #[test]
    fn test_serve_scrape_denied() {
        let (mw, backend) = middleware(vec![allow_ips(["127.0.0.1"]), enable_allow_list(true)]);

        let response = mw.serve_scrape("10.0.0.1");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(backend.exports(), 0);
    }

    #[test]
    fn test_serve_scrape_allowed() {
        let (mw, backend) = middleware(vec![allow_ips(["127.0.0.1"]), enable_allow_list(true)]);

        let response = mw.serve_scrape("127.0.0.1");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(backend.exports(), 1);
        assert!(backend.totals().is_empty());
    }

    #[test]
    fn test_custom_scrape_path() {
        let (mw, _) = middleware(vec![scrape_path("internal/prom ")]);
        assert_eq!(mw.scrape_path(), "/internal/prom");
        assert!(mw.is_scrape_path("/internal/prom"));
        assert!(!mw.is_scrape_path("/metrics"));
    }

    #[test]
    fn test_request_host_falls_back_to_authority() {
        let req = Request::builder()
            .uri("http://svc.internal:8080/x")
            .body(Body::empty())
            .unwrap();
        assert_eq!(request_host(&req), "svc.internal:8080");

        let req = Request::builder().uri("/x").body(Body::empty()).unwrap();
        assert_eq!(request_host(&req), "");
    }
}
