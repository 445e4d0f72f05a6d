use axum::{
    extract::{Request, State},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::get,
    Router,
};

use super::{Entry, MetricsMiddleware};

/// Middleware for `axum::middleware::from_fn_with_state`.
///
/// Requests matched to the scrape route pass straight through to it; every
/// other request is instrumented.
pub async fn track_metrics(
    State(metrics): State<MetricsMiddleware>,
    request: Request,
    next: Next,
) -> Response {
    match metrics.enter(&request) {
        Entry::MetricsEndpoint => next.run(request).await,
        Entry::Instrumented(observation) => {
            let response = next.run(request).await;
            metrics.complete(observation, response)
        }
    }
}

/// Adds HTTP metrics to an axum router.
pub trait MetricsRouterExt {
    /// Instrument every route and register the allow-list gated scrape route.
    ///
    /// Routes added after this call are not instrumented, so call it once the
    /// router is fully built. Requests no route matches are still counted,
    /// labelled by their raw path. The scrape route sits outside the
    /// instrumentation, so it stays uncounted when the router is nested
    /// under a prefix.
    ///
    /// # Panics
    ///
    /// Panics if the router already has a route at the scrape path.
    fn with_http_metrics(self, metrics: MetricsMiddleware) -> Self;
}

impl<S> MetricsRouterExt for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_http_metrics(self, metrics: MetricsMiddleware) -> Self {
        let scrape = metrics.clone();
        let path = metrics.scrape_path().to_string();

        self.layer(from_fn_with_state(metrics, track_metrics)).route(
            &path,
            get(move |request: Request| async move { scrape.scrape(&request) }),
        )
    }
}
