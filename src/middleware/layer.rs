use axum::{http::Request, response::Response};
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use super::{Entry, MetricsMiddleware};

/// Tower layer instrumenting any request handler.
///
/// Unlike [`super::MetricsRouterExt`], the layer answers the scrape path
/// itself, so the wrapped service needs no metrics route of its own. When it
/// wraps a whole `Router` (outside of routing) no template is known and
/// requests are labelled by their raw path.
#[derive(Clone)]
pub struct MetricsLayer {
    metrics: MetricsMiddleware,
}

impl MetricsLayer {
    pub fn new(metrics: MetricsMiddleware) -> Self {
        Self { metrics }
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            metrics: self.metrics.clone(),
        }
    }
}

#[derive(Clone)]
pub struct MetricsService<S> {
    inner: S,
    metrics: MetricsMiddleware,
}

impl<S, B> Service<Request<B>> for MetricsService<S>
where
    S: Service<Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let metrics = self.metrics.clone();

        let observation = match metrics.enter(&request) {
            Entry::MetricsEndpoint => {
                let response = metrics.scrape(&request);
                return Box::pin(async move { Ok(response) });
            }
            Entry::Instrumented(observation) => observation,
        };

        // The ready service is the one driven by this call
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let response = inner.call(request).await?;
            Ok(metrics.complete(observation, response))
        })
    }
}
