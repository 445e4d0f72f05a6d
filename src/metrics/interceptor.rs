use axum::http::{Response, StatusCode};

/// Records the first status code committed for one response.
///
/// Starts at `200 OK`, the status an `http::Response` carries when the
/// handler never sets one. Commits after the first are ignored, the same way
/// headers cannot change once they have been sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusInterceptor {
    status: StatusCode,
    committed: bool,
}

impl Default for StatusInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusInterceptor {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            committed: false,
        }
    }

    pub fn commit(&mut self, status: StatusCode) {
        if !self.committed {
            self.status = status;
            self.committed = true;
        }
    }

    /// Capture the status of a response on its way out, returning it untouched
    pub fn intercept<B>(&mut self, response: Response<B>) -> Response<B> {
        self.commit(response.status());
        response
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_defaults_to_ok() {
        let interceptor = StatusInterceptor::new();
        assert_eq!(interceptor.status(), StatusCode::OK);
        assert!(!interceptor.committed);
    }

    #[test]
    fn test_first_commit_wins() {
        let mut interceptor = StatusInterceptor::default();
        interceptor.commit(StatusCode::NOT_FOUND);
        interceptor.commit(StatusCode::OK);
        interceptor.commit(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(interceptor.status(), StatusCode::NOT_FOUND);
        assert!(interceptor.committed);
    }

    #[test]
    fn test_intercept_passes_response_through() {
        let mut interceptor = StatusInterceptor::new();
        let response = Response::builder()
            .status(StatusCode::CREATED)
            .header("x-test", "1")
            .body(Body::from("created"))
            .unwrap();

        let response = interceptor.intercept(response);

        assert_eq!(interceptor.status(), StatusCode::CREATED);
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-test"], "1");
    }

    #[test]
    fn test_implicit_status_is_ok() {
        let mut interceptor = StatusInterceptor::new();
        interceptor.intercept(Response::new(Body::empty()));
        assert_eq!(interceptor.status(), StatusCode::OK);
    }
}
