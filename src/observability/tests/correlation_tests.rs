#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::extract::{Extension, Request};
    use axum::http::{Method, StatusCode};
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    use crate::observability::correlation::{
        create_request_id_middleware, request_id_middleware, RateLimitConfig, RequestContext,
        CORRELATION_ID_HEADER, REQUEST_ID_HEADER,
    };

    async fn context_probe(Extension(context): Extension<RequestContext>) -> String {
        context.correlation_id
    }

    fn test_app() -> Router {
        Router::new()
            .route("/test", get(context_probe))
            .layer(from_fn(request_id_middleware))
    }

    #[tokio::test]
    async fn test_request_id_middleware_with_correlation_id() {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/test")
            .header(CORRELATION_ID_HEADER, "test-correlation-123")
            .body(Body::empty())
            .expect("Failed to build test request");

        let response = test_app().oneshot(request).await.expect("request failed");
        assert_eq!(response.status(), StatusCode::OK);

        let correlation_header = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .expect("Correlation ID header should be present");
        assert_eq!(correlation_header, "test-correlation-123");

        let request_header = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .expect("Request ID header should be present");
        assert!(!request_header.is_empty());
    }

    #[tokio::test]
    async fn test_request_id_middleware_without_correlation_id() {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/test")
            .body(Body::empty())
            .expect("Failed to build test request");

        let response = test_app().oneshot(request).await.expect("request failed");
        assert_eq!(response.status(), StatusCode::OK);

        // Both identifiers should be generated
        let correlation_header = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .expect("Correlation ID should be generated");
        let request_header = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .expect("Request ID should be generated");

        assert!(!correlation_header.is_empty());
        assert!(!request_header.is_empty());
        assert_ne!(correlation_header, request_header);
    }

    #[tokio::test]
    async fn test_invalid_correlation_id_rejected() {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/test")
            .header(CORRELATION_ID_HEADER, "invalid-id-with-@#$%")
            .body(Body::empty())
            .expect("Failed to build test request");

        let response = test_app().oneshot(request).await.expect("request failed");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_too_long_correlation_id_rejected() {
        let long_id = "a".repeat(201);
        let request = Request::builder()
            .method(Method::GET)
            .uri("/test")
            .header(CORRELATION_ID_HEADER, long_id)
            .body(Body::empty())
            .expect("Failed to build test request");

        let response = test_app().oneshot(request).await.expect("request failed");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_configured_rate_limit_rejects_excess_requests() {
        let config = RateLimitConfig {
            max_correlation_id_length: 200,
            max_requests_per_correlation_id: 2,
            rate_limit_window_secs: 60,
            enabled: true,
        };
        let app = Router::new()
            .route("/test", get(context_probe))
            .layer(from_fn(create_request_id_middleware(config)));

        for _ in 0..2 {
            let request = Request::builder()
                .method(Method::GET)
                .uri("/test")
                .header(CORRELATION_ID_HEADER, "rate-limited-id")
                .body(Body::empty())
                .expect("Failed to build test request");
            let response = app.clone().oneshot(request).await.expect("request failed");
            assert_eq!(response.status(), StatusCode::OK);
        }

        let request = Request::builder()
            .method(Method::GET)
            .uri("/test")
            .header(CORRELATION_ID_HEADER, "rate-limited-id")
            .body(Body::empty())
            .expect("Failed to build test request");
        let response = app.oneshot(request).await.expect("request failed");
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
