use axum::extract::Request;
use axum::http::header::{self, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

const BASELINE: &[(&str, &str)] = &[
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "no-referrer"),
    ("x-frame-options", "DENY"),
    // Narrow on purpose so the Swagger UI keeps working.
    ("content-security-policy", "frame-ancestors 'none'"),
];

/// Security-header baseline for every response. Parse responses echo user
/// text, so they are additionally marked non-cacheable.
pub async fn apply(req: Request, next: Next) -> Response {
    let echoes_text = req.uri().path().starts_with("/v1/workouts/");
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    for &(name, value) in BASELINE {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    if echoes_text {
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    }
    response
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::{get, post};
    use axum::{Router, middleware};
    use tower::ServiceExt;

    use super::*;

    async fn ok() -> StatusCode {
        StatusCode::OK
    }

    fn app() -> Router {
        Router::new()
            .route("/health", get(ok))
            .route("/v1/workouts/parse", post(ok))
            .layer(middleware::from_fn(apply))
    }

    async fn send(method: &str, uri: &str) -> Response {
        app()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed")
    }

    #[tokio::test]
    async fn apply_adds_security_headers() {
        let response = send("GET", "/health").await;
        let headers = response.headers();
        assert_eq!(
            headers
                .get("x-content-type-options")
                .expect("x-content-type-options header should exist"),
            "nosniff"
        );
        assert_eq!(
            headers
                .get("x-frame-options")
                .expect("x-frame-options header should exist"),
            "DENY"
        );
        assert_eq!(
            headers
                .get("content-security-policy")
                .expect("content-security-policy header should exist"),
            "frame-ancestors 'none'"
        );
        assert!(headers.get("cache-control").is_none());
    }

    #[tokio::test]
    async fn workout_responses_are_not_cached() {
        let response = send("POST", "/v1/workouts/parse").await;
        assert_eq!(
            response
                .headers()
                .get("cache-control")
                .expect("cache-control header should exist"),
            "no-store"
        );
    }
}
