use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tower_governor::{
    GovernorError, GovernorLayer, governor::GovernorConfigBuilder,
    key_extractor::SmartIpKeyExtractor,
};
use wodparse_core::error::{ApiError, codes};

type RateLimitLayer =
    GovernorLayer<SmartIpKeyExtractor, governor::middleware::NoOpMiddleware, axum::body::Body>;

pub const PARSE_BURST: u32 = 20;

/// Rate limit for POST /v1/workouts/parse and /validate: 60 requests/minute per
/// IP, one budget across both routes. Each call builds a separate limiter, so
/// layer it once over `routes::workouts::router()`.
pub fn parse_layer() -> RateLimitLayer {
    GovernorLayer::new(
        GovernorConfigBuilder::default()
            .per_second(1) // 60 per minute = 1 per second replenish
            .burst_size(PARSE_BURST)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .expect("invalid governor config for parse"),
    )
    .error_handler(json_error_handler)
}

/// Rate limit for GET /v1/movements/*: 120 requests/minute per IP.
pub fn read_layer() -> RateLimitLayer {
    GovernorLayer::new(
        GovernorConfigBuilder::default()
            .per_millisecond(500) // 120 per minute = 2 per second replenish
            .burst_size(30)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .expect("invalid governor config for read"),
    )
    .error_handler(json_error_handler)
}

fn json_error_handler(err: GovernorError) -> Response<axum::body::Body> {
    match err {
        GovernorError::TooManyRequests { wait_time, .. } => rate_limited_response(
            StatusCode::TOO_MANY_REQUESTS,
            Some(wait_time),
            format!("Too many requests. Retry after {wait_time} seconds."),
        ),
        GovernorError::UnableToExtractKey => rate_limited_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            None,
            "Unable to determine client identity for rate limiting".to_string(),
        ),
        GovernorError::Other { code, msg, .. } => {
            rate_limited_response(code, None, msg.unwrap_or_default())
        }
    }
}

/// ApiError body plus `Retry-After` when the limiter knows the wait.
fn rate_limited_response(
    status: StatusCode,
    retry_after_secs: Option<u64>,
    message: String,
) -> Response {
    let body = ApiError {
        error: codes::RATE_LIMITED.to_string(),
        message,
        field: None,
        received: None,
        request_id: uuid::Uuid::now_v7().to_string(),
        docs_hint: None,
    };
    let mut response = (status, Json(body)).into_response();
    if let Some(secs) = retry_after_secs {
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(secs));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_many_requests_sets_retry_after() {
        let response =
            rate_limited_response(StatusCode::TOO_MANY_REQUESTS, Some(7), "slow down".to_string());
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response
                .headers()
                .get(header::RETRY_AFTER)
                .expect("retry-after header should exist"),
            "7"
        );
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .expect("content-type header should exist"),
            "application/json"
        );
    }

    #[test]
    fn key_failures_omit_retry_after() {
        let response = json_error_handler(GovernorError::UnableToExtractKey);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
    }

    #[test]
    fn layers_build() {
        let _ = parse_layer();
        let _ = read_layer();
    }
}
