use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::{Json, Router, routing::post};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;
use wodparse_core::{EngineError, IssueCode, ParseResult, ParsingIssue};

use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;

/// Parse and validate in one router, so a single rate-limit layer covers both.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/workouts/parse", post(parse_workout))
        .route("/v1/workouts/validate", post(validate_workout))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct WorkoutTextRequest {
    /// Raw workout text as written by the athlete or coach
    pub text: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ParseMeta {
    pub generated_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub parser_version: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ParseWorkoutResponse {
    #[serde(flatten)]
    pub result: ParseResult,
    pub meta: ParseMeta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidateWorkoutResponse {
    /// False when any issue would stop a parse
    pub valid: bool,
    pub issues: Vec<ParsingIssue>,
}

/// Parse free-text workout into a structured workout with confidence and issues.
///
/// Problems in the text come back as issues with `success: false`, never as an
/// HTTP error. Only exceeding the parse budget produces a non-2xx response.
#[utoipa::path(
    post,
    path = "/v1/workouts/parse",
    request_body = WorkoutTextRequest,
    responses(
        (status = 200, description = "Parse finished", body = ParseWorkoutResponse),
        (status = 400, description = "Malformed request body", body = wodparse_core::error::ApiError),
        (status = 429, description = "Rate limited", body = wodparse_core::error::ApiError),
        (status = 504, description = "Parse exceeded the time budget", body = wodparse_core::error::ApiError)
    ),
    tag = "workouts"
)]
pub async fn parse_workout(
    State(state): State<AppState>,
    AppJson(req): AppJson<WorkoutTextRequest>,
) -> Result<Json<ParseWorkoutResponse>, AppError> {
    let started = Instant::now();
    let cancel = CancellationToken::new();
    // Fires on every exit, including a dropped request, so the detached parse
    // stops at its next movement line.
    let _stop_parse = cancel.clone().drop_guard();

    let task = tokio::spawn({
        let parser = Arc::clone(&state.parser);
        let cancel = cancel.clone();
        async move { parser.parse_with_cancellation(&req.text, &cancel).await }
    });

    let result = match tokio::time::timeout(state.parse_timeout, task).await {
        Ok(Ok(Ok(result))) => result,
        Ok(Ok(Err(EngineError::Dictionary(err)))) => return Err(AppError::Dictionary(err)),
        Ok(Ok(Err(EngineError::Cancelled))) | Err(_) => {
            return Err(timeout_error(state.parse_timeout));
        }
        Ok(Err(join_error)) => return Err(AppError::Internal(join_error.to_string())),
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    tracing::info!(
        success = result.success,
        confidence = result.confidence,
        movements = result.workout.movements.len(),
        errors = result.errors.len(),
        warnings = result.warnings.len(),
        elapsed_ms,
        "workout parsed"
    );

    Ok(Json(ParseWorkoutResponse {
        result,
        meta: ParseMeta {
            generated_at: Utc::now(),
            elapsed_ms,
            parser_version: env!("CARGO_PKG_VERSION").to_string(),
        },
    }))
}

fn timeout_error(budget: Duration) -> AppError {
    let timeout_ms = budget.as_millis() as u64;
    let issue = ParsingIssue::new(IssueCode::ProcessingTimeout, &[&timeout_ms.to_string()]);
    AppError::Timeout {
        timeout_ms,
        issue: Box::new(issue),
    }
}

/// Cheap structural check: presence, length bounds and digits. No movement lookups.
#[utoipa::path(
    post,
    path = "/v1/workouts/validate",
    request_body = WorkoutTextRequest,
    responses(
        (status = 200, description = "Validation finished", body = ValidateWorkoutResponse),
        (status = 400, description = "Malformed request body", body = wodparse_core::error::ApiError)
    ),
    tag = "workouts"
)]
pub async fn validate_workout(
    State(state): State<AppState>,
    AppJson(req): AppJson<WorkoutTextRequest>,
) -> Json<ValidateWorkoutResponse> {
    let issues = state.parser.validate(&req.text);
    let valid = !issues.iter().any(ParsingIssue::is_blocking);
    Json(ValidateWorkoutResponse { valid, issues })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use wodparse_core::error::DictionaryError;
    use wodparse_core::model::MovementIdentity;
    use wodparse_core::{MovementDictionary, ParserConfig, WorkoutParser};

    use super::*;

    fn app(state: AppState) -> Router {
        router().with_state(state)
    }

    fn post_request(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::from(body.to_string()))
            .expect("request should build")
    }

    async fn post_json(app: Router, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(post_request(uri, body))
            .await
            .expect("request should succeed");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        let json = serde_json::from_slice(&bytes).expect("json body");
        (status, json)
    }

    #[tokio::test]
    async fn parse_returns_flattened_result_with_meta() {
        let body = serde_json::json!({ "text": "20 min AMRAP\n10 Push-ups\n15 Air Squats" });
        let (status, json) = post_json(
            app(AppState::for_tests()),
            "/v1/workouts/parse",
            &body.to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["workout"]["workout_type"], "amrap");
        assert_eq!(json["workout"]["time_cap_seconds"], 1200);
        assert_eq!(json["workout"]["movements"].as_array().map(Vec::len), Some(2));
        assert_eq!(json["meta"]["parser_version"], env!("CARGO_PKG_VERSION"));
        assert!(json["meta"]["generated_at"].is_string());
    }

    #[tokio::test]
    async fn parse_reports_text_problems_in_body_not_status() {
        let (status, json) =
            post_json(app(AppState::for_tests()), "/v1/workouts/parse", r#"{"text": ""}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], false);
        assert_eq!(json["confidence"], 0.0);
        assert_eq!(json["errors"][0]["code"], 101);
    }

    #[tokio::test]
    async fn malformed_body_is_structured_400() {
        let (status, json) =
            post_json(app(AppState::for_tests()), "/v1/workouts/parse", r#"{"txt": "x"}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "validation_failed");
        assert_eq!(json["field"], "txt");
    }

    #[tokio::test]
    async fn validate_flags_blocking_issues() {
        let (status, json) =
            post_json(app(AppState::for_tests()), "/v1/workouts/validate", r#"{"text": "ab"}"#)
                .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["valid"], false);
        assert_eq!(json["issues"].as_array().map(Vec::len), Some(1));

        let (_, json) = post_json(
            app(AppState::for_tests()),
            "/v1/workouts/validate",
            r#"{"text": "10 Burpees"}"#,
        )
        .await;
        assert_eq!(json["valid"], true);
        assert_eq!(json["issues"], serde_json::json!([]));
    }

    struct SlowDictionary;

    #[async_trait]
    impl MovementDictionary for SlowDictionary {
        async fn normalize(&self, _name: &str) -> Result<Option<String>, DictionaryError> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(None)
        }

        async fn get_by_canonical_name(
            &self,
            _canonical_name: &str,
        ) -> Result<Option<MovementIdentity>, DictionaryError> {
            Ok(None)
        }

        async fn search(&self, _query: &str) -> Result<Vec<MovementIdentity>, DictionaryError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn slow_parse_times_out_with_504() {
        let parser = WorkoutParser::new(Arc::new(SlowDictionary), ParserConfig::default());
        let state = AppState::new(parser, Duration::from_millis(20));
        let body = serde_json::json!({ "text": "For Time\n10 Push-ups" });

        let (status, json) = post_json(app(state), "/v1/workouts/parse", &body.to_string()).await;

        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(json["error"], "parse_timeout");
        assert_eq!(json["received"]["code"], 502);
    }

    struct CountingDictionary {
        lookups: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl MovementDictionary for CountingDictionary {
        async fn normalize(&self, _name: &str) -> Result<Option<String>, DictionaryError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(None)
        }

        async fn get_by_canonical_name(
            &self,
            _canonical_name: &str,
        ) -> Result<Option<MovementIdentity>, DictionaryError> {
            Ok(None)
        }

        async fn search(&self, _query: &str) -> Result<Vec<MovementIdentity>, DictionaryError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn timed_out_parse_stops_looking_up_movements() {
        let lookups = Arc::new(AtomicUsize::new(0));
        let dictionary = CountingDictionary {
            lookups: Arc::clone(&lookups),
        };
        let parser = WorkoutParser::new(Arc::new(dictionary), ParserConfig::default());
        let state = AppState::new(parser, Duration::from_millis(20));
        let text = (1..=10)
            .map(|n| format!("{n} Push-ups"))
            .collect::<Vec<_>>()
            .join("\n");
        let body = serde_json::json!({ "text": format!("For Time\n{text}") });

        let (status, _) = post_json(app(state), "/v1/workouts/parse", &body.to_string()).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);

        // Ten uncancelled lookups would take 300 ms.
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(lookups.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn parse_and_validate_share_one_rate_limit() {
        let app = router()
            .layer(crate::middleware::rate_limit::parse_layer())
            .with_state(AppState::for_tests());
        let body = r#"{"text": "10 Burpees"}"#;

        for _ in 0..crate::middleware::rate_limit::PARSE_BURST {
            let response = app
                .clone()
                .oneshot(post_request("/v1/workouts/validate", body))
                .await
                .expect("request should succeed");
            assert_eq!(response.status(), StatusCode::OK);
        }
        let response = app
            .oneshot(post_request("/v1/workouts/parse", body))
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
