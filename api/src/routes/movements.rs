use axum::extract::{Query, State};
use axum::{Json, Router, routing::get};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use wodparse_core::model::MovementIdentity;
use wodparse_core::similar::SimilarNameFinder;

use crate::error::AppError;
use crate::state::AppState;

const MAX_SUGGEST_LIMIT: usize = 10;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/movements/search", get(search_movements))
        .route("/v1/movements/suggest", get(suggest_movements))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MovementSearchParams {
    /// Movement name or fragment, e.g. "pull up"
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MovementSuggestParams {
    /// Possibly misspelled movement name
    #[serde(default)]
    pub q: String,
    /// Maximum suggestions (1-10, default from parser config)
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MovementSearchResponse {
    pub query: String,
    pub movements: Vec<MovementIdentity>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MovementSuggestResponse {
    pub query: String,
    pub suggestions: Vec<String>,
}

/// Ranked dictionary search, best match first.
#[utoipa::path(
    get,
    path = "/v1/movements/search",
    params(MovementSearchParams),
    responses(
        (status = 200, description = "Matching movements", body = MovementSearchResponse),
        (status = 400, description = "Missing query", body = wodparse_core::error::ApiError)
    ),
    tag = "movements"
)]
pub async fn search_movements(
    State(state): State<AppState>,
    Query(params): Query<MovementSearchParams>,
) -> Result<Json<MovementSearchResponse>, AppError> {
    let query = params.q.trim().to_string();
    if query.is_empty() {
        return Err(AppError::missing_query("q", "Pass ?q=<movement name>"));
    }
    let movements = state.parser.dictionary().search(&query).await?;
    Ok(Json(MovementSearchResponse { query, movements }))
}

/// "Did you mean" names for an unknown movement, closest first.
#[utoipa::path(
    get,
    path = "/v1/movements/suggest",
    params(MovementSuggestParams),
    responses(
        (status = 200, description = "Similar movement names", body = MovementSuggestResponse),
        (status = 400, description = "Missing query", body = wodparse_core::error::ApiError)
    ),
    tag = "movements"
)]
pub async fn suggest_movements(
    State(state): State<AppState>,
    Query(params): Query<MovementSuggestParams>,
) -> Result<Json<MovementSuggestResponse>, AppError> {
    let query = params.q.trim().to_string();
    if query.is_empty() {
        return Err(AppError::missing_query("q", "Pass ?q=<movement name>"));
    }
    let limit = params
        .limit
        .unwrap_or(state.parser.config().max_suggestions)
        .clamp(1, MAX_SUGGEST_LIMIT);

    let names = state.parser.dictionary().known_names().await?;
    let suggestions =
        SimilarNameFinder::new(limit).find(&query, names.iter().map(String::as_str));
    Ok(Json(MovementSuggestResponse { query, suggestions }))
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let app = router().with_state(AppState::for_tests());
        let response = app
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn search_ranks_exact_match_first() {
        let (status, json) = get_json("/v1/movements/search?q=thrusters").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["query"], "thrusters");
        assert_eq!(json["movements"][0]["id"], "thruster");
    }

    #[tokio::test]
    async fn search_requires_query() {
        let (status, json) = get_json("/v1/movements/search?q=%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["field"], "q");
    }

    #[tokio::test]
    async fn suggest_finds_close_spelling() {
        let (status, json) = get_json("/v1/movements/suggest?q=Burpies&limit=2").await;
        assert_eq!(status, StatusCode::OK);
        let suggestions = json["suggestions"].as_array().expect("suggestions");
        assert!(suggestions.len() <= 2);
        assert_eq!(suggestions[0], "Burpees");
    }
}
