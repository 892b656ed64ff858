//! Custom extractors that convert axum rejections to structured AppError responses.
//!
//! `AppJson<T>` replaces `axum::Json<T>` in handler signatures so that a
//! malformed body yields a JSON `ApiError` (400) instead of axum's plain-text
//! rejection.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};

use crate::error::AppError;

pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(map_json_rejection(rejection)),
        }
    }
}

pub fn map_json_rejection(rejection: JsonRejection) -> AppError {
    let body_text = rejection.body_text();
    let field_hint = field_from_serde_message(&body_text);

    AppError::Validation {
        message: format!("Invalid request body: {body_text}"),
        field: Some(field_hint.unwrap_or_else(|| "body".to_string())),
        received: None,
        docs_hint: Some(
            "Send a JSON object like {\"text\": \"20 min AMRAP\\n10 Push-ups\"} (schema: GET /api-doc/openapi.json)."
                .to_string(),
        ),
    }
}

/// "missing field `text`" / "unknown field `foo`" → the field name.
fn field_from_serde_message(msg: &str) -> Option<String> {
    ["missing field `", "unknown field `"]
        .iter()
        .find_map(|marker| {
            let start = msg.find(marker)? + marker.len();
            let rest = &msg[start..];
            rest.find('`').map(|end| rest[..end].to_string())
        })
}
