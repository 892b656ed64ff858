use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use wodparse_core::ParsingIssue;
use wodparse_core::error::{self, ApiError, DictionaryError};

/// Internal error type that converts to structured API responses.
///
/// Problems with the workout text itself are not errors here: they are
/// reported as issues inside a successful parse response.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Validation error (400)
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        received: Option<serde_json::Value>,
        docs_hint: Option<String>,
    },
    /// Parse did not finish within the configured budget (504)
    #[error("parse timed out after {timeout_ms} ms")]
    Timeout {
        timeout_ms: u64,
        issue: Box<ParsingIssue>,
    },
    /// Movement dictionary failure (500)
    #[error(transparent)]
    Dictionary(#[from] DictionaryError),
    /// Parse task failed to complete, e.g. it panicked (500)
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn missing_query(field: &str, hint: &str) -> Self {
        AppError::Validation {
            message: format!("Query parameter '{field}' must not be empty"),
            field: Some(field.to_string()),
            received: None,
            docs_hint: Some(hint.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::now_v7().to_string();

        let (status, api_error) = match self {
            AppError::Validation {
                message,
                field,
                received,
                docs_hint,
            } => (
                StatusCode::BAD_REQUEST,
                ApiError {
                    error: error::codes::VALIDATION_FAILED.to_string(),
                    message,
                    field,
                    received,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::Timeout { timeout_ms, issue } => {
                tracing::warn!(timeout_ms, "workout parse timed out");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    ApiError {
                        error: error::codes::PARSE_TIMEOUT.to_string(),
                        message: issue.message.clone(),
                        field: Some("text".to_string()),
                        received: serde_json::to_value(&*issue).ok(),
                        request_id,
                        docs_hint: issue.suggestion.clone(),
                    },
                )
            }
            AppError::Dictionary(err) => {
                tracing::error!(error = %err, "movement dictionary error");
                (StatusCode::INTERNAL_SERVER_ERROR, internal_api_error(request_id))
            }
            AppError::Internal(message) => {
                tracing::error!(error = %message, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, internal_api_error(request_id))
            }
        };

        (status, Json(api_error)).into_response()
    }
}

fn internal_api_error(request_id: String) -> ApiError {
    ApiError {
        error: error::codes::INTERNAL_ERROR.to_string(),
        message: "An internal error occurred".to_string(),
        field: None,
        received: None,
        request_id,
        docs_hint: None,
    }
}

/// Failures that stop the service from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to load movement catalog: {0}")]
    Catalog(#[from] DictionaryError),
    #[error("failed to bind listener: {0}")]
    Io(#[from] std::io::Error),
}
