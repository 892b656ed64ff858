use serde::Serialize;
use utoipa::ToSchema;

/// Structured error response for HTTP callers.
/// Parse problems are not errors at this level: they travel inside a
/// `ParseResult` as issues. This body is only used when a request could not be
/// processed at all.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    /// Machine-readable error code (e.g. "validation_failed", "parse_timeout")
    pub error: String,
    /// Human-readable description of what went wrong
    pub message: String,
    /// Which field caused the error (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// The value that was received (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<serde_json::Value>,
    /// Request ID for tracing and debugging
    pub request_id: String,
    /// Hint about what the correct usage looks like
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
}

/// Error codes used across the API
pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const NOT_FOUND: &str = "not_found";
    pub const PARSE_TIMEOUT: &str = "parse_timeout";
    pub const INTERNAL_ERROR: &str = "internal_error";
    pub const RATE_LIMITED: &str = "rate_limited";
}

/// Failures of a movement-dictionary collaborator.
///
/// The engine never aborts on these: a failed lookup degrades to "no match"
/// for the affected line.
#[derive(Debug, thiserror::Error)]
pub enum DictionaryError {
    #[error("movement dictionary unavailable: {0}")]
    Unavailable(String),
    #[error("invalid movement catalog: {0}")]
    Catalog(String),
    #[error("failed to read movement catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode movement catalog: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rust-level engine failures. Everything else is reported as a `ParsingIssue`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("parse cancelled")]
    Cancelled,
    #[error(transparent)]
    Dictionary(#[from] DictionaryError),
}
