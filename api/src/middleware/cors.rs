use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::CorsLayer;

const DEFAULT_ORIGINS: &str = "http://localhost:3000";

/// Build a CORS layer from the `WOD_CORS_ORIGINS` env var.
///
/// - Origins: comma-separated list (default: `http://localhost:3000`)
/// - Methods: GET, POST, OPTIONS
/// - Headers: Content-Type
/// - Max age: 3600s
pub fn build_cors_layer() -> CorsLayer {
    let raw = std::env::var("WOD_CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_ORIGINS.to_string());

    CorsLayer::new()
        .allow_origin(parse_origins(&raw))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([HeaderName::from_static("content-type")])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Comma-separated origins, deduplicated case-insensitively. Entries that are
/// not valid header values are skipped.
fn parse_origins(raw: &str) -> Vec<HeaderValue> {
    let mut seen: Vec<String> = Vec::new();
    for origin in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !seen.iter().any(|existing| existing.eq_ignore_ascii_case(origin)) {
            seen.push(origin.to_string());
        }
    }
    seen.into_iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect()
}
