use std::io::Read;
use std::path::Path;

use serde::Serialize;
use serde_json::json;
use wodparse_core::{InMemoryMovementDictionary, ParserConfig, WorkoutParser};

pub const EXIT_OK: i32 = 0;
pub const EXIT_PARSE_FAILED: i32 = 1;
pub const EXIT_SERVER_ERROR: i32 = 2;
pub const EXIT_CONNECTION_ERROR: i32 = 3;
pub const EXIT_USAGE_ERROR: i32 = 4;

pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}

pub fn format_json<T: Serialize>(value: &T, raw: bool) -> String {
    let formatted = if raw {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    formatted.unwrap_or_else(|e| format!("{{\"error\":\"cli_error\",\"message\":\"{e}\"}}"))
}

/// Print a structured CLI error on stderr and return the usage exit code.
pub fn print_error(message: &str, docs_hint: Option<&str>) -> i32 {
    let mut err = json!({
        "error": "cli_error",
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    eprintln!("{}", format_json(&err, false));
    EXIT_USAGE_ERROR
}

/// Exit codes: 0=success (2xx), 1=client error (4xx), 2=server error (5xx)
pub fn exit_code_for_status(status: u16) -> i32 {
    match status {
        200..=299 => EXIT_OK,
        400..=499 => EXIT_PARSE_FAILED,
        _ => EXIT_SERVER_ERROR,
    }
}

/// Execute an API request, print the response, and map it to an exit code.
///
/// Exit codes: 0=success (2xx), 1=client error (4xx), 2=server error (5xx),
///             3=connection error, 4=usage error
pub async fn api_request(
    api_url: &str,
    method: reqwest::Method,
    path: &str,
    body: Option<serde_json::Value>,
    query: &[(&str, String)],
    raw: bool,
) -> i32 {
    let url = match reqwest::Url::parse(&format!("{api_url}{path}")) {
        Ok(mut u) => {
            if !query.is_empty() {
                let mut q = u.query_pairs_mut();
                for (k, v) in query {
                    q.append_pair(k, v);
                }
            }
            u
        }
        Err(e) => {
            return print_error(
                &format!("Invalid URL: {api_url}{path}: {e}"),
                Some("Check --api-url or WOD_API_URL."),
            );
        }
    };

    tracing::debug!(%url, "sending API request");
    let mut req = client().request(method, url);
    if let Some(b) = body {
        req = req.json(&b);
    }

    let resp = match req.send().await {
        Ok(r) => r,
        Err(e) => {
            let err = json!({
                "error": "connection_error",
                "message": format!("{e}"),
                "docs_hint": "Is the API server running? Check WOD_API_URL."
            });
            eprintln!("{}", format_json(&err, false));
            return EXIT_CONNECTION_ERROR;
        }
    };

    let status = resp.status().as_u16();
    let exit_code = exit_code_for_status(status);

    let resp_body: serde_json::Value = match resp.json().await {
        Ok(v) => v,
        Err(e) => json!({"raw_error": format!("Failed to parse response as JSON: {e}")}),
    };

    let formatted = format_json(&resp_body, raw);
    if exit_code == EXIT_OK {
        println!("{formatted}");
    } else {
        eprintln!("{formatted}");
    }
    exit_code
}

/// Workout text from `--text`, or from `--file` where "-" means stdin.
pub fn read_text(text: Option<String>, file: Option<&str>) -> Result<String, String> {
    match (text, file) {
        (Some(_), Some(_)) => Err("Pass either --text or --file, not both".to_string()),
        (Some(text), None) => Ok(text),
        (None, Some("-")) => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("Failed to read stdin: {e}"))?;
            Ok(buf)
        }
        (None, Some(path)) => std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read file '{path}': {e}")),
        (None, None) => Err("Workout text is required".to_string()),
    }
}

/// Local engine over the catalog at `catalog`, or the built-in one.
pub fn local_parser(catalog: Option<&Path>) -> Result<WorkoutParser, String> {
    let dictionary = InMemoryMovementDictionary::load(catalog)
        .map_err(|e| format!("Failed to load movement catalog: {e}"))?;
    tracing::debug!(movements = dictionary.len(), "movement catalog loaded");
    Ok(WorkoutParser::new(
        std::sync::Arc::new(dictionary),
        ParserConfig::from_env(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_exit_codes() {
        assert_eq!(exit_code_for_status(200), EXIT_OK);
        assert_eq!(exit_code_for_status(404), EXIT_PARSE_FAILED);
        assert_eq!(exit_code_for_status(429), EXIT_PARSE_FAILED);
        assert_eq!(exit_code_for_status(504), EXIT_SERVER_ERROR);
    }

    #[test]
    fn raw_output_is_single_line() {
        let value = json!({"a": 1, "b": [1, 2]});
        assert!(!format_json(&value, true).contains('\n'));
        assert!(format_json(&value, false).contains('\n'));
    }

    #[test]
    fn text_flag_wins_when_alone() {
        let text = read_text(Some("10 Burpees".to_string()), None).expect("text");
        assert_eq!(text, "10 Burpees");
    }

    #[test]
    fn text_and_file_conflict() {
        let err = read_text(Some("x".to_string()), Some("w.txt")).expect_err("conflict");
        assert!(err.contains("not both"));
        assert!(read_text(None, None).is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = read_text(None, Some("/nonexistent/wod.txt")).expect_err("missing");
        assert!(err.contains("/nonexistent/wod.txt"));
    }

    #[test]
    fn builtin_catalog_loads() {
        assert!(local_parser(None).is_ok());
        assert!(local_parser(Some(Path::new("/nonexistent/catalog.json"))).is_err());
    }
}
