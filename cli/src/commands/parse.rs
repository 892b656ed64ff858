use std::path::Path;

use serde_json::json;

use super::TextInput;
use crate::util::{
    EXIT_OK, EXIT_PARSE_FAILED, api_request, format_json, local_parser, print_error, read_text,
};

/// Parse locally unless `remote`, printing the full result as JSON.
///
/// Local exit codes: 0 when the parse succeeded, 1 when it reported errors.
pub async fn run(
    api_url: &str,
    catalog: Option<&Path>,
    input: TextInput,
    remote: bool,
    raw: bool,
) -> i32 {
    let text = match read_text(input.text, input.file.as_deref()) {
        Ok(text) => text,
        Err(message) => return print_error(&message, Some("Pass --text or --file <path|->.")),
    };

    if remote {
        return api_request(
            api_url,
            reqwest::Method::POST,
            "/v1/workouts/parse",
            Some(json!({ "text": text })),
            &[],
            raw,
        )
        .await;
    }

    let parser = match local_parser(catalog) {
        Ok(parser) => parser,
        Err(message) => return print_error(&message, Some("Check --catalog or WOD_MOVEMENT_CATALOG.")),
    };
    let result = parser.parse(&text).await;
    tracing::debug!(
        success = result.success,
        confidence = result.confidence,
        "local parse finished"
    );

    let formatted = format_json(&result, raw);
    if result.success {
        println!("{formatted}");
        EXIT_OK
    } else {
        eprintln!("{formatted}");
        EXIT_PARSE_FAILED
    }
}
