use serde::Serialize;
use serde_json::json;
use wodparse_core::{ParsingIssue, ParserConfig};
use wodparse_core::input::InputValidator;

use super::TextInput;
use crate::util::{EXIT_OK, EXIT_PARSE_FAILED, api_request, format_json, print_error, read_text};

#[derive(Serialize)]
struct ValidationReport {
    valid: bool,
    issues: Vec<ParsingIssue>,
}

/// Structural check only: presence, length bounds and digits.
pub async fn run(api_url: &str, input: TextInput, remote: bool, raw: bool) -> i32 {
    let text = match read_text(input.text, input.file.as_deref()) {
        Ok(text) => text,
        Err(message) => return print_error(&message, Some("Pass --text or --file <path|->.")),
    };

    if remote {
        return api_request(
            api_url,
            reqwest::Method::POST,
            "/v1/workouts/validate",
            Some(json!({ "text": text })),
            &[],
            raw,
        )
        .await;
    }

    let report = validate_locally(&text, &ParserConfig::from_env());
    println!("{}", format_json(&report, raw));
    if report.valid { EXIT_OK } else { EXIT_PARSE_FAILED }
}

fn validate_locally(text: &str, config: &ParserConfig) -> ValidationReport {
    let issues = InputValidator::from_config(config).structural_issues(text);
    ValidationReport {
        valid: !issues.iter().any(ParsingIssue::is_blocking),
        issues,
    }
}

#[cfg(test)]
mod tests {
    use wodparse_core::IssueCode;

    use super::*;

    #[test]
    fn short_text_is_invalid() {
        let report = validate_locally("ab", &ParserConfig::default());
        assert!(!report.valid);
        assert_eq!(report.issues[0].kind, IssueCode::InputTooShort);
    }

    #[test]
    fn text_without_digits_is_valid_with_warning() {
        let report = validate_locally("Burpees and Pull-ups", &ParserConfig::default());
        assert!(report.valid);
        assert_eq!(report.issues[0].kind, IssueCode::NoWorkoutStructure);
    }
}
