use crate::config::ParserConfig;
use crate::issues::{IssueCode, ParsingIssue};
use crate::patterns::contains_injection_marker;

/// Text that passed the gate, plus non-blocking warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedInput {
    pub text: String,
    pub warnings: Vec<ParsingIssue>,
}

#[derive(Debug, Clone, Copy)]
pub struct InputValidator {
    max_chars: usize,
    min_chars: usize,
}

impl InputValidator {
    pub fn new(max_chars: usize, min_chars: usize) -> Self {
        Self {
            max_chars,
            min_chars,
        }
    }

    pub fn from_config(config: &ParserConfig) -> Self {
        Self::new(config.max_input_chars, config.min_input_chars)
    }

    /// Checks run in order and stop at the first failure.
    pub fn validate(&self, raw: &str) -> Result<SanitizedInput, ParsingIssue> {
        if let Some(issue) = self.length_issue(raw) {
            return Err(issue);
        }
        if raw.chars().any(is_binary_char) {
            return Err(ParsingIssue::new(IssueCode::BinaryContent, &[]));
        }
        if contains_injection_marker(raw) {
            return Err(ParsingIssue::new(IssueCode::InvalidCharacters, &[]));
        }

        let mut warnings = Vec::new();
        if !has_digit(raw) {
            warnings.push(ParsingIssue::new(IssueCode::NoWorkoutStructure, &[]));
        }
        Ok(SanitizedInput {
            text: sanitize(raw),
            warnings,
        })
    }

    /// Presence, length bounds and digits only. At most one blocking issue.
    pub fn structural_issues(&self, raw: &str) -> Vec<ParsingIssue> {
        if let Some(issue) = self.length_issue(raw) {
            return vec![issue];
        }
        if has_digit(raw) {
            Vec::new()
        } else {
            vec![ParsingIssue::new(IssueCode::NoWorkoutStructure, &[])]
        }
    }

    fn length_issue(&self, raw: &str) -> Option<ParsingIssue> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Some(ParsingIssue::new(IssueCode::EmptyInput, &[]));
        }
        if raw.chars().count() > self.max_chars {
            let limit = self.max_chars.to_string();
            return Some(ParsingIssue::new(IssueCode::InputTooLong, &[&limit]));
        }
        if trimmed.chars().count() < self.min_chars {
            let limit = self.min_chars.to_string();
            return Some(
                ParsingIssue::new(IssueCode::InputTooShort, &[&limit]).with_context(trimmed),
            );
        }
        None
    }
}

fn has_digit(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}

fn is_binary_char(c: char) -> bool {
    c.is_control() && !matches!(c, '\t' | '\n' | '\r' | '\u{0B}' | '\u{0C}')
}

/// Collapse horizontal whitespace within each line. Interior blank lines are
/// kept so line numbers still match the text the user wrote; trailing ones go.
pub fn sanitize(raw: &str) -> String {
    let mut lines: Vec<String> = raw
        .replace("\r\n", "\n")
        .replace(['\r', '\u{0B}', '\u{0C}'], "\n")
        .lines()
        .map(|line| {
            line.chars()
                .filter(|c| !c.is_control() || *c == '\t')
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}
