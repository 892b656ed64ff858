use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use utoipa::ToSchema;

pub const DEFAULT_MAX_ERRORS: usize = 20;
const MAX_CONTEXT_CHARS: usize = 80;

/// Issue severity. Declaration order is the sort order: errors first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }

    pub const fn is_blocking(self) -> bool {
        matches!(self, Self::Error)
    }
}

/// Taxonomy of parse issues. The numeric band encodes the category:
/// 1xx input, 2xx workout structure, 3xx movement lines,
/// 4xx data consistency, 5xx system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    EmptyInput,
    InputTooLong,
    InputTooShort,
    BinaryContent,
    InvalidCharacters,

    NoWorkoutStructure,
    MissingDuration,
    MissingInterval,
    MissingRoundCount,
    AmbiguousWorkoutType,

    UnknownMovement,
    AmbiguousMovement,
    UnrecognizedMovementFormat,
    EmptyMovementLine,
    NoMovements,

    UnusualRepCount,
    UnusualLoad,
    UnusualDistance,
    ScaledExceedsRx,
    DuplicateMovement,
    UnusualTimeCap,

    InternalError,
    ProcessingTimeout,
}

impl IssueCode {
    pub const fn code(self) -> u16 {
        match self {
            Self::EmptyInput => 101,
            Self::InputTooLong => 102,
            Self::InputTooShort => 103,
            Self::BinaryContent => 104,
            Self::InvalidCharacters => 105,
            Self::NoWorkoutStructure => 201,
            Self::MissingDuration => 202,
            Self::MissingInterval => 203,
            Self::MissingRoundCount => 204,
            Self::AmbiguousWorkoutType => 205,
            Self::UnknownMovement => 301,
            Self::AmbiguousMovement => 302,
            Self::UnrecognizedMovementFormat => 303,
            Self::EmptyMovementLine => 304,
            Self::NoMovements => 305,
            Self::UnusualRepCount => 401,
            Self::UnusualLoad => 402,
            Self::UnusualDistance => 403,
            Self::ScaledExceedsRx => 404,
            Self::DuplicateMovement => 405,
            Self::UnusualTimeCap => 406,
            Self::InternalError => 501,
            Self::ProcessingTimeout => 502,
        }
    }

    /// Stable string tag exposed to callers.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::InputTooLong => "input_too_long",
            Self::InputTooShort => "input_too_short",
            Self::BinaryContent => "binary_content",
            Self::InvalidCharacters => "invalid_characters",
            Self::NoWorkoutStructure => "no_workout_structure",
            Self::MissingDuration => "missing_duration",
            Self::MissingInterval => "missing_interval",
            Self::MissingRoundCount => "missing_round_count",
            Self::AmbiguousWorkoutType => "ambiguous_workout_type",
            Self::UnknownMovement => "unknown_movement",
            Self::AmbiguousMovement => "ambiguous_movement",
            Self::UnrecognizedMovementFormat => "unrecognized_movement_format",
            Self::EmptyMovementLine => "empty_movement_line",
            Self::NoMovements => "no_movements",
            Self::UnusualRepCount => "unusual_rep_count",
            Self::UnusualLoad => "unusual_load",
            Self::UnusualDistance => "unusual_distance",
            Self::ScaledExceedsRx => "scaled_exceeds_rx",
            Self::DuplicateMovement => "duplicate_movement",
            Self::UnusualTimeCap => "unusual_time_cap",
            Self::InternalError => "internal_error",
            Self::ProcessingTimeout => "processing_timeout",
        }
    }

    pub const fn severity(self) -> Severity {
        match self {
            Self::EmptyInput
            | Self::InputTooLong
            | Self::InputTooShort
            | Self::BinaryContent
            | Self::InvalidCharacters
            | Self::UnrecognizedMovementFormat
            | Self::EmptyMovementLine
            | Self::NoMovements
            | Self::InternalError
            | Self::ProcessingTimeout => Severity::Error,
            Self::ScaledExceedsRx | Self::DuplicateMovement => Severity::Info,
            _ => Severity::Warning,
        }
    }

    /// Message template; `{0}`, `{1}` are positional arguments.
    pub const fn template(self) -> &'static str {
        match self {
            Self::EmptyInput => "Workout text is empty",
            Self::InputTooLong => "Workout text exceeds the maximum length of {0} characters",
            Self::InputTooShort => "Workout text is shorter than the minimum of {0} characters",
            Self::BinaryContent => "Workout text contains binary or control characters",
            Self::InvalidCharacters => "Workout text contains markup or script content",
            Self::NoWorkoutStructure => {
                "No numbers found; reps, loads and times could not be identified"
            }
            Self::MissingDuration => "{0} workout has no time cap",
            Self::MissingInterval => "EMOM workout has no interval duration",
            Self::MissingRoundCount => "Rounds workout has no round count",
            Self::AmbiguousWorkoutType => "Workout type not stated; assumed {0}",
            Self::UnknownMovement => "Movement '{0}' was not recognized and has been used as-is",
            Self::AmbiguousMovement => "Movement '{0}' matched several movements; using '{1}'",
            Self::UnrecognizedMovementFormat => "Line could not be read as a movement: '{0}'",
            Self::EmptyMovementLine => "Movement line is empty",
            Self::NoMovements => "No movements found in workout",
            Self::UnusualRepCount => "{0} reps is unusually high",
            Self::UnusualLoad => "Load of {0} is unusually heavy",
            Self::UnusualDistance => "Distance of {0} is unusually long",
            Self::ScaledExceedsRx => "Scaled value {0} is higher than the RX value {1}",
            Self::DuplicateMovement => "'{0}' appears on more than one line",
            Self::UnusualTimeCap => "Time cap of {0} minutes is unusually long",
            Self::InternalError => "Internal error while parsing: {0}",
            Self::ProcessingTimeout => "Parsing did not finish within {0} ms",
        }
    }

    pub const fn default_suggestion(self) -> Option<&'static str> {
        match self {
            Self::EmptyInput => Some("Enter a workout, e.g. \"20 min AMRAP: 10 Push-ups, 15 Air Squats\""),
            Self::InputTooLong => Some("Split the text into separate workouts"),
            Self::InputTooShort => Some("Add the movements and reps of the workout"),
            Self::BinaryContent => Some("Paste the workout as plain text"),
            Self::InvalidCharacters => Some("Remove HTML or script content from the text"),
            Self::NoWorkoutStructure => Some("Add rep counts, loads or a time, e.g. \"10 Burpees\""),
            Self::MissingDuration => Some("Add a time, e.g. \"20 min AMRAP\""),
            Self::MissingInterval => Some("Add the interval, e.g. \"EMOM 10\" or \"Every 2 min\""),
            Self::MissingRoundCount => Some("Add the number of rounds, e.g. \"5 Rounds\""),
            Self::AmbiguousWorkoutType => Some("State the format, e.g. \"For Time\" or \"AMRAP\""),
            Self::UnknownMovement => Some("Check the spelling or choose a listed movement"),
            Self::AmbiguousMovement => Some("Use the full movement name"),
            Self::UnrecognizedMovementFormat => Some("Write lines as \"<reps> <movement>\", e.g. \"10 Pull-ups\""),
            Self::EmptyMovementLine => None,
            Self::NoMovements => Some("Put each movement on its own line"),
            Self::UnusualRepCount => Some("Check the rep count"),
            Self::UnusualLoad => Some("Check the load and its unit"),
            Self::UnusualDistance => Some("Check the distance and its unit"),
            Self::ScaledExceedsRx => Some("RX values come first, e.g. \"95/65 lb\""),
            Self::DuplicateMovement => None,
            Self::UnusualTimeCap => Some("Check the time cap"),
            Self::InternalError => Some("Try again; report the workout text if it keeps failing"),
            Self::ProcessingTimeout => Some("Try a shorter workout text"),
        }
    }
}

/// Fill `{n}` placeholders. Missing arguments leave the placeholder in place.
pub fn render_template(template: &str, args: &[&str]) -> String {
    let mut out = template.to_string();
    for (index, arg) in args.iter().enumerate() {
        out = out.replace(&format!("{{{index}}}"), arg);
    }
    out
}

/// A user-facing parse issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ParsingIssue {
    /// Stable string tag, e.g. "unknown_movement"
    #[serde(rename = "error_type")]
    pub kind: IssueCode,
    /// Numeric taxonomy code, e.g. 301
    pub code: u16,
    pub severity: Severity,
    pub message: String,
    /// 1-based line number; absent when not line-specific
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<usize>,
    /// The offending text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similar_names: Option<Vec<String>>,
}

impl ParsingIssue {
    pub fn new(kind: IssueCode, args: &[&str]) -> Self {
        Self {
            kind,
            code: kind.code(),
            severity: kind.severity(),
            message: render_template(kind.template(), args),
            line_number: None,
            context: None,
            suggestion: kind.default_suggestion().map(str::to_string),
            similar_names: None,
        }
    }

    /// Line 0 means "not line-specific".
    pub fn at_line(mut self, line_number: usize) -> Self {
        self.line_number = (line_number > 0).then_some(line_number);
        self
    }

    pub fn with_context(mut self, context: &str) -> Self {
        let trimmed = context.trim();
        if !trimmed.is_empty() {
            self.context = Some(trimmed.chars().take(MAX_CONTEXT_CHARS).collect());
        }
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_similar_names(mut self, names: Vec<String>) -> Self {
        if !names.is_empty() {
            self.similar_names = Some(names);
        }
        self
    }

    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Duplicate,
    LimitReached,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DedupKey {
    Line(IssueCode, usize),
    Context(IssueCode, String),
}

impl DedupKey {
    fn for_issue(issue: &ParsingIssue) -> Self {
        match issue.line_number {
            Some(line) => Self::Line(issue.kind, line),
            None => Self::Context(issue.kind, issue.context.clone().unwrap_or_default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, ToSchema)]
pub struct IssueSummary {
    pub total: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    /// Count per numeric code
    pub by_code: BTreeMap<u16, usize>,
    pub error_limit_reached: bool,
}

/// Per-parse issue collector with deduplication and an error ceiling.
///
/// One instance per parse call; never shared.
#[derive(Debug, Clone)]
pub struct IssueCollector {
    issues: Vec<ParsingIssue>,
    seen: HashSet<DedupKey>,
    max_errors: usize,
    error_count: usize,
    limit_reached: bool,
}

impl Default for IssueCollector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ERRORS)
    }
}

impl IssueCollector {
    pub fn new(max_errors: usize) -> Self {
        Self {
            issues: Vec::new(),
            seen: HashSet::new(),
            max_errors,
            error_count: 0,
            limit_reached: false,
        }
    }

    pub fn add(&mut self, issue: ParsingIssue) -> AddOutcome {
        let key = DedupKey::for_issue(&issue);
        if self.seen.contains(&key) {
            return AddOutcome::Duplicate;
        }
        if issue.is_blocking() {
            if self.error_count >= self.max_errors {
                self.limit_reached = true;
                return AddOutcome::LimitReached;
            }
            self.error_count += 1;
        }
        self.seen.insert(key);
        self.issues.push(issue);
        AddOutcome::Added
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = ParsingIssue>) {
        for issue in issues {
            self.add(issue);
        }
    }

    /// All issues, errors first; insertion order is kept within a severity.
    pub fn sorted(&self) -> Vec<ParsingIssue> {
        let mut out = self.issues.clone();
        out.sort_by_key(|issue| issue.severity);
        out
    }

    pub fn with_severity(&self, severity: Severity) -> Vec<ParsingIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == severity)
            .cloned()
            .collect()
    }

    pub fn errors(&self) -> Vec<ParsingIssue> {
        self.with_severity(Severity::Error)
    }

    pub fn warnings(&self) -> Vec<ParsingIssue> {
        self.with_severity(Severity::Warning)
    }

    pub fn infos(&self) -> Vec<ParsingIssue> {
        self.with_severity(Severity::Info)
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Warning)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_limit_reached(&self) -> bool {
        self.limit_reached
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn summary(&self) -> IssueSummary {
        let mut summary = IssueSummary {
            total: self.issues.len(),
            error_limit_reached: self.limit_reached,
            ..IssueSummary::default()
        };
        for issue in &self.issues {
            match issue.severity {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
                Severity::Info => summary.infos += 1,
            }
            *summary.by_code.entry(issue.code).or_insert(0) += 1;
        }
        summary
    }

    pub fn clear(&mut self) {
        self.issues.clear();
        self.seen.clear();
        self.error_count = 0;
        self.limit_reached = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_error(line: usize) -> ParsingIssue {
        ParsingIssue::new(IssueCode::UnrecognizedMovementFormat, &["???"]).at_line(line)
    }

    #[test]
    fn codes_sit_in_their_bands() {
        let input = [
            IssueCode::EmptyInput,
            IssueCode::InputTooLong,
            IssueCode::InputTooShort,
            IssueCode::BinaryContent,
            IssueCode::InvalidCharacters,
        ];
        for code in input {
            assert_eq!(code.code() / 100, 1);
            assert_eq!(code.severity(), Severity::Error);
        }
        let structural = [
            IssueCode::NoWorkoutStructure,
            IssueCode::MissingDuration,
            IssueCode::MissingInterval,
            IssueCode::MissingRoundCount,
            IssueCode::AmbiguousWorkoutType,
        ];
        for code in structural {
            assert_eq!(code.code() / 100, 2);
            assert_eq!(code.severity(), Severity::Warning);
        }
        assert_eq!(IssueCode::UnknownMovement.severity(), Severity::Warning);
        assert_eq!(IssueCode::AmbiguousMovement.severity(), Severity::Warning);
        assert_eq!(IssueCode::UnrecognizedMovementFormat.severity(), Severity::Error);
        assert_eq!(IssueCode::ProcessingTimeout.code(), 502);
    }

    #[test]
    fn template_renders_positional_arguments() {
        let issue = ParsingIssue::new(IssueCode::InputTooLong, &["10000"]);
        assert_eq!(
            issue.message,
            "Workout text exceeds the maximum length of 10000 characters"
        );
        assert_eq!(issue.code, 102);
        assert!(issue.suggestion.is_some());
    }

    #[test]
    fn issue_serializes_tag_and_code() {
        let issue = ParsingIssue::new(IssueCode::UnknownMovement, &["Burpies"])
            .at_line(2)
            .with_context("10 Burpies")
            .with_similar_names(vec!["Burpees".to_string()]);
        let value = serde_json::to_value(&issue).expect("issue serializes");
        assert_eq!(value["error_type"], "unknown_movement");
        assert_eq!(value["code"], 301);
        assert_eq!(value["severity"], "warning");
        assert_eq!(value["line_number"], 2);
        assert_eq!(value["similar_names"][0], "Burpees");
    }

    #[test]
    fn same_code_and_line_is_rejected_as_duplicate() {
        let mut collector = IssueCollector::default();
        assert_eq!(collector.add(line_error(3)), AddOutcome::Added);
        assert_eq!(collector.add(line_error(3)), AddOutcome::Duplicate);
        assert_eq!(collector.add(line_error(4)), AddOutcome::Added);
        assert_eq!(collector.len(), 2);
    }

    #[test]
    fn issues_without_line_dedupe_on_context() {
        let mut collector = IssueCollector::default();
        let a = ParsingIssue::new(IssueCode::MissingDuration, &["AMRAP"]).with_context("AMRAP");
        let b = ParsingIssue::new(IssueCode::MissingDuration, &["AMRAP"]).with_context("AMRAP");
        let c = ParsingIssue::new(IssueCode::MissingDuration, &["AMRAP"]).with_context("amrap!");
        assert_eq!(collector.add(a), AddOutcome::Added);
        assert_eq!(collector.add(b), AddOutcome::Duplicate);
        assert_eq!(collector.add(c), AddOutcome::Added);
    }

    #[test]
    fn error_ceiling_rejects_errors_but_keeps_warnings() {
        let mut collector = IssueCollector::new(2);
        assert_eq!(collector.add(line_error(1)), AddOutcome::Added);
        assert_eq!(collector.add(line_error(2)), AddOutcome::Added);
        assert_eq!(collector.add(line_error(3)), AddOutcome::LimitReached);
        assert!(collector.error_limit_reached());
        assert_eq!(collector.error_count(), 2);

        let warning = ParsingIssue::new(IssueCode::UnknownMovement, &["x"]).at_line(9);
        assert_eq!(collector.add(warning), AddOutcome::Added);
        assert_eq!(collector.warnings().len(), 1);
    }

    #[test]
    fn error_count_never_exceeds_ceiling() {
        for max in [0usize, 1, 5, 20] {
            let mut collector = IssueCollector::new(max);
            for line in 1..=50 {
                collector.add(line_error(line));
            }
            assert_eq!(collector.errors().len(), max);
            assert!(collector.error_limit_reached());
        }
    }

    #[test]
    fn sorted_orders_by_severity_then_insertion() {
        let mut collector = IssueCollector::default();
        collector.add(ParsingIssue::new(IssueCode::DuplicateMovement, &["Row"]).at_line(1));
        collector.add(ParsingIssue::new(IssueCode::UnknownMovement, &["a"]).at_line(2));
        collector.add(line_error(3));
        collector.add(ParsingIssue::new(IssueCode::UnknownMovement, &["b"]).at_line(4));
        collector.add(line_error(5));

        let sorted = collector.sorted();
        let order: Vec<(Severity, Option<usize>)> = sorted
            .iter()
            .map(|issue| (issue.severity, issue.line_number))
            .collect();
        assert_eq!(
            order,
            vec![
                (Severity::Error, Some(3)),
                (Severity::Error, Some(5)),
                (Severity::Warning, Some(2)),
                (Severity::Warning, Some(4)),
                (Severity::Info, Some(1)),
            ]
        );
    }

    #[test]
    fn summary_counts_severities_and_codes() {
        let mut collector = IssueCollector::new(1);
        collector.add(line_error(1));
        collector.add(line_error(2));
        collector.add(ParsingIssue::new(IssueCode::UnknownMovement, &["a"]).at_line(3));

        let summary = collector.summary();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.warnings, 1);
        assert_eq!(summary.by_code.get(&303), Some(&1));
        assert_eq!(summary.by_code.get(&301), Some(&1));
        assert!(summary.error_limit_reached);
    }

    #[test]
    fn clear_resets_dedup_memory() {
        let mut collector = IssueCollector::new(1);
        collector.add(line_error(1));
        collector.add(line_error(2));
        collector.clear();

        assert!(collector.is_empty());
        assert!(!collector.error_limit_reached());
        assert_eq!(collector.add(line_error(1)), AddOutcome::Added);
    }
}
