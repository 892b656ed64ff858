use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::issues::{IssueSummary, ParsingIssue};

/// Workout format. A closed set: new conventions map onto one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutType {
    Amrap,
    ForTime,
    Emom,
    Rounds,
    Intervals,
    Tabata,
}

impl WorkoutType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Amrap => "amrap",
            Self::ForTime => "for_time",
            Self::Emom => "emom",
            Self::Rounds => "rounds",
            Self::Intervals => "intervals",
            Self::Tabata => "tabata",
        }
    }

    /// Display label used in issue messages.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Amrap => "AMRAP",
            Self::ForTime => "For Time",
            Self::Emom => "EMOM",
            Self::Rounds => "Rounds",
            Self::Intervals => "Intervals",
            Self::Tabata => "Tabata",
        }
    }
}

/// Qualitative duration bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TimeDomain {
    Short,
    Medium,
    Long,
}

pub const SHORT_TIME_DOMAIN_MAX_SECONDS: u32 = 10 * 60;
pub const MEDIUM_TIME_DOMAIN_MAX_SECONDS: u32 = 20 * 60;

impl TimeDomain {
    pub fn from_seconds(seconds: u32) -> Self {
        if seconds <= SHORT_TIME_DOMAIN_MAX_SECONDS {
            Self::Short
        } else if seconds <= MEDIUM_TIME_DOMAIN_MAX_SECONDS {
            Self::Medium
        } else {
            Self::Long
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RepSchemeKind {
    Fixed,
    Ascending,
    Descending,
    Custom,
}

/// A sequence of rep counts applied across successive rounds (e.g. 21-15-9).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RepScheme {
    pub reps: Vec<u32>,
    pub kind: RepSchemeKind,
    /// The text the scheme was read from
    pub text: String,
}

impl RepScheme {
    /// Returns `None` for sequences shorter than two terms.
    pub fn new(reps: Vec<u32>, text: impl Into<String>) -> Option<Self> {
        if reps.len() < 2 {
            return None;
        }
        let kind = Self::classify(&reps);
        Some(Self {
            reps,
            kind,
            text: text.into(),
        })
    }

    /// Shape of the sequence. Equal neighbours do not break monotonicity,
    /// so `21-21-15` is descending; a constant sequence is always `Fixed`.
    pub fn classify(reps: &[u32]) -> RepSchemeKind {
        let Some(first) = reps.first() else {
            return RepSchemeKind::Custom;
        };
        if reps.iter().all(|r| r == first) {
            return RepSchemeKind::Fixed;
        }
        if reps.windows(2).all(|w| w[0] >= w[1]) {
            return RepSchemeKind::Descending;
        }
        if reps.windows(2).all(|w| w[0] <= w[1]) {
            return RepSchemeKind::Ascending;
        }
        RepSchemeKind::Custom
    }

    pub fn total_reps(&self) -> u32 {
        self.reps.iter().sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoadUnit {
    Lb,
    Kg,
    Pood,
    Percent,
}

impl LoadUnit {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lb => "lb",
            Self::Kg => "kg",
            Self::Pood => "pood",
            Self::Percent => "%",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "lb" | "lbs" | "#" | "pound" | "pounds" => Some(Self::Lb),
            "kg" | "kgs" | "kilo" | "kilos" => Some(Self::Kg),
            "pood" | "pd" | "poods" => Some(Self::Pood),
            "%" => Some(Self::Percent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct ScaledWeight {
    pub value: f64,
    pub unit: LoadUnit,
}

/// A load. `scaled` holds the female/scaled alternative of an RX pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Weight {
    pub value: f64,
    pub unit: LoadUnit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaled: Option<ScaledWeight>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DistanceUnit {
    #[serde(rename = "m")]
    Meters,
    #[serde(rename = "km")]
    Kilometers,
    #[serde(rename = "mi")]
    Miles,
    #[serde(rename = "ft")]
    Feet,
    #[serde(rename = "yd")]
    Yards,
}

impl DistanceUnit {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Meters => "m",
            Self::Kilometers => "km",
            Self::Miles => "mi",
            Self::Feet => "ft",
            Self::Yards => "yd",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "m" | "meter" | "meters" | "metre" | "metres" => Some(Self::Meters),
            "km" | "kilometer" | "kilometers" | "kilometre" | "kilometres" | "k" => {
                Some(Self::Kilometers)
            }
            "mi" | "mile" | "miles" => Some(Self::Miles),
            "ft" | "foot" | "feet" | "'" => Some(Self::Feet),
            "yd" | "yds" | "yard" | "yards" => Some(Self::Yards),
            _ => None,
        }
    }

    pub const fn meters_per_unit(self) -> f64 {
        match self {
            Self::Meters => 1.0,
            Self::Kilometers => 1000.0,
            Self::Miles => 1609.344,
            Self::Feet => 0.3048,
            Self::Yards => 0.9144,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Distance {
    pub value: f64,
    pub unit: DistanceUnit,
}

impl Distance {
    pub fn meters(&self) -> f64 {
        self.value * self.unit.meters_per_unit()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Calories {
    pub value: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaled: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HeightUnit {
    #[serde(rename = "in")]
    Inches,
    #[serde(rename = "cm")]
    Centimeters,
}

/// Equipment/target height, e.g. a 24/20" box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Height {
    pub value: f64,
    pub unit: HeightUnit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaled: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MovementCategory {
    Weightlifting,
    Gymnastics,
    Monostructural,
    Kettlebell,
    Strongman,
    Other,
}

/// A movement as known to the dictionary collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MovementIdentity {
    pub id: String,
    pub canonical_name: String,
    pub category: MovementCategory,
}

/// One structured movement line.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ParsedMovement {
    /// 1-based position among successfully parsed lines
    pub sequence: usize,
    /// 1-based line number in the submitted text
    pub line_number: usize,
    pub original_text: String,
    /// Candidate name left after quantities were extracted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Resolved identity; absent when the movement was not recognized
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movement: Option<MovementIdentity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<Weight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<Distance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<Calories>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Height>,
    /// Parenthetical modifiers, e.g. "unbroken"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Movement-specific rep scheme when schemes differ per movement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rep_scheme: Option<RepScheme>,
    pub confidence: f64,
}

impl ParsedMovement {
    /// Rep count, distance, calories or duration present.
    pub fn has_quantity(&self) -> bool {
        self.reps.is_some()
            || self.distance.is_some()
            || self.calories.is_some()
            || self.duration_seconds.is_some()
    }

    /// A quantity or a load (weight/height) present.
    pub fn is_quantified(&self) -> bool {
        self.has_quantity() || self.weight.is_some() || self.height.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ParsedWorkout {
    pub workout_type: WorkoutType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_cap_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rounds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rep_scheme: Option<RepScheme>,
    pub movements: Vec<ParsedMovement>,
    pub original_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaned_text: Option<String>,
}

impl ParsedWorkout {
    /// Placeholder returned when parsing never got past input validation.
    pub fn empty(original_text: impl Into<String>) -> Self {
        Self {
            workout_type: WorkoutType::ForTime,
            title: None,
            time_cap_seconds: None,
            rounds: None,
            interval_seconds: None,
            rep_scheme: None,
            movements: Vec::new(),
            original_text: original_text.into(),
            cleaned_text: None,
        }
    }

    pub fn time_domain(&self) -> Option<TimeDomain> {
        if let Some(cap) = self.time_cap_seconds {
            return Some(TimeDomain::from_seconds(cap));
        }
        match (self.rounds, self.interval_seconds) {
            (Some(rounds), Some(interval)) => {
                Some(TimeDomain::from_seconds(rounds.saturating_mul(interval)))
            }
            _ => None,
        }
    }
}

/// Sub-scores behind the overall confidence. Scores are 0–100;
/// `coverage_rate` is a 0.0–1.0 fraction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, ToSchema)]
pub struct ConfidenceBreakdown {
    pub type_confidence: f64,
    pub time_domain_confidence: f64,
    pub movement_confidence: f64,
    pub coverage_rate: f64,
    pub overall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ParseResult {
    /// True when no Error-severity issue was collected
    pub success: bool,
    pub workout: ParsedWorkout,
    pub confidence: f64,
    pub errors: Vec<ParsingIssue>,
    pub warnings: Vec<ParsingIssue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub infos: Vec<ParsingIssue>,
    pub breakdown: ConfidenceBreakdown,
    pub summary: IssueSummary,
}

impl ParseResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// A non-empty, trimmed line with its 1-based position in the submitted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub number: usize,
    pub text: String,
}

/// Output of the text preprocessor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreprocessedText {
    pub normalized: String,
    pub title: Option<String>,
    pub lines: Vec<SourceLine>,
    pub header_lines: Vec<SourceLine>,
    pub movement_lines: Vec<SourceLine>,
    /// Scheme shared by the whole workout
    pub rep_scheme: Option<RepScheme>,
    /// Index into `movement_lines` → scheme, only when schemes differ
    pub movement_rep_schemes: BTreeMap<usize, RepScheme>,
}

impl PreprocessedText {
    pub fn header_text(&self) -> String {
        join_lines(&self.header_lines)
    }

    pub fn full_text(&self) -> String {
        join_lines(&self.lines)
    }
}

fn join_lines(lines: &[SourceLine]) -> String {
    lines
        .iter()
        .map(|line| line.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_follows_sequence_shape() {
        assert_eq!(RepScheme::classify(&[21, 15, 9]), RepSchemeKind::Descending);
        assert_eq!(RepScheme::classify(&[1, 2, 3, 4]), RepSchemeKind::Ascending);
        assert_eq!(RepScheme::classify(&[5, 5, 5]), RepSchemeKind::Fixed);
        assert_eq!(RepScheme::classify(&[10, 20, 10]), RepSchemeKind::Custom);
        assert_eq!(RepScheme::classify(&[21, 21, 15]), RepSchemeKind::Descending);
    }

    #[test]
    fn reclassifying_a_scheme_is_idempotent() {
        let sequences: [&[u32]; 6] = [
            &[21, 15, 9],
            &[50, 40, 30, 20, 10],
            &[1, 2, 3],
            &[10, 10],
            &[3, 9, 3, 9],
            &[100, 1],
        ];
        for reps in sequences {
            let scheme = RepScheme::new(reps.to_vec(), "test").expect("two or more terms");
            let again = RepScheme::new(scheme.reps.clone(), scheme.text.clone())
                .expect("two or more terms");
            assert_eq!(scheme.kind, again.kind);
            assert_eq!(scheme.kind, RepScheme::classify(reps));
        }
    }

    #[test]
    fn rep_scheme_requires_two_terms() {
        assert!(RepScheme::new(vec![21], "21").is_none());
        assert!(RepScheme::new(Vec::new(), "").is_none());
    }

    #[test]
    fn time_domain_uses_cap_then_rounds_times_interval() {
        let mut workout = ParsedWorkout::empty("x");
        assert_eq!(workout.time_domain(), None);

        workout.rounds = Some(10);
        workout.interval_seconds = Some(60);
        assert_eq!(workout.time_domain(), Some(TimeDomain::Short));

        workout.time_cap_seconds = Some(1200);
        assert_eq!(workout.time_domain(), Some(TimeDomain::Medium));

        workout.time_cap_seconds = Some(1201);
        assert_eq!(workout.time_domain(), Some(TimeDomain::Long));
    }

    #[test]
    fn distance_converts_to_meters() {
        let mile = Distance {
            value: 1.0,
            unit: DistanceUnit::Miles,
        };
        assert!((mile.meters() - 1609.344).abs() < 1e-9);
    }
}
