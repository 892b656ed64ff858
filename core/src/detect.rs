use tracing::debug;

use crate::confidence::ScoringPolicy;
use crate::issues::{IssueCode, ParsingIssue};
use crate::model::{PreprocessedText, RepScheme, WorkoutType};
use crate::patterns::{
    duration_line_seconds, extract_rep_scheme, extract_time_cap, match_workout_type,
};
use crate::round_to_two;

/// Workout type plus the time/round/interval metadata read from the header.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDetection {
    pub workout_type: WorkoutType,
    pub time_cap_seconds: Option<u32>,
    pub rounds: Option<u32>,
    pub interval_seconds: Option<u32>,
    pub rep_scheme: Option<RepScheme>,
    /// 0–100
    pub confidence: f64,
    pub issue: Option<ParsingIssue>,
    pub warning: Option<ParsingIssue>,
}

impl TypeDetection {
    fn fallback(confidence: f64) -> Self {
        Self {
            workout_type: WorkoutType::ForTime,
            time_cap_seconds: None,
            rounds: None,
            interval_seconds: None,
            rep_scheme: None,
            confidence,
            issue: None,
            warning: None,
        }
    }
}

pub fn detect_workout_type(pre: &PreprocessedText, policy: &ScoringPolicy) -> TypeDetection {
    if pre.lines.is_empty() {
        let mut detection = TypeDetection::fallback(0.0);
        detection.issue = Some(ParsingIssue::new(IssueCode::EmptyInput, &[]));
        return detection;
    }

    let text = if pre.header_lines.is_empty() {
        pre.full_text()
    } else {
        pre.header_text()
    };
    let rep_scheme = extract_rep_scheme(&text);
    let explicit_cap = extract_time_cap(&text);

    let mut detection = match match_workout_type(&text) {
        Some(found) => {
            let mut detection = TypeDetection::fallback(found.confidence * 100.0);
            detection.workout_type = found.workout_type;
            detection.rounds = found.rounds;
            detection.interval_seconds = found.interval_seconds;
            detection.time_cap_seconds = explicit_cap.or(found.time_cap_seconds);
            detection
        }
        None => {
            let has_scheme = rep_scheme.is_some()
                || pre.rep_scheme.is_some()
                || !pre.movement_rep_schemes.is_empty();
            let confidence = if has_scheme {
                policy.inferred_with_rep_scheme_confidence
            } else {
                policy.inferred_confidence
            };
            let mut detection = TypeDetection::fallback(confidence);
            detection.time_cap_seconds = explicit_cap;
            detection.warning = Some(ParsingIssue::new(
                IssueCode::AmbiguousWorkoutType,
                &[WorkoutType::ForTime.label()],
            ));
            detection
        }
    };
    detection.rep_scheme = rep_scheme;

    if detection.time_cap_seconds.is_none()
        && matches!(
            detection.workout_type,
            WorkoutType::Amrap | WorkoutType::Emom | WorkoutType::Intervals
        )
    {
        // A bare "20 minutes" header line sets the duration.
        detection.time_cap_seconds = pre
            .header_lines
            .iter()
            .find_map(|line| duration_line_seconds(&line.text));
        if detection.rounds.is_none() {
            if let (Some(cap), Some(interval)) =
                (detection.time_cap_seconds, detection.interval_seconds)
            {
                detection.rounds = Some(cap / interval).filter(|r| *r > 0);
            }
        }
    }

    match detection.workout_type {
        WorkoutType::ForTime if detection.time_cap_seconds.is_some() => {
            detection.confidence = detection.confidence.max(policy.for_time_with_cap_floor);
        }
        WorkoutType::Amrap if detection.time_cap_seconds.is_none() => {
            detection.confidence = detection.confidence.min(policy.amrap_without_cap_ceiling);
            detection.warning = Some(ParsingIssue::new(
                IssueCode::MissingDuration,
                &[WorkoutType::Amrap.label()],
            ));
        }
        _ => {}
    }
    detection.confidence = round_to_two(detection.confidence);

    debug!(
        workout_type = detection.workout_type.as_str(),
        confidence = detection.confidence,
        time_cap_seconds = ?detection.time_cap_seconds,
        rounds = ?detection.rounds,
        interval_seconds = ?detection.interval_seconds,
        "detected workout type"
    );
    detection
}
