//! Final assembly: issue folding, workout-level checks, data-consistency
//! checks and the confidence breakdown.

use std::collections::HashMap;

use tracing::debug;

use crate::confidence::{ScoreInputs, ScoringPolicy, compute_breakdown};
use crate::detect::TypeDetection;
use crate::issues::{IssueCode, IssueCollector, ParsingIssue};
use crate::model::{
    ConfidenceBreakdown, LoadUnit, ParseResult, ParsedMovement, ParsedWorkout, WorkoutType,
};
use crate::movement::MovementParse;

const MAX_PLAUSIBLE_REPS: u32 = 500;
const MAX_PLAUSIBLE_DISTANCE_METERS: f64 = 50_000.0;
const MAX_PLAUSIBLE_TIME_CAP_SECONDS: u32 = 3 * 60 * 60;

const fn max_plausible_load(unit: LoadUnit) -> f64 {
    match unit {
        LoadUnit::Lb => 700.0,
        LoadUnit::Kg => 320.0,
        LoadUnit::Pood => 12.0,
        LoadUnit::Percent => 150.0,
    }
}

/// Fold stage outputs into a `ParseResult`. `collector` may already hold
/// input-stage warnings.
pub fn build_result(
    policy: &ScoringPolicy,
    mut collector: IssueCollector,
    workout: ParsedWorkout,
    detection: &TypeDetection,
    parses: &[MovementParse],
) -> ParseResult {
    collector.extend(detection.issue.iter().cloned());
    collector.extend(detection.warning.iter().cloned());
    for parse in parses {
        collector.extend(parse.issue.iter().cloned());
        collector.extend(parse.warning.iter().cloned());
    }

    if workout.movements.is_empty() {
        collector.add(ParsingIssue::new(IssueCode::NoMovements, &[]));
    }
    check_structure(&workout, &mut collector);
    check_consistency(&workout, &mut collector);

    let line_confidences: Vec<f64> = parses
        .iter()
        .filter(|parse| parse.success)
        .map(|parse| parse.confidence)
        .collect();
    let breakdown = compute_breakdown(
        policy,
        ScoreInputs {
            type_confidence: detection.confidence,
            workout: &workout,
            line_confidences: &line_confidences,
            resolved_lines: parses.iter().filter(|parse| parse.is_resolved()).count(),
            total_lines: parses.len(),
            error_count: collector.error_count(),
            warning_count: collector.warning_count(),
        },
    );

    debug!(
        overall = breakdown.overall,
        errors = collector.error_count(),
        warnings = collector.warning_count(),
        movements = workout.movements.len(),
        "assembled parse result"
    );
    finish(workout, breakdown, &collector)
}

/// Result for input that never reached the pipeline, or a pipeline that
/// could not finish. Confidence and breakdown are zero.
pub fn failed_result(
    original_text: &str,
    issues: impl IntoIterator<Item = ParsingIssue>,
    max_errors: usize,
) -> ParseResult {
    let mut collector = IssueCollector::new(max_errors);
    collector.extend(issues);
    finish(
        ParsedWorkout::empty(original_text),
        ConfidenceBreakdown::default(),
        &collector,
    )
}

fn finish(
    workout: ParsedWorkout,
    breakdown: ConfidenceBreakdown,
    collector: &IssueCollector,
) -> ParseResult {
    ParseResult {
        success: !collector.has_errors(),
        workout,
        confidence: breakdown.overall,
        errors: collector.errors(),
        warnings: collector.warnings(),
        infos: collector.infos(),
        breakdown,
        summary: collector.summary(),
    }
}

fn check_structure(workout: &ParsedWorkout, collector: &mut IssueCollector) {
    match workout.workout_type {
        WorkoutType::Amrap if workout.time_cap_seconds.is_none() => {
            collector.add(ParsingIssue::new(
                IssueCode::MissingDuration,
                &[WorkoutType::Amrap.label()],
            ));
        }
        WorkoutType::Emom if workout.interval_seconds.is_none() => {
            collector.add(ParsingIssue::new(IssueCode::MissingInterval, &[]));
        }
        WorkoutType::Rounds if workout.rounds.is_none() => {
            collector.add(ParsingIssue::new(IssueCode::MissingRoundCount, &[]));
        }
        _ => {}
    }
}

fn check_consistency(workout: &ParsedWorkout, collector: &mut IssueCollector) {
    if let Some(cap) = workout.time_cap_seconds {
        if cap > MAX_PLAUSIBLE_TIME_CAP_SECONDS {
            let minutes = (cap / 60).to_string();
            collector.add(ParsingIssue::new(IssueCode::UnusualTimeCap, &[&minutes]));
        }
    }

    let mut first_line_by_id: HashMap<&str, usize> = HashMap::new();
    for movement in &workout.movements {
        check_movement(movement, collector);

        let Some(identity) = movement.movement.as_ref() else {
            continue;
        };
        match first_line_by_id.get(identity.id.as_str()) {
            Some(first) if *first != movement.line_number => {
                collector.add(
                    ParsingIssue::new(IssueCode::DuplicateMovement, &[&identity.canonical_name])
                        .at_line(movement.line_number)
                        .with_context(&movement.original_text),
                );
            }
            Some(_) => {}
            None => {
                first_line_by_id.insert(identity.id.as_str(), movement.line_number);
            }
        }
    }
}

fn check_movement(movement: &ParsedMovement, collector: &mut IssueCollector) {
    let line = movement.line_number;
    let context = movement.original_text.as_str();

    if let Some(reps) = movement.reps {
        if reps > MAX_PLAUSIBLE_REPS {
            collector.add(
                ParsingIssue::new(IssueCode::UnusualRepCount, &[&reps.to_string()])
                    .at_line(line)
                    .with_context(context),
            );
        }
    }

    if let Some(weight) = movement.weight {
        if weight.value > max_plausible_load(weight.unit) {
            let load = format_amount(weight.value, weight.unit.as_str());
            collector.add(
                ParsingIssue::new(IssueCode::UnusualLoad, &[&load])
                    .at_line(line)
                    .with_context(context),
            );
        }
        if let Some(scaled) = weight.scaled {
            if scaled.unit == weight.unit && scaled.value > weight.value {
                let scaled_text = format_amount(scaled.value, scaled.unit.as_str());
                let rx_text = format_amount(weight.value, weight.unit.as_str());
                collector.add(
                    ParsingIssue::new(IssueCode::ScaledExceedsRx, &[&scaled_text, &rx_text])
                        .at_line(line)
                        .with_context(context),
                );
            }
        }
    }

    if let Some(calories) = movement.calories {
        if let Some(scaled) = calories.scaled {
            if scaled > calories.value {
                collector.add(
                    ParsingIssue::new(
                        IssueCode::ScaledExceedsRx,
                        &[
                            &format!("{scaled} cal"),
                            &format!("{} cal", calories.value),
                        ],
                    )
                    .at_line(line)
                    .with_context(context),
                );
            }
        }
    }

    if let Some(distance) = movement.distance {
        if distance.meters() > MAX_PLAUSIBLE_DISTANCE_METERS {
            let text = format_amount(distance.value, distance.unit.as_str());
            collector.add(
                ParsingIssue::new(IssueCode::UnusualDistance, &[&text])
                    .at_line(line)
                    .with_context(context),
            );
        }
    }
}

fn format_amount(value: f64, unit: &str) -> String {
    let number = if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    };
    if unit == "%" {
        format!("{number}%")
    } else {
        format!("{number} {unit}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues::Severity;
    use crate::model::{
        Calories, Distance, DistanceUnit, MovementCategory, MovementIdentity, ScaledWeight, Weight,
    };

    fn movement(line_number: usize, id: Option<&str>) -> ParsedMovement {
        ParsedMovement {
            sequence: line_number,
            line_number,
            original_text: format!("line {line_number}"),
            name: Some("Thing".to_string()),
            movement: id.map(|id| MovementIdentity {
                id: id.to_string(),
                canonical_name: id.to_string(),
                category: MovementCategory::Other,
            }),
            reps: Some(10),
            weight: None,
            distance: None,
            calories: None,
            duration_seconds: None,
            height: None,
            notes: None,
            rep_scheme: None,
            confidence: 100.0,
        }
    }

    fn success(movement: ParsedMovement) -> MovementParse {
        MovementParse {
            success: true,
            confidence: movement.confidence,
            movement: Some(movement),
            issue: None,
            warning: None,
        }
    }

    fn detection(workout_type: WorkoutType, confidence: f64) -> TypeDetection {
        TypeDetection {
            workout_type,
            time_cap_seconds: None,
            rounds: None,
            interval_seconds: None,
            rep_scheme: None,
            confidence,
            issue: None,
            warning: None,
        }
    }

    fn workout_with(movements: Vec<ParsedMovement>) -> ParsedWorkout {
        let mut workout = ParsedWorkout::empty("text");
        workout.movements = movements;
        workout
    }

    #[test]
    fn empty_movement_list_is_an_error() {
        let result = build_result(
            &ScoringPolicy::default(),
            IssueCollector::default(),
            workout_with(Vec::new()),
            &detection(WorkoutType::ForTime, 90.0),
            &[],
        );
        assert!(!result.success);
        assert_eq!(result.errors[0].kind, IssueCode::NoMovements);
        assert!(result.confidence <= 30.0);
    }

    #[test]
    fn missing_parameters_are_warnings_not_errors() {
        for (workout_type, code) in [
            (WorkoutType::Emom, IssueCode::MissingInterval),
            (WorkoutType::Rounds, IssueCode::MissingRoundCount),
            (WorkoutType::Amrap, IssueCode::MissingDuration),
        ] {
            let mut workout = workout_with(vec![movement(1, Some("a"))]);
            workout.workout_type = workout_type;
            let parses = vec![success(movement(1, Some("a")))];
            let result = build_result(
                &ScoringPolicy::default(),
                IssueCollector::default(),
                workout,
                &detection(workout_type, 90.0),
                &parses,
            );
            assert!(result.success);
            assert_eq!(result.warnings.len(), 1);
            assert_eq!(result.warnings[0].kind, code);
        }
    }

    #[test]
    fn detector_missing_duration_is_reported_once() {
        let mut workout = workout_with(vec![movement(1, Some("a"))]);
        workout.workout_type = WorkoutType::Amrap;
        let mut detected = detection(WorkoutType::Amrap, 70.0);
        detected.warning = Some(ParsingIssue::new(IssueCode::MissingDuration, &["AMRAP"]));
        let result = build_result(
            &ScoringPolicy::default(),
            IssueCollector::default(),
            workout,
            &detected,
            &[success(movement(1, Some("a")))],
        );
        assert_eq!(result.summary.by_code.get(&202), Some(&1));
    }

    #[test]
    fn implausible_values_raise_consistency_issues() {
        let mut heavy = movement(1, Some("a"));
        heavy.reps = Some(900);
        heavy.weight = Some(Weight {
            value: 60.0,
            unit: LoadUnit::Kg,
            scaled: Some(ScaledWeight {
                value: 80.0,
                unit: LoadUnit::Kg,
            }),
        });
        let mut far = movement(2, Some("b"));
        far.distance = Some(Distance {
            value: 60.0,
            unit: DistanceUnit::Kilometers,
        });
        far.calories = Some(Calories {
            value: 10,
            scaled: Some(15),
        });
        let mut workout = workout_with(vec![heavy.clone(), far.clone()]);
        workout.time_cap_seconds = Some(4 * 60 * 60);

        let result = build_result(
            &ScoringPolicy::default(),
            IssueCollector::default(),
            workout,
            &detection(WorkoutType::ForTime, 90.0),
            &[success(heavy), success(far)],
        );
        let codes: Vec<u16> = result
            .warnings
            .iter()
            .chain(result.infos.iter())
            .map(|issue| issue.code)
            .collect();
        assert!(codes.contains(&401));
        assert!(codes.contains(&403));
        assert!(codes.contains(&406));
        assert_eq!(result.infos.iter().filter(|i| i.code == 404).count(), 2);
        assert!(result.infos.iter().all(|i| i.severity == Severity::Info));
    }

    #[test]
    fn repeated_movement_is_info() {
        let first = movement(1, Some("burpee"));
        let again = movement(3, Some("burpee"));
        let result = build_result(
            &ScoringPolicy::default(),
            IssueCollector::default(),
            workout_with(vec![first.clone(), again.clone()]),
            &detection(WorkoutType::ForTime, 90.0),
            &[success(first), success(again)],
        );
        assert_eq!(result.infos.len(), 1);
        assert_eq!(result.infos[0].kind, IssueCode::DuplicateMovement);
        assert_eq!(result.infos[0].line_number, Some(3));
    }

    #[test]
    fn coverage_counts_resolved_lines() {
        let known = movement(1, Some("a"));
        let mut unknown = movement(2, None);
        unknown.confidence = 30.0;
        let result = build_result(
            &ScoringPolicy::default(),
            IssueCollector::default(),
            workout_with(vec![known.clone(), unknown.clone()]),
            &detection(WorkoutType::ForTime, 90.0),
            &[success(known), success(unknown)],
        );
        assert_eq!(result.breakdown.coverage_rate, 0.5);
        assert_eq!(result.breakdown.movement_confidence, 65.0);
    }

    #[test]
    fn failed_result_is_zeroed() {
        let result = failed_result(
            "",
            [ParsingIssue::new(IssueCode::EmptyInput, &[])],
            20,
        );
        assert!(!result.success);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.breakdown, ConfidenceBreakdown::default());
        assert!(result.workout.movements.is_empty());
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn amounts_format_without_trailing_zeros() {
        assert_eq!(format_amount(800.0, "lb"), "800 lb");
        assert_eq!(format_amount(1.5, "pood"), "1.5 pood");
        assert_eq!(format_amount(160.0, "%"), "160%");
    }
}
