//! Confidence scoring policy.
//!
//! Every weight, penalty and threshold behind the 0–100 confidence lives in
//! [`ScoringPolicy`]; the pipeline stages read it rather than carrying their
//! own literals.

use serde::{Deserialize, Serialize};

use crate::model::{ConfidenceBreakdown, ParsedWorkout, WorkoutType};
use crate::round_to_two;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub type_weight: f64,
    pub time_domain_weight: f64,
    pub movement_weight: f64,
    pub coverage_weight: f64,

    pub warning_penalty: f64,
    pub max_warning_penalty: f64,
    /// Overall score with errors: `max(0, error_base - error_penalty * errors)`
    pub error_base: f64,
    pub error_penalty: f64,

    pub amrap_without_cap_time_confidence: f64,
    pub emom_without_interval_time_confidence: f64,
    pub rounds_without_count_time_confidence: f64,

    pub exact_match_confidence: f64,
    pub single_search_match_confidence: f64,
    pub multiple_search_match_confidence: f64,
    pub unknown_movement_confidence: f64,

    pub for_time_with_cap_floor: f64,
    pub amrap_without_cap_ceiling: f64,
    pub inferred_with_rep_scheme_confidence: f64,
    pub inferred_confidence: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            type_weight: 0.20,
            time_domain_weight: 0.15,
            movement_weight: 0.50,
            coverage_weight: 0.15,
            warning_penalty: 5.0,
            max_warning_penalty: 20.0,
            error_base: 40.0,
            error_penalty: 10.0,
            amrap_without_cap_time_confidence: 50.0,
            emom_without_interval_time_confidence: 70.0,
            rounds_without_count_time_confidence: 60.0,
            exact_match_confidence: 100.0,
            single_search_match_confidence: 80.0,
            multiple_search_match_confidence: 70.0,
            unknown_movement_confidence: 30.0,
            for_time_with_cap_floor: 90.0,
            amrap_without_cap_ceiling: 70.0,
            inferred_with_rep_scheme_confidence: 60.0,
            inferred_confidence: 40.0,
        }
    }
}

impl ScoringPolicy {
    /// 100 unless the workout lacks the parameter its type depends on.
    pub fn time_domain_confidence(&self, workout: &ParsedWorkout) -> f64 {
        let mut confidence: f64 = 100.0;
        if workout.workout_type == WorkoutType::Amrap && workout.time_cap_seconds.is_none() {
            confidence = confidence.min(self.amrap_without_cap_time_confidence);
        }
        if workout.workout_type == WorkoutType::Emom && workout.interval_seconds.is_none() {
            confidence = confidence.min(self.emom_without_interval_time_confidence);
        }
        if workout.workout_type == WorkoutType::Rounds && workout.rounds.is_none() {
            confidence = confidence.min(self.rounds_without_count_time_confidence);
        }
        confidence
    }

    pub fn overall(
        &self,
        breakdown: &ConfidenceBreakdown,
        error_count: usize,
        warning_count: usize,
    ) -> f64 {
        if error_count > 0 {
            return (self.error_base - self.error_penalty * error_count as f64).max(0.0);
        }
        let weighted = breakdown.type_confidence * self.type_weight
            + breakdown.time_domain_confidence * self.time_domain_weight
            + breakdown.movement_confidence * self.movement_weight
            + breakdown.coverage_rate * 100.0 * self.coverage_weight;
        let penalty = (self.warning_penalty * warning_count as f64).min(self.max_warning_penalty);
        (weighted - penalty).clamp(0.0, 100.0)
    }
}

/// Inputs for [`compute_breakdown`].
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs<'a> {
    pub type_confidence: f64,
    pub workout: &'a ParsedWorkout,
    /// Confidences of successfully parsed lines
    pub line_confidences: &'a [f64],
    pub resolved_lines: usize,
    pub total_lines: usize,
    pub error_count: usize,
    pub warning_count: usize,
}

pub fn compute_breakdown(policy: &ScoringPolicy, inputs: ScoreInputs<'_>) -> ConfidenceBreakdown {
    let movement_confidence = if inputs.line_confidences.is_empty() {
        0.0
    } else {
        inputs.line_confidences.iter().sum::<f64>() / inputs.line_confidences.len() as f64
    };
    let coverage_rate = if inputs.total_lines == 0 {
        0.0
    } else {
        inputs.resolved_lines as f64 / inputs.total_lines as f64
    };

    let mut breakdown = ConfidenceBreakdown {
        type_confidence: inputs.type_confidence,
        time_domain_confidence: policy.time_domain_confidence(inputs.workout),
        movement_confidence,
        coverage_rate,
        overall: 0.0,
    };
    breakdown.overall = policy.overall(&breakdown, inputs.error_count, inputs.warning_count);

    ConfidenceBreakdown {
        type_confidence: round_to_two(breakdown.type_confidence),
        time_domain_confidence: round_to_two(breakdown.time_domain_confidence),
        movement_confidence: round_to_two(breakdown.movement_confidence),
        coverage_rate: round_to_two(breakdown.coverage_rate),
        overall: round_to_two(breakdown.overall),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(workout: &ParsedWorkout, errors: usize, warnings: usize) -> ScoreInputs<'_> {
        ScoreInputs {
            type_confidence: 90.0,
            workout,
            line_confidences: &[100.0, 80.0],
            resolved_lines: 2,
            total_lines: 2,
            error_count: errors,
            warning_count: warnings,
        }
    }

    #[test]
    fn weighted_sum_without_issues() {
        let mut workout = ParsedWorkout::empty("x");
        workout.workout_type = WorkoutType::ForTime;
        let breakdown = compute_breakdown(&ScoringPolicy::default(), inputs(&workout, 0, 0));
        // 90*0.2 + 100*0.15 + 90*0.5 + 100*0.15
        assert_eq!(breakdown.overall, 93.0);
        assert_eq!(breakdown.movement_confidence, 90.0);
        assert_eq!(breakdown.coverage_rate, 1.0);
    }

    #[test]
    fn confidence_never_rises_with_more_warnings() {
        let workout = ParsedWorkout::empty("x");
        let policy = ScoringPolicy::default();
        let mut previous = f64::MAX;
        for warnings in 0..10 {
            let overall = compute_breakdown(&policy, inputs(&workout, 0, warnings)).overall;
            assert!(overall <= previous);
            previous = overall;
        }
        let none = compute_breakdown(&policy, inputs(&workout, 0, 0)).overall;
        let many = compute_breakdown(&policy, inputs(&workout, 0, 9)).overall;
        assert_eq!(none - many, 20.0);
    }

    #[test]
    fn errors_collapse_confidence() {
        let workout = ParsedWorkout::empty("x");
        let policy = ScoringPolicy::default();
        for errors in 1..8 {
            let overall = compute_breakdown(&policy, inputs(&workout, errors, 0)).overall;
            let ceiling = (40.0 - 10.0 * errors as f64).max(0.0);
            assert!(overall <= ceiling);
        }
    }

    #[test]
    fn time_domain_confidence_reflects_missing_parameters() {
        let policy = ScoringPolicy::default();
        let mut workout = ParsedWorkout::empty("x");

        workout.workout_type = WorkoutType::Amrap;
        assert_eq!(policy.time_domain_confidence(&workout), 50.0);
        workout.time_cap_seconds = Some(600);
        assert_eq!(policy.time_domain_confidence(&workout), 100.0);

        workout.workout_type = WorkoutType::Emom;
        assert_eq!(policy.time_domain_confidence(&workout), 70.0);

        workout.workout_type = WorkoutType::Rounds;
        assert_eq!(policy.time_domain_confidence(&workout), 60.0);
    }

    #[test]
    fn no_lines_means_zero_movement_scores() {
        let workout = ParsedWorkout::empty("x");
        let breakdown = compute_breakdown(
            &ScoringPolicy::default(),
            ScoreInputs {
                type_confidence: 40.0,
                workout: &workout,
                line_confidences: &[],
                resolved_lines: 0,
                total_lines: 0,
                error_count: 0,
                warning_count: 0,
            },
        );
        assert_eq!(breakdown.movement_confidence, 0.0);
        assert_eq!(breakdown.coverage_rate, 0.0);
    }
}
