use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::ParserConfig;
use crate::detect::detect_workout_type;
use crate::dictionary::{InMemoryMovementDictionary, MovementDictionary};
use crate::error::{DictionaryError, EngineError};
use crate::input::InputValidator;
use crate::issues::{IssueCode, IssueCollector, ParsingIssue};
use crate::model::{ParseResult, ParsedWorkout};
use crate::movement::MovementLineParser;
use crate::preprocess::preprocess;
use crate::result::{build_result, failed_result};
use crate::similar::SimilarNameFinder;

/// Engine entry point. Cheap to share: all per-parse state is created inside
/// each call.
#[derive(Clone)]
pub struct WorkoutParser {
    dictionary: Arc<dyn MovementDictionary>,
    config: ParserConfig,
}

impl std::fmt::Debug for WorkoutParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkoutParser")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl WorkoutParser {
    pub fn new(dictionary: Arc<dyn MovementDictionary>, config: ParserConfig) -> Self {
        Self { dictionary, config }
    }

    /// Parser over the built-in movement catalog with default settings.
    pub fn with_builtin_catalog() -> Result<Self, DictionaryError> {
        let dictionary = InMemoryMovementDictionary::builtin()?;
        Ok(Self::new(Arc::new(dictionary), ParserConfig::default()))
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn dictionary(&self) -> &Arc<dyn MovementDictionary> {
        &self.dictionary
    }

    /// Always returns a result; engine failures become an `internal_error`
    /// issue.
    pub async fn parse(&self, text: &str) -> ParseResult {
        match self
            .parse_with_cancellation(text, &CancellationToken::new())
            .await
        {
            Ok(result) => result,
            Err(error) => {
                tracing::error!(%error, "workout parse failed");
                let message = error.to_string();
                failed_result(
                    text,
                    [ParsingIssue::new(IssueCode::InternalError, &[&message])],
                    self.config.max_errors,
                )
            }
        }
    }

    /// Like [`parse`](Self::parse), but stops with `EngineError::Cancelled`
    /// once `cancel` fires. Never returns a partial result.
    pub async fn parse_with_cancellation(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<ParseResult, EngineError> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let input = match InputValidator::from_config(&self.config).validate(text) {
            Ok(input) => input,
            Err(issue) => {
                tracing::debug!(code = issue.code, "input rejected");
                return Ok(failed_result(text, [issue], self.config.max_errors));
            }
        };

        let mut collector = IssueCollector::new(self.config.max_errors);
        collector.extend(input.warnings);

        let pre = preprocess(&input.text);
        let policy = &self.config.scoring;
        let detection = detect_workout_type(&pre, policy);

        let line_parser = MovementLineParser::new(
            self.dictionary.as_ref(),
            SimilarNameFinder::new(self.config.max_suggestions),
            policy,
        );
        let mut parses = Vec::with_capacity(pre.movement_lines.len());
        for (position, line) in pre.movement_lines.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::debug!(position, "parse cancelled between movement lines");
                return Err(EngineError::Cancelled);
            }
            let scheme = pre.movement_rep_schemes.get(&position).cloned();
            parses.push(
                line_parser
                    .parse_line(&line.text, position, line.number, scheme)
                    .await,
            );
        }
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let movements = parses
            .iter()
            .filter_map(|parse| parse.movement.clone())
            .enumerate()
            .map(|(index, mut movement)| {
                movement.sequence = index + 1;
                movement
            })
            .collect();
        let rep_scheme = if pre.movement_rep_schemes.is_empty() {
            pre.rep_scheme.clone().or_else(|| detection.rep_scheme.clone())
        } else {
            None
        };

        let workout = ParsedWorkout {
            workout_type: detection.workout_type,
            title: pre.title.clone(),
            time_cap_seconds: detection.time_cap_seconds,
            rounds: detection.rounds,
            interval_seconds: detection.interval_seconds,
            rep_scheme,
            movements,
            original_text: text.to_string(),
            cleaned_text: Some(pre.normalized.clone()),
        };

        Ok(build_result(policy, collector, workout, &detection, &parses))
    }

    /// Presence, length bounds and digits only; no parsing.
    pub fn validate(&self, text: &str) -> Vec<ParsingIssue> {
        InputValidator::from_config(&self.config).structural_issues(text)
    }
}
