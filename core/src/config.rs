use serde::{Deserialize, Serialize};

use crate::confidence::ScoringPolicy;
use crate::issues::DEFAULT_MAX_ERRORS;
use crate::similar::DEFAULT_MAX_SUGGESTIONS;

pub const DEFAULT_MAX_INPUT_CHARS: usize = 10_000;
pub const DEFAULT_MIN_INPUT_CHARS: usize = 5;

/// Engine tunables. `from_env` reads `WOD_*` overrides on top of the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserConfig {
    pub max_input_chars: usize,
    pub min_input_chars: usize,
    pub max_errors: usize,
    pub max_suggestions: usize,
    #[serde(default)]
    pub scoring: ScoringPolicy,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            min_input_chars: DEFAULT_MIN_INPUT_CHARS,
            max_errors: DEFAULT_MAX_ERRORS,
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
            scoring: ScoringPolicy::default(),
        }
    }
}

impl ParserConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_input_chars: env_usize("WOD_MAX_INPUT_CHARS").unwrap_or(defaults.max_input_chars),
            min_input_chars: env_usize("WOD_MIN_INPUT_CHARS").unwrap_or(defaults.min_input_chars),
            max_errors: env_usize("WOD_MAX_ERRORS").unwrap_or(defaults.max_errors),
            max_suggestions: env_usize("WOD_MAX_SUGGESTIONS").unwrap_or(defaults.max_suggestions),
            scoring: defaults.scoring,
        }
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
}
