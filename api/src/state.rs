use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use wodparse_core::error::DictionaryError;
use wodparse_core::{InMemoryMovementDictionary, ParserConfig, WorkoutParser};

pub const DEFAULT_PARSE_TIMEOUT_MS: u64 = 2_000;

#[derive(Clone)]
pub struct AppState {
    pub parser: Arc<WorkoutParser>,
    pub parse_timeout: Duration,
}

impl AppState {
    pub fn new(parser: WorkoutParser, parse_timeout: Duration) -> Self {
        Self {
            parser: Arc::new(parser),
            parse_timeout,
        }
    }

    /// Reads `WOD_MOVEMENT_CATALOG`, `WOD_PARSE_TIMEOUT_MS` and the engine's
    /// `WOD_*` limits.
    pub fn from_env() -> Result<Self, DictionaryError> {
        let catalog = std::env::var("WOD_MOVEMENT_CATALOG")
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);
        let dictionary = InMemoryMovementDictionary::load(catalog.as_deref())?;
        tracing::info!(
            movements = dictionary.len(),
            custom_catalog = catalog.is_some(),
            "movement catalog loaded"
        );

        let timeout_ms = std::env::var("WOD_PARSE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_PARSE_TIMEOUT_MS);

        let parser = WorkoutParser::new(Arc::new(dictionary), ParserConfig::from_env());
        Ok(Self::new(parser, Duration::from_millis(timeout_ms)))
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        let parser = WorkoutParser::with_builtin_catalog().expect("builtin catalog");
        Self::new(parser, Duration::from_millis(DEFAULT_PARSE_TIMEOUT_MS))
    }
}
