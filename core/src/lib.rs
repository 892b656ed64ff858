//! Free-text workout parsing engine.
//!
//! Raw athlete-authored text flows through
//! [`input`] → [`preprocess`] → [`detect`] + [`movement`] → [`result`]
//! and comes back as a [`model::ParseResult`]: a structured workout, a 0–100
//! confidence, and user-facing issues. [`parser::WorkoutParser`] wires the
//! stages together around an injected [`dictionary::MovementDictionary`].

pub mod config;
pub mod confidence;
pub mod detect;
pub mod dictionary;
pub mod error;
pub mod input;
pub mod issues;
pub mod model;
pub mod movement;
pub mod parser;
pub mod patterns;
pub mod preprocess;
pub mod result;
pub mod similar;

pub use config::ParserConfig;
pub use dictionary::{InMemoryMovementDictionary, MovementDictionary};
pub use error::{DictionaryError, EngineError};
pub use issues::{IssueCode, IssueCollector, ParsingIssue, Severity};
pub use model::{ParseResult, ParsedMovement, ParsedWorkout, WorkoutType};
pub use parser::WorkoutParser;

pub(crate) fn round_to_two(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
