//! Movement line parsing: quantity extraction and name resolution.

use tracing::{debug, warn};

use crate::confidence::ScoringPolicy;
use crate::dictionary::MovementDictionary;
use crate::issues::{IssueCode, ParsingIssue};
use crate::model::{
    Calories, Distance, Height, MovementIdentity, ParsedMovement, RepScheme, Weight,
};
use crate::patterns::{
    Spanned, calorie_pairs, calorie_singles, distances, durations, heights, leading_reps,
    parentheticals, percentages, trailing_reps, weight_pairs, weight_singles,
};
use crate::similar::SimilarNameFinder;

const MAX_RUNNER_UPS: usize = 2;
const FILLER_WORDS: &[&str] = &["x", "of", "at", "@", "for", "rep", "reps", "each", "ea"];

/// Outcome of parsing one movement line.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementParse {
    pub success: bool,
    pub movement: Option<ParsedMovement>,
    /// 0–100
    pub confidence: f64,
    pub issue: Option<ParsingIssue>,
    pub warning: Option<ParsingIssue>,
}

impl MovementParse {
    fn failed(issue: ParsingIssue) -> Self {
        Self {
            success: false,
            movement: None,
            confidence: 0.0,
            issue: Some(issue),
            warning: None,
        }
    }

    /// Whether the line resolved to a dictionary movement.
    pub fn is_resolved(&self) -> bool {
        self.movement
            .as_ref()
            .is_some_and(|movement| movement.movement.is_some())
    }
}

/// Quantities and leftover name text read from a line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineComponents {
    pub reps: Option<u32>,
    pub weight: Option<Weight>,
    pub distance: Option<Distance>,
    pub calories: Option<Calories>,
    pub duration_seconds: Option<u32>,
    pub height: Option<Height>,
    pub notes: Option<String>,
    pub name: Option<String>,
}

impl LineComponents {
    pub fn is_quantified(&self) -> bool {
        self.reps.is_some()
            || self.distance.is_some()
            || self.calories.is_some()
            || self.duration_seconds.is_some()
            || self.weight.is_some()
            || self.height.is_some()
    }
}

#[derive(Default)]
struct Claims(Vec<(usize, usize)>);

impl Claims {
    /// First candidate that does not overlap an earlier claim.
    fn take<T>(&mut self, candidates: Vec<Spanned<T>>) -> Option<T> {
        let found = candidates
            .into_iter()
            .find(|c| !self.0.iter().any(|(start, end)| c.overlaps(*start, *end)))?;
        self.0.push((found.start, found.end));
        Some(found.value)
    }

    fn take_one<T>(&mut self, candidate: Option<Spanned<T>>) -> Option<T> {
        self.take(candidate.into_iter().collect())
    }

    fn covers(&self, index: usize) -> bool {
        self.0.iter().any(|(start, end)| (*start..*end).contains(&index))
    }
}

/// Extractors run in a fixed order; a later one never claims characters an
/// earlier one already took.
pub fn extract_components(line: &str) -> LineComponents {
    let mut claims = Claims::default();
    let calories = claims.take(calorie_pairs(line));
    let height = claims.take(heights(line));
    let weight = claims
        .take(weight_pairs(line))
        .or_else(|| claims.take(percentages(line)))
        .or_else(|| claims.take(weight_singles(line)));
    let calories = calories.or_else(|| claims.take(calorie_singles(line)));
    let distance = claims.take(distances(line));
    let duration_seconds = claims.take(durations(line));
    let reps = claims
        .take_one(leading_reps(line))
        .or_else(|| claims.take_one(trailing_reps(line)));

    let groups = parentheticals(line);
    let notes: Vec<String> = groups
        .iter()
        .filter_map(|group| {
            let inner_start = group.start + 1;
            let inner_end = group.end.saturating_sub(1);
            let leftover: String = line[inner_start..inner_end]
                .char_indices()
                .map(|(offset, c)| {
                    if claims.covers(inner_start + offset) {
                        ' '
                    } else {
                        c
                    }
                })
                .collect();
            let words = clean_words(&leftover);
            (!words.is_empty()).then(|| words.join(" "))
        })
        .collect();

    let name_text: String = line
        .char_indices()
        .map(|(index, c)| {
            let in_group = groups.iter().any(|g| (g.start..g.end).contains(&index));
            if in_group || claims.covers(index) {
                ' '
            } else {
                c
            }
        })
        .collect();
    let name = clean_words(&name_text);

    LineComponents {
        reps,
        weight,
        distance,
        calories,
        duration_seconds,
        height,
        notes: (!notes.is_empty()).then(|| notes.join("; ")),
        name: (!name.is_empty()).then(|| name.join(" ")),
    }
}

/// Words that carry letters, without numeric tokens or leading/trailing filler.
fn clean_words(text: &str) -> Vec<&str> {
    let mut words: Vec<&str> = text
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric() && c != '&'))
        .filter(|word| word.chars().any(char::is_alphabetic))
        .filter(|word| !is_set_marker(word))
        .collect();
    while words
        .first()
        .is_some_and(|w| FILLER_WORDS.contains(&w.to_lowercase().as_str()))
    {
        words.remove(0);
    }
    while words
        .last()
        .is_some_and(|w| FILLER_WORDS.contains(&w.to_lowercase().as_str()))
    {
        words.pop();
    }
    words
}

/// "x5", "3x", "3x5"
fn is_set_marker(word: &str) -> bool {
    let lower = word.to_lowercase();
    let Some((left, right)) = lower.split_once('x') else {
        return false;
    };
    (!left.is_empty() || !right.is_empty())
        && left.chars().all(|c| c.is_ascii_digit())
        && right.chars().all(|c| c.is_ascii_digit())
}

enum Resolution {
    Exact(MovementIdentity),
    Single(MovementIdentity),
    Multiple(MovementIdentity, Vec<String>),
    NotFound,
}

pub struct MovementLineParser<'a> {
    dictionary: &'a dyn MovementDictionary,
    finder: SimilarNameFinder,
    policy: &'a ScoringPolicy,
}

impl<'a> MovementLineParser<'a> {
    pub fn new(
        dictionary: &'a dyn MovementDictionary,
        finder: SimilarNameFinder,
        policy: &'a ScoringPolicy,
    ) -> Self {
        Self {
            dictionary,
            finder,
            policy,
        }
    }

    /// `position` is 0-based among movement lines; `line_number` is the
    /// 1-based line in the submitted text.
    pub async fn parse_line(
        &self,
        line: &str,
        position: usize,
        line_number: usize,
        rep_scheme: Option<RepScheme>,
    ) -> MovementParse {
        let line = line.trim();
        if line.is_empty() {
            return MovementParse::failed(
                ParsingIssue::new(IssueCode::EmptyMovementLine, &[]).at_line(line_number),
            );
        }

        let components = extract_components(line);
        let resolution = match components.name.as_deref() {
            Some(name) => self.resolve(name).await,
            None => Resolution::NotFound,
        };

        let (identity, confidence, warning) = match resolution {
            Resolution::Exact(identity) => (Some(identity), self.policy.exact_match_confidence, None),
            Resolution::Single(identity) => (
                Some(identity),
                self.policy.single_search_match_confidence,
                None,
            ),
            Resolution::Multiple(identity, runner_ups) => {
                let name = components.name.as_deref().unwrap_or(line);
                let warning = ParsingIssue::new(
                    IssueCode::AmbiguousMovement,
                    &[name, &identity.canonical_name],
                )
                .at_line(line_number)
                .with_context(line)
                .with_similar_names(runner_ups);
                (
                    Some(identity),
                    self.policy.multiple_search_match_confidence,
                    Some(warning),
                )
            }
            Resolution::NotFound => {
                if !components.is_quantified() {
                    debug!(line_number, line, "movement line has no name match and no quantity");
                    return MovementParse::failed(
                        ParsingIssue::new(IssueCode::UnrecognizedMovementFormat, &[line])
                            .at_line(line_number)
                            .with_context(line),
                    );
                }
                let name = components.name.as_deref().unwrap_or(line);
                let similar = self.similar_names(name).await;
                let mut warning = ParsingIssue::new(IssueCode::UnknownMovement, &[name])
                    .at_line(line_number)
                    .with_context(line);
                if let Some(best) = similar.first() {
                    warning = warning.with_suggestion(format!("Did you mean '{best}'?"));
                }
                (
                    None,
                    self.policy.unknown_movement_confidence,
                    Some(warning.with_similar_names(similar)),
                )
            }
        };

        let movement = ParsedMovement {
            sequence: position + 1,
            line_number,
            original_text: line.to_string(),
            name: components.name,
            movement: identity,
            reps: components.reps,
            weight: components.weight,
            distance: components.distance,
            calories: components.calories,
            duration_seconds: components.duration_seconds,
            height: components.height,
            notes: components.notes,
            rep_scheme,
            confidence,
        };
        MovementParse {
            success: true,
            movement: Some(movement),
            confidence,
            issue: None,
            warning,
        }
    }

    async fn resolve(&self, name: &str) -> Resolution {
        match self.dictionary.normalize(name).await {
            Ok(Some(canonical)) => match self.dictionary.get_by_canonical_name(&canonical).await {
                Ok(Some(identity)) => return Resolution::Exact(identity),
                Ok(None) => {}
                Err(error) => {
                    warn!(%error, name, "canonical movement lookup failed; treating as no match");
                }
            },
            Ok(None) => {}
            Err(error) => {
                warn!(%error, name, "movement normalization failed; treating as no match");
            }
        }

        match self.dictionary.search(name).await {
            Ok(hits) => {
                let mut hits = hits.into_iter();
                match hits.next() {
                    None => Resolution::NotFound,
                    Some(best) => {
                        let runner_ups: Vec<String> = hits
                            .take(MAX_RUNNER_UPS)
                            .map(|m| m.canonical_name)
                            .collect();
                        if runner_ups.is_empty() {
                            Resolution::Single(best)
                        } else {
                            Resolution::Multiple(best, runner_ups)
                        }
                    }
                }
            }
            Err(error) => {
                warn!(%error, name, "movement search failed; treating as no match");
                Resolution::NotFound
            }
        }
    }

    async fn similar_names(&self, name: &str) -> Vec<String> {
        match self.dictionary.known_names().await {
            Ok(names) => self.finder.find(name, names.iter().map(String::as_str)),
            Err(error) => {
                warn!(%error, "listing known movement names failed; no suggestions");
                Vec::new()
            }
        }
    }
}
