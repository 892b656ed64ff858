//! Text preprocessing: normalization, title extraction, header/movement split
//! and rep-scheme assignment.

use std::collections::BTreeMap;

use tracing::debug;

use crate::model::{PreprocessedText, RepScheme, SourceLine};
use crate::patterns::{
    contains_type_keyword, is_header_line, parse_rep_scheme_line, split_leading_rep_scheme,
};

/// Benchmark workouts commonly written as a bare name on the first line.
const NAMED_WORKOUTS: &[&str] = &[
    "Amanda",
    "Angie",
    "Annie",
    "Barbara",
    "Chelsea",
    "Cindy",
    "Diane",
    "DT",
    "Elizabeth",
    "Eva",
    "Fight Gone Bad",
    "Filthy Fifty",
    "Fran",
    "Grace",
    "Helen",
    "Isabel",
    "Jackie",
    "JT",
    "Karen",
    "Kelly",
    "Linda",
    "Lynne",
    "Mary",
    "Murph",
    "Nancy",
    "Nicole",
    "Randy",
];

const TITLE_MIN_WORDS: usize = 2;
const TITLE_MAX_WORDS: usize = 6;
const TITLE_CONNECTORS: &[&str] = &["a", "an", "and", "the", "of", "in", "on", "for", "to"];

const UNIT_WORDS: &[&str] = &[
    "lb", "lbs", "kg", "kgs", "pood", "poods", "pound", "pounds", "kilo", "kilos", "cal",
    "cals", "calorie", "calories", "rep", "reps", "min", "mins", "minute", "minutes", "sec",
    "secs", "second", "seconds", "meter", "meters", "metre", "metres", "mile", "miles", "feet",
    "foot", "yard", "yards", "inch", "inches",
];

/// ASCII-fold typographic punctuation and unify line endings.
pub fn normalize_text(text: &str) -> String {
    text.replace("\r\n", "\n")
        .chars()
        .map(|c| match c {
            '\r' => '\n',
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => '"',
            '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
            '\u{00D7}' => 'x',
            '\u{00A0}' | '\u{2007}' | '\u{202F}' => ' ',
            other => other,
        })
        .collect()
}

pub fn preprocess(text: &str) -> PreprocessedText {
    let normalized = normalize_text(text);
    let lines: Vec<SourceLine> = normalized
        .lines()
        .enumerate()
        .map(|(index, line)| SourceLine {
            number: index + 1,
            text: line.trim().to_string(),
        })
        .filter(|line| !line.text.is_empty())
        .collect();

    let mut title = None;
    let mut body = lines.as_slice();
    if let [first, next, ..] = lines.as_slice() {
        if is_title(&first.text, &next.text) {
            title = Some(clean_title(&first.text));
            body = &lines[1..];
        }
    }

    let mut split = LineSplitter::default();
    for line in body {
        split.push(line);
    }
    let (rep_scheme, movement_rep_schemes) = split.assign_schemes();

    debug!(
        lines = lines.len(),
        headers = split.header_lines.len(),
        movements = split.movement_lines.len(),
        has_title = title.is_some(),
        workout_scheme = rep_scheme.is_some(),
        movement_schemes = movement_rep_schemes.len(),
        "preprocessed workout text"
    );

    PreprocessedText {
        normalized,
        title,
        lines,
        header_lines: split.header_lines,
        movement_lines: split.movement_lines,
        rep_scheme,
        movement_rep_schemes,
    }
}

#[derive(Default)]
struct LineSplitter {
    header_lines: Vec<SourceLine>,
    movement_lines: Vec<SourceLine>,
    pending: Option<RepScheme>,
    assigned: BTreeMap<usize, RepScheme>,
}

impl LineSplitter {
    fn push(&mut self, line: &SourceLine) {
        if let Some(scheme) = parse_rep_scheme_line(&line.text) {
            self.pending = Some(scheme);
            self.header_lines.push(line.clone());
            return;
        }

        if is_header_line(&line.text) {
            // "AMRAP 20 min: 10 Push-ups, 15 Air Squats"
            if let Some((head, tail)) = split_inline_header(&line.text) {
                self.header_lines.push(SourceLine {
                    number: line.number,
                    text: head.to_string(),
                });
                self.push_movements(line.number, tail);
                return;
            }
            self.header_lines.push(line.clone());
            return;
        }

        if let Some((scheme, rest)) = split_leading_rep_scheme(&line.text) {
            self.header_lines.push(SourceLine {
                number: line.number,
                text: scheme.text.clone(),
            });
            self.pending = Some(scheme);
            self.push_movements(line.number, rest);
            return;
        }

        self.push_movements(line.number, &line.text);
    }

    fn push_movements(&mut self, number: usize, text: &str) {
        for segment in split_movement_list(text) {
            let index = self.movement_lines.len();
            if let Some(scheme) = self.pending.take() {
                self.assigned.insert(index, scheme);
            }
            self.movement_lines.push(SourceLine {
                number,
                text: segment.to_string(),
            });
        }
    }

    /// One distinct scheme becomes workout-level; several distinct schemes
    /// stay per movement.
    fn assign_schemes(&mut self) -> (Option<RepScheme>, BTreeMap<usize, RepScheme>) {
        let assigned = std::mem::take(&mut self.assigned);
        let Some(first) = assigned.values().next().cloned() else {
            return (self.pending.take(), BTreeMap::new());
        };
        if assigned.values().all(|scheme| scheme.reps == first.reps) {
            return (Some(first), BTreeMap::new());
        }
        (None, assigned)
    }
}

fn split_inline_header(line: &str) -> Option<(&str, &str)> {
    let (head, tail) = line.split_once(':')?;
    let (head, tail) = (head.trim(), tail.trim());
    if head.is_empty() || tail.is_empty() || !is_header_line(head) || is_header_line(tail) {
        return None;
    }
    Some((head, tail))
}

/// Split "10 Push-ups, 15 Air Squats" on commas/semicolons outside
/// parentheses, but only when every piece names something.
fn split_movement_list(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (index, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' | ';' if depth == 0 => {
                pieces.push(text[start..index].trim());
                start = index + c.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push(text[start..].trim());
    pieces.retain(|piece| !piece.is_empty());

    if pieces.len() > 1 && pieces.iter().all(|piece| has_name_word(piece)) {
        pieces
    } else {
        vec![text.trim()]
    }
}

fn has_name_word(piece: &str) -> bool {
    piece
        .split(|c: char| !c.is_alphabetic())
        .filter(|word| word.chars().count() >= 3)
        .any(|word| !UNIT_WORDS.contains(&word.to_lowercase().as_str()))
}

fn clean_title(line: &str) -> String {
    line.trim()
        .trim_end_matches(':')
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

fn is_title(line: &str, next: &str) -> bool {
    if line.chars().any(|c| c.is_ascii_digit()) || contains_type_keyword(line) {
        return false;
    }
    let cleaned = clean_title(line);
    if cleaned.is_empty() {
        return false;
    }
    if NAMED_WORKOUTS
        .iter()
        .any(|name| name.eq_ignore_ascii_case(&cleaned))
    {
        return true;
    }
    let trimmed = line.trim();
    let quoted = trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')));
    if quoted || trimmed.ends_with(':') {
        return true;
    }
    // A capitalized line followed by another bare name ("Wall Balls\nBox Jumps")
    // is the first entry of a movement list.
    is_title_cased(&cleaned, TITLE_MIN_WORDS)
        && split_movement_list(trimmed).len() == 1
        && !is_bare_name(next)
}

/// Capitalized words with no quantity or workout-type keyword.
fn is_bare_name(line: &str) -> bool {
    !line.chars().any(|c| c.is_ascii_digit())
        && !contains_type_keyword(line)
        && is_title_cased(&clean_title(line), 1)
}

fn is_title_cased(text: &str, min_words: usize) -> bool {
    let words: Vec<&str> = text.split_whitespace().collect();
    if !(min_words..=TITLE_MAX_WORDS).contains(&words.len()) {
        return false;
    }
    words.iter().all(|word| {
        if TITLE_CONNECTORS.contains(&word.to_lowercase().as_str()) {
            return true;
        }
        word.chars()
            .find(|c| c.is_alphabetic())
            .is_some_and(char::is_uppercase)
    })
}
