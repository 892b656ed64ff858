//! Process-wide compiled pattern table.
//!
//! Patterns are grouped by purpose (workout type, time, rep scheme, movement
//! line, load, security) and compiled once on first use. Everything here is
//! read-only; the matching helpers are pure functions over `&str`.

use std::sync::LazyLock;

use regex::{Captures, Match, Regex};

use crate::model::{
    Calories, Distance, DistanceUnit, Height, HeightUnit, LoadUnit, RepScheme, ScaledWeight,
    Weight, WorkoutType,
};

pub static PATTERNS: LazyLock<PatternLibrary> = LazyLock::new(PatternLibrary::compile);

const TABATA_ROUNDS: u32 = 8;
const TABATA_WORK_SECONDS: u32 = 20;
const TABATA_REST_SECONDS: u32 = 10;
const EMOM_DEFAULT_INTERVAL_SECONDS: u32 = 60;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("pattern library regex must compile")
}

pub struct WorkoutTypePatterns {
    pub amrap: Regex,
    pub amrap_minutes_before: Regex,
    pub amrap_minutes_after: Regex,
    pub for_time: Regex,
    pub emom: Regex,
    pub emom_minutes_before: Regex,
    pub emom_minutes_after: Regex,
    pub every_for_minutes: Regex,
    pub tabata: Regex,
    pub rounds: Regex,
    pub intervals: Regex,
    pub on_off: Regex,
}

pub struct TimePatterns {
    pub cap_clock: Regex,
    pub cap_minutes: Regex,
    pub minutes_cap: Regex,
    pub duration_line: Regex,
    pub rounds_count: Regex,
}

pub struct RepSchemePatterns {
    pub line: Regex,
    pub sequence: Regex,
    pub leading: Regex,
}

pub struct MovementPatterns {
    pub leading_reps: Regex,
    pub trailing_reps: Regex,
    pub parenthetical: Regex,
    pub duration: Regex,
}

pub struct LoadPatterns {
    pub weight_pair: Regex,
    /// Unit right after an unlabelled `a/b`, which makes it a fraction, not a load pair
    pub pair_trailing_unit: Regex,
    pub weight_single: Regex,
    pub percentage: Regex,
    pub calorie_pair: Regex,
    pub calorie_single: Regex,
    pub distance: Regex,
    pub height: Regex,
}

pub struct SecurityPatterns {
    pub injection: Regex,
}

pub struct PatternLibrary {
    pub workout_type: WorkoutTypePatterns,
    pub time: TimePatterns,
    pub rep_scheme: RepSchemePatterns,
    pub movement: MovementPatterns,
    pub load: LoadPatterns,
    pub security: SecurityPatterns,
}

impl PatternLibrary {
    fn compile() -> Self {
        Self {
            workout_type: WorkoutTypePatterns {
                amrap: re(
                    r"(?i)\bamrap\b|\bas\s+many\s+(?:rounds|reps)(?:\s+(?:and|&)\s+reps)?\s+as\s+possible\b",
                ),
                amrap_minutes_before: re(
                    r"(?im)\b(\d{1,3})(?::(\d{2}))?\s*-?\s*(?:minutes?|mins?|m)?\s*(?:of\s+)?(?:an?\s+)?amrap\b",
                ),
                amrap_minutes_after: re(
                    r"(?im)\bamrap\s*(?:in|of|for)?\s*[:\-]?\s*(\d{1,3})(?::(\d{2}))?\s*(?:(?:minutes?|mins?|m)\b|$)",
                ),
                for_time: re(r"(?i)\bfor\s+time\b|\brft\b|\bchipper\b"),
                emom: re(
                    r"(?i)\be(\d{1,2})?mom\b|\bevery\s+minute\b|\botm\b|\bevery\s+(\d{1,3})\s*(minutes?|mins?|m|seconds?|secs?|s)\b",
                ),
                emom_minutes_before: re(
                    r"(?i)\b(\d{1,3})\s*-?\s*(?:minutes?|mins?|m)\s+e\d{0,2}mom\b",
                ),
                emom_minutes_after: re(
                    r"(?im)\be\d{0,2}mom\s*(?:for|x)?\s*[:\-]?\s*(\d{1,3})\s*(?:(?:minutes?|mins?|m)\b|$)",
                ),
                every_for_minutes: re(
                    r"(?i)\bevery\s+.{1,20}?\bfor\s+(\d{1,3})\s*(?:minutes?|mins?|m)\b",
                ),
                tabata: re(r"(?i)\btabata\b"),
                rounds: re(r"(?i)\b\d{1,3}\s*(?:rounds?|rds?|rnds?)\b|\brounds?\s+(?:of|for)\b"),
                intervals: re(r"(?i)\bintervals?\b|\bwork\s*/\s*rest\b"),
                on_off: re(
                    r"(?i)\b(\d{1,3})\s*(seconds?|secs?|s|minutes?|mins?|m)?\s*on\s*[,/]?\s*(\d{1,3})\s*(seconds?|secs?|s|minutes?|mins?|m)?\s*off\b",
                ),
            },
            time: TimePatterns {
                cap_clock: re(r"(?i)\b(?:time\s*cap|cap|tc)\s*(?:of\s+)?[:=]?\s*(\d{1,3}):(\d{2})\b"),
                cap_minutes: re(
                    r"(?i)\b(?:time\s*cap|cap|tc)\s*(?:of\s+)?[:=]?\s*(\d{1,3})\s*(?:minutes?|mins?|m)?\b",
                ),
                minutes_cap: re(
                    r"(?i)\b(\d{1,3})\s*-?\s*(?:minutes?|mins?|m)\s*(?:time\s*)?cap\b",
                ),
                duration_line: re(
                    r"(?i)^\s*(?:(\d{1,3})\s*(?:minutes?|mins?)|(\d{1,3}):(\d{2}))\s*\.?\s*$",
                ),
                rounds_count: re(r"(?i)\b(\d{1,3})\s*(?:rounds?|rds?|rnds?|rft)\b"),
            },
            rep_scheme: RepSchemePatterns {
                line: re(r"(?i)^\s*(\d{1,4}(?:\s*-\s*\d{1,4})+)\s*(?:reps?)?\s*[:.]?\s*$"),
                sequence: re(r"\b(\d{1,4}(?:\s*-\s*\d{1,4})+)\b"),
                leading: re(
                    r"(?i)^\s*(\d{1,4}(?:\s*-\s*\d{1,4})+)\s+(?:reps?\s+(?:of\s+)?)?(\S.*)$",
                ),
            },
            movement: MovementPatterns {
                leading_reps: re(r"(?i)^\s*(\d{1,4})\s*(?:x\b\s*|reps?\b\s*(?:of\s+)?)?"),
                trailing_reps: re(r"(?i)\bx\s*(\d{1,4})\s*(?:reps?)?\s*$"),
                parenthetical: re(r"\(([^()]*)\)"),
                duration: re(
                    r"(?i)(\d{1,3})\s*(?:seconds?\b|secs?\b|s\b)|(\d{1,3})\s*(?:minutes?\b|mins?\b)|\b(\d{1,2}):(\d{2})\b|(?:^|\s):(\d{2})\b",
                ),
            },
            load: LoadPatterns {
                weight_pair: re(
                    r"(?i)(\d{1,4}(?:\.\d+)?)\s*(lbs?\b|kgs?\b|pood\b|pd\b|#)?\s*/\s*(\d{1,4}(?:\.\d+)?)\s*(lbs?\b|kgs?\b|pood\b|pd\b|#)?",
                ),
                weight_single: re(
                    r"(?i)(\d{1,4}(?:\.\d+)?)\s*(lbs?\b|kgs?\b|pood\b|pd\b|pounds?\b|kilos?\b|#)",
                ),
                percentage: re(r"(\d{1,3}(?:\.\d+)?)\s*%"),
                calorie_pair: re(r"(?i)(\d{1,4})\s*/\s*(\d{1,4})\s*(?:cals?|calories?)\b"),
                calorie_single: re(r"(?i)(\d{1,4})\s*(?:cals?|calories?)\b"),
                pair_trailing_unit: re(
                    r#"(?i)^\s*(?:(?:meters?|metres?|m|km|kilometers?|kilometres?|k|miles?|mi|ft|feet|foot|yds?|yards?|cals?|calories?|inch(?:es)?|in|cm)\b|['"])"#,
                ),
                distance: re(
                    r"(?i)(?:\b(\d{1,2})\s*/\s*)?(\d{1,5}(?:\.\d+)?)\s*(meters?\b|metres?\b|m\b|km\b|kilometers?\b|kilometres?\b|k\b|miles?\b|mi\b|ft\b|feet\b|foot\b|yds?\b|yards?\b|')",
                ),
                height: re(
                    r#"(?i)(\d{1,3}(?:\.\d+)?)(?:\s*/\s*(\d{1,3}(?:\.\d+)?))?\s*(?:(inch(?:es)?|in|cm)\b|")"#,
                ),
            },
            security: SecurityPatterns {
                injection: re(
                    r#"(?i)<\s*/?\s*(?:script|iframe|object|embed|style|svg|img|link|meta)\b|javascript\s*:|vbscript\s*:|data\s*:\s*text/html|\bon[a-z]+\s*=\s*["']"#,
                ),
            },
        }
    }
}

/// A value with the byte span it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub value: T,
    pub start: usize,
    pub end: usize,
}

impl<T> Spanned<T> {
    fn from_match(value: T, full: Match<'_>) -> Self {
        Self {
            value,
            start: full.start(),
            end: full.end(),
        }
    }

    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end
    }
}

/// Result of matching one workout-type family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeMatch {
    pub workout_type: WorkoutType,
    /// Intrinsic pattern confidence, 0.0–1.0
    pub confidence: f64,
    pub time_cap_seconds: Option<u32>,
    pub rounds: Option<u32>,
    pub interval_seconds: Option<u32>,
}

impl TypeMatch {
    fn new(workout_type: WorkoutType, confidence: f64) -> Self {
        Self {
            workout_type,
            confidence,
            time_cap_seconds: None,
            rounds: None,
            interval_seconds: None,
        }
    }
}

fn cap_u32(caps: &Captures<'_>, index: usize) -> Option<u32> {
    caps.get(index).and_then(|m| m.as_str().parse::<u32>().ok())
}

fn cap_f64(caps: &Captures<'_>, index: usize) -> Option<f64> {
    caps.get(index).and_then(|m| m.as_str().parse::<f64>().ok())
}

fn minutes_and_seconds(caps: &Captures<'_>, minutes: usize, seconds: usize) -> Option<u32> {
    let m = cap_u32(caps, minutes)?;
    let s = cap_u32(caps, seconds).unwrap_or(0);
    Some(m * 60 + s)
}

fn unit_seconds(unit: Option<&str>) -> u32 {
    match unit.map(|u| u.to_lowercase()) {
        Some(u) if u.starts_with('m') => 60,
        _ => 1,
    }
}

/// Match workout-type families in precedence order:
/// AMRAP, For-Time, EMOM, Tabata, Rounds, Intervals.
pub fn match_workout_type(text: &str) -> Option<TypeMatch> {
    match_amrap(text)
        .or_else(|| match_for_time(text))
        .or_else(|| match_emom(text))
        .or_else(|| match_tabata(text))
        .or_else(|| match_rounds(text))
        .or_else(|| match_intervals(text))
}

fn match_amrap(text: &str) -> Option<TypeMatch> {
    let patterns = &PATTERNS.workout_type;
    if !patterns.amrap.is_match(text) {
        return None;
    }
    let duration = patterns
        .amrap_minutes_before
        .captures(text)
        .or_else(|| patterns.amrap_minutes_after.captures(text))
        .and_then(|caps| minutes_and_seconds(&caps, 1, 2))
        .filter(|seconds| *seconds > 0);
    let mut found = TypeMatch::new(
        WorkoutType::Amrap,
        if duration.is_some() { 0.95 } else { 0.9 },
    );
    found.time_cap_seconds = duration;
    Some(found)
}

fn match_for_time(text: &str) -> Option<TypeMatch> {
    if !PATTERNS.workout_type.for_time.is_match(text) {
        return None;
    }
    let mut found = TypeMatch::new(WorkoutType::ForTime, 0.9);
    found.rounds = extract_rounds(text);
    Some(found)
}

fn match_emom(text: &str) -> Option<TypeMatch> {
    let patterns = &PATTERNS.workout_type;
    let caps = patterns.emom.captures(text)?;
    let interval = if let Some(n) = cap_u32(&caps, 1) {
        n * 60
    } else if let Some(n) = cap_u32(&caps, 2) {
        n * unit_seconds(caps.get(3).map(|m| m.as_str()))
    } else {
        EMOM_DEFAULT_INTERVAL_SECONDS
    };
    let total = patterns
        .emom_minutes_before
        .captures(text)
        .or_else(|| patterns.emom_minutes_after.captures(text))
        .or_else(|| patterns.every_for_minutes.captures(text))
        .and_then(|caps| cap_u32(&caps, 1))
        .map(|minutes| minutes * 60);
    let rounds = extract_rounds(text);

    let mut found = TypeMatch::new(WorkoutType::Emom, 0.9);
    found.interval_seconds = (interval > 0).then_some(interval);
    found.time_cap_seconds = total.or_else(|| rounds.map(|r| r * interval));
    found.rounds = rounds.or_else(|| {
        total
            .filter(|_| interval > 0)
            .map(|seconds| seconds / interval)
            .filter(|r| *r > 0)
    });
    Some(found)
}

fn match_tabata(text: &str) -> Option<TypeMatch> {
    if !PATTERNS.workout_type.tabata.is_match(text) {
        return None;
    }
    let interval = TABATA_WORK_SECONDS + TABATA_REST_SECONDS;
    let mut found = TypeMatch::new(WorkoutType::Tabata, 0.95);
    found.rounds = Some(TABATA_ROUNDS);
    found.interval_seconds = Some(interval);
    found.time_cap_seconds = Some(TABATA_ROUNDS * interval);
    Some(found)
}

fn match_rounds(text: &str) -> Option<TypeMatch> {
    if !PATTERNS.workout_type.rounds.is_match(text) {
        return None;
    }
    let mut found = TypeMatch::new(WorkoutType::Rounds, 0.85);
    found.rounds = extract_rounds(text);
    Some(found)
}

fn match_intervals(text: &str) -> Option<TypeMatch> {
    let patterns = &PATTERNS.workout_type;
    if let Some(caps) = patterns.on_off.captures(text) {
        let on = cap_u32(&caps, 1)? * unit_seconds(caps.get(2).map(|m| m.as_str()));
        let off = cap_u32(&caps, 3)? * unit_seconds(caps.get(4).map(|m| m.as_str()));
        let mut found = TypeMatch::new(WorkoutType::Intervals, 0.85);
        found.interval_seconds = Some(on + off).filter(|s| *s > 0);
        found.rounds = extract_rounds(text);
        return Some(found);
    }
    if patterns.intervals.is_match(text) {
        let mut found = TypeMatch::new(WorkoutType::Intervals, 0.75);
        found.rounds = extract_rounds(text);
        return Some(found);
    }
    None
}

/// Explicit time-cap phrases: "Time cap: 12:00", "cap 20", "20 min cap".
pub fn extract_time_cap(text: &str) -> Option<u32> {
    let time = &PATTERNS.time;
    if let Some(caps) = time.cap_clock.captures(text) {
        return minutes_and_seconds(&caps, 1, 2).filter(|s| *s > 0);
    }
    if let Some(caps) = time.minutes_cap.captures(text) {
        return cap_u32(&caps, 1).map(|m| m * 60).filter(|s| *s > 0);
    }
    if let Some(caps) = time.cap_minutes.captures(text) {
        return cap_u32(&caps, 1).map(|m| m * 60).filter(|s| *s > 0);
    }
    None
}

/// A line that is nothing but a duration ("20 minutes", "12:00").
pub fn duration_line_seconds(line: &str) -> Option<u32> {
    let caps = PATTERNS.time.duration_line.captures(line)?;
    if let Some(minutes) = cap_u32(&caps, 1) {
        return Some(minutes * 60);
    }
    minutes_and_seconds(&caps, 2, 3)
}

pub fn extract_rounds(text: &str) -> Option<u32> {
    PATTERNS
        .time
        .rounds_count
        .captures(text)
        .and_then(|caps| cap_u32(&caps, 1))
        .filter(|r| *r > 0)
}

fn parse_sequence(raw: &str) -> Option<Vec<u32>> {
    raw.split('-')
        .map(|part| part.trim().parse::<u32>().ok())
        .collect()
}

/// A line that is only a dash-separated rep sequence, e.g. "21-15-9 reps".
pub fn parse_rep_scheme_line(line: &str) -> Option<RepScheme> {
    let caps = PATTERNS.rep_scheme.line.captures(line)?;
    let raw = caps.get(1)?.as_str();
    RepScheme::new(parse_sequence(raw)?, line.trim())
}

/// "21-15-9 Thrusters" → the scheme and the rest of the line.
pub fn split_leading_rep_scheme(line: &str) -> Option<(RepScheme, &str)> {
    let caps = PATTERNS.rep_scheme.leading.captures(line)?;
    let raw = caps.get(1)?.as_str();
    let rest = caps.get(2)?.as_str();
    let scheme = RepScheme::new(parse_sequence(raw)?, raw)?;
    Some((scheme, rest))
}

/// First rep sequence anywhere in the text.
pub fn extract_rep_scheme(text: &str) -> Option<RepScheme> {
    let caps = PATTERNS.rep_scheme.sequence.captures(text)?;
    let raw = caps.get(1)?;
    RepScheme::new(parse_sequence(raw.as_str())?, raw.as_str())
}

pub fn contains_type_keyword(text: &str) -> bool {
    let patterns = &PATTERNS.workout_type;
    patterns.amrap.is_match(text)
        || patterns.for_time.is_match(text)
        || patterns.emom.is_match(text)
        || patterns.tabata.is_match(text)
        || patterns.rounds.is_match(text)
        || patterns.intervals.is_match(text)
        || patterns.on_off.is_match(text)
}

/// Header indicators: type keyword, time-cap phrase, rep-scheme line or a
/// bare duration line.
pub fn is_header_line(line: &str) -> bool {
    contains_type_keyword(line)
        || extract_time_cap(line).is_some()
        || PATTERNS.rep_scheme.line.is_match(line)
        || PATTERNS.time.duration_line.is_match(line)
}

pub fn contains_injection_marker(text: &str) -> bool {
    PATTERNS.security.injection.is_match(text)
}

pub fn calorie_pairs(text: &str) -> Vec<Spanned<Calories>> {
    PATTERNS
        .load
        .calorie_pair
        .captures_iter(text)
        .filter_map(|caps| {
            let value = cap_u32(&caps, 1)?;
            let scaled = cap_u32(&caps, 2)?;
            Some(Spanned::from_match(
                Calories {
                    value,
                    scaled: Some(scaled),
                },
                caps.get(0)?,
            ))
        })
        .collect()
}

pub fn calorie_singles(text: &str) -> Vec<Spanned<Calories>> {
    PATTERNS
        .load
        .calorie_single
        .captures_iter(text)
        .filter_map(|caps| {
            let value = cap_u32(&caps, 1)?;
            Some(Spanned::from_match(Calories { value, scaled: None }, caps.get(0)?))
        })
        .collect()
}

pub fn heights(text: &str) -> Vec<Spanned<Height>> {
    PATTERNS
        .load
        .height
        .captures_iter(text)
        .filter_map(|caps| {
            let value = cap_f64(&caps, 1)?;
            let unit = match caps.get(3).map(|m| m.as_str().to_lowercase()) {
                Some(unit) if unit == "cm" => HeightUnit::Centimeters,
                _ => HeightUnit::Inches,
            };
            Some(Spanned::from_match(
                Height {
                    value,
                    unit,
                    scaled: cap_f64(&caps, 2),
                },
                caps.get(0)?,
            ))
        })
        .collect()
}

pub fn weight_pairs(text: &str) -> Vec<Spanned<Weight>> {
    PATTERNS
        .load
        .weight_pair
        .captures_iter(text)
        .filter_map(|caps| {
            let full = caps.get(0)?;
            if caps.get(4).is_none()
                && PATTERNS
                    .load
                    .pair_trailing_unit
                    .is_match(&text[full.end()..])
            {
                return None;
            }
            let rx = cap_f64(&caps, 1)?;
            let scaled = cap_f64(&caps, 3)?;
            let rx_unit = caps.get(2).and_then(|m| LoadUnit::from_token(m.as_str()));
            let scaled_unit = caps.get(4).and_then(|m| LoadUnit::from_token(m.as_str()));
            let unit = rx_unit.or(scaled_unit).unwrap_or(LoadUnit::Lb);
            let scaled_unit = scaled_unit.or(rx_unit).unwrap_or(LoadUnit::Lb);
            Some(Spanned::from_match(
                Weight {
                    value: rx,
                    unit,
                    scaled: Some(ScaledWeight {
                        value: scaled,
                        unit: scaled_unit,
                    }),
                },
                full,
            ))
        })
        .collect()
}

pub fn weight_singles(text: &str) -> Vec<Spanned<Weight>> {
    PATTERNS
        .load
        .weight_single
        .captures_iter(text)
        .filter_map(|caps| {
            let value = cap_f64(&caps, 1)?;
            let unit = LoadUnit::from_token(caps.get(2)?.as_str())?;
            Some(Spanned::from_match(
                Weight {
                    value,
                    unit,
                    scaled: None,
                },
                caps.get(0)?,
            ))
        })
        .collect()
}

pub fn percentages(text: &str) -> Vec<Spanned<Weight>> {
    PATTERNS
        .load
        .percentage
        .captures_iter(text)
        .filter_map(|caps| {
            let value = cap_f64(&caps, 1)?;
            Some(Spanned::from_match(
                Weight {
                    value,
                    unit: LoadUnit::Percent,
                    scaled: None,
                },
                caps.get(0)?,
            ))
        })
        .collect()
}

pub fn distances(text: &str) -> Vec<Spanned<Distance>> {
    PATTERNS
        .load
        .distance
        .captures_iter(text)
        .filter_map(|caps| {
            let amount = caps.get(2)?;
            let unit = DistanceUnit::from_token(caps.get(3)?.as_str())?;
            let end = caps.get(0)?.end();
            let denominator: f64 = amount.as_str().parse().ok()?;
            // "1/2 mile" is a fraction; "40/20 m" keeps only the number next to the unit
            match cap_f64(&caps, 1) {
                Some(numerator) if denominator > 0.0 && numerator < denominator => {
                    Some(Spanned {
                        value: Distance {
                            value: numerator / denominator,
                            unit,
                        },
                        start: caps.get(0)?.start(),
                        end,
                    })
                }
                _ => Some(Spanned {
                    value: Distance {
                        value: denominator,
                        unit,
                    },
                    start: amount.start(),
                    end,
                }),
            }
        })
        .collect()
}

/// Durations in seconds: "30 sec", "2 min", "1:30", ":45".
pub fn durations(text: &str) -> Vec<Spanned<u32>> {
    PATTERNS
        .movement
        .duration
        .captures_iter(text)
        .filter_map(|caps| {
            let seconds = if let Some(s) = cap_u32(&caps, 1) {
                s
            } else if let Some(m) = cap_u32(&caps, 2) {
                m * 60
            } else if caps.get(3).is_some() {
                minutes_and_seconds(&caps, 3, 4)?
            } else {
                cap_u32(&caps, 5)?
            };
            Some(Spanned::from_match(seconds, caps.get(0)?))
        })
        .filter(|spanned| spanned.value > 0)
        .collect()
}

pub fn leading_reps(text: &str) -> Option<Spanned<u32>> {
    let caps = PATTERNS.movement.leading_reps.captures(text)?;
    let number = caps.get(1)?;
    let value = number.as_str().parse::<u32>().ok()?;
    let full = caps.get(0)?;
    Some(Spanned {
        value,
        start: number.start(),
        end: full.end(),
    })
}

pub fn trailing_reps(text: &str) -> Option<Spanned<u32>> {
    let caps = PATTERNS.movement.trailing_reps.captures(text)?;
    let value = cap_u32(&caps, 1)?;
    Some(Spanned::from_match(value, caps.get(0)?))
}

/// Parenthetical groups; the span includes the parentheses.
pub fn parentheticals(text: &str) -> Vec<Spanned<String>> {
    PATTERNS
        .movement
        .parenthetical
        .captures_iter(text)
        .filter_map(|caps| {
            let inner = caps.get(1)?.as_str().trim().to_string();
            Some(Spanned::from_match(inner, caps.get(0)?))
        })
        .collect()
}
