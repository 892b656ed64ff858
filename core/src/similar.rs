use std::collections::{HashMap, HashSet};

use strsim::levenshtein;

pub const DEFAULT_MAX_SUGGESTIONS: usize = 3;
const DEFAULT_MAX_COMPARE_CHARS: usize = 64;
const DISTANCE_RATIO: f64 = 0.4;
const MIN_DISTANCE: usize = 1;
const MAX_DISTANCE: usize = 8;

/// Bounded edit-distance suggestions ("did you mean") over a name list.
#[derive(Debug, Clone, Copy)]
pub struct SimilarNameFinder {
    max_results: usize,
    max_compare_chars: usize,
}

impl Default for SimilarNameFinder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SUGGESTIONS)
    }
}

impl SimilarNameFinder {
    pub fn new(max_results: usize) -> Self {
        Self {
            max_results,
            max_compare_chars: DEFAULT_MAX_COMPARE_CHARS,
        }
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Up to `max_results` names ordered by edit distance; ties keep
    /// candidate order. Comparison is case-insensitive.
    pub fn find<'a, I>(&self, target: &str, candidates: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if self.max_results == 0 {
            return Vec::new();
        }
        let needle = self.prepare(target);
        if needle.is_empty() {
            return Vec::new();
        }
        let needle_len = needle.chars().count();

        let literal = target.trim();
        let mut seen = HashSet::new();
        // prepared key -> index in `scored`, so a literal match can replace a case variant
        let mut kept: HashMap<String, usize> = HashMap::new();
        let mut scored: Vec<(usize, String)> = Vec::new();
        let mut exact = 0usize;
        let mut literal_kept = false;

        for candidate in candidates {
            let prepared = self.prepare(candidate);
            if prepared.is_empty() {
                continue;
            }
            let is_literal = candidate.trim() == literal;
            if !seen.insert(prepared.clone()) {
                if is_literal {
                    if let Some(&index) = kept.get(&prepared) {
                        scored[index].1 = literal.to_string();
                        literal_kept = true;
                    }
                }
                continue;
            }
            let candidate_len = prepared.chars().count();
            let threshold = threshold_for(needle_len.max(candidate_len));
            if needle_len.abs_diff(candidate_len) > threshold {
                continue;
            }
            let distance = levenshtein(&needle, &prepared);
            if distance > threshold {
                continue;
            }
            kept.insert(prepared, scored.len());
            scored.push((distance, candidate.trim().to_string()));
            literal_kept |= is_literal;
            if distance == 0 {
                exact += 1;
                if exact >= self.max_results && literal_kept {
                    break;
                }
            }
        }

        scored.sort_by_key(|(distance, _)| *distance);
        scored
            .into_iter()
            .take(self.max_results)
            .map(|(_, name)| name)
            .collect()
    }

    fn prepare(&self, value: &str) -> String {
        value
            .trim()
            .to_lowercase()
            .chars()
            .take(self.max_compare_chars)
            .collect()
    }
}

fn threshold_for(longer: usize) -> usize {
    let scaled = (longer as f64 * DISTANCE_RATIO).floor() as usize;
    scaled.clamp(MIN_DISTANCE, MAX_DISTANCE)
}
