//! Movement dictionary collaborator.
//!
//! The engine only depends on [`MovementDictionary`]. Every call may be slow
//! or fail; callers treat a failure as "no match" for the affected line.
//! [`InMemoryMovementDictionary`] is the catalog-backed implementation used
//! by the HTTP service, the CLI and tests.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::DictionaryError;
use crate::model::{MovementCategory, MovementIdentity};

const BUILTIN_CATALOG: &str = include_str!("../data/movements.json");
const MAX_SEARCH_RESULTS: usize = 10;
const MIN_SEARCH_TOKEN_CHARS: usize = 3;

#[async_trait]
pub trait MovementDictionary: Send + Sync {
    /// Exact or alias match; returns the canonical name.
    async fn normalize(&self, name: &str) -> Result<Option<String>, DictionaryError>;

    async fn get_by_canonical_name(
        &self,
        canonical_name: &str,
    ) -> Result<Option<MovementIdentity>, DictionaryError>;

    /// Ranked fuzzy search, best match first. May be empty.
    async fn search(&self, query: &str) -> Result<Vec<MovementIdentity>, DictionaryError>;

    /// Names offered as "did you mean" suggestions.
    async fn known_names(&self) -> Result<Vec<String>, DictionaryError> {
        Ok(Vec::new())
    }
}

/// Lookup key: lowercase, punctuation folded to spaces, single spaces, and a
/// trailing plural `s` dropped per word ("Pull-ups" and "pull up" share a key).
pub fn normalize_key(name: &str) -> String {
    let folded: String = name
        .chars()
        .filter(|c| *c != '\'')
        .map(|c| {
            if c.is_alphanumeric() || c == '&' {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();
    folded
        .split_whitespace()
        .map(singular)
        .collect::<Vec<_>>()
        .join(" ")
}

fn singular(word: &str) -> &str {
    if word.len() > 2 && word.ends_with('s') && !word.ends_with("ss") {
        &word[..word.len() - 1]
    } else {
        word
    }
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    id: String,
    name: String,
    category: MovementCategory,
    #[serde(default)]
    aliases: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct InMemoryMovementDictionary {
    movements: Vec<MovementIdentity>,
    /// Normalized name/alias key → index into `movements`
    keys: HashMap<String, usize>,
}

impl InMemoryMovementDictionary {
    /// The catalog compiled into the crate.
    pub fn builtin() -> Result<Self, DictionaryError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    /// A catalog file, or the built-in catalog when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, DictionaryError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::builtin(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, DictionaryError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, DictionaryError> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(raw)?;
        let mut movements = Vec::with_capacity(entries.len());
        let mut keys = HashMap::new();

        for entry in entries {
            let id = entry.id.trim();
            let name = entry.name.trim();
            if id.is_empty() || name.is_empty() {
                return Err(DictionaryError::Catalog(
                    "movement entries need a non-empty id and name".to_string(),
                ));
            }
            if movements.iter().any(|m: &MovementIdentity| m.id == id) {
                return Err(DictionaryError::Catalog(format!("duplicate movement id '{id}'")));
            }
            let index = movements.len();
            for key in std::iter::once(name)
                .chain(entry.aliases.iter().map(String::as_str))
                .map(normalize_key)
                .filter(|key| !key.is_empty())
            {
                // First claim wins so an alias never shadows another canonical name.
                keys.entry(key).or_insert(index);
            }
            movements.push(MovementIdentity {
                id: id.to_string(),
                canonical_name: name.to_string(),
                category: entry.category,
            });
        }

        Ok(Self { movements, keys })
    }

    pub fn len(&self) -> usize {
        self.movements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movements.is_empty()
    }

    fn lookup(&self, name: &str) -> Option<&MovementIdentity> {
        let key = normalize_key(name);
        self.keys.get(&key).map(|index| &self.movements[*index])
    }

    fn rank(&self, query: &str) -> Vec<MovementIdentity> {
        let query_key = normalize_key(query);
        if query_key.is_empty() {
            return Vec::new();
        }
        let padded_query = format!(" {query_key} ");
        let query_tokens: Vec<&str> = query_key
            .split(' ')
            .filter(|token| token.len() >= MIN_SEARCH_TOKEN_CHARS)
            .collect();

        let mut best: HashMap<usize, (u8, usize)> = HashMap::new();
        for (key, index) in &self.keys {
            let padded_key = format!(" {key} ");
            let score = if *key == query_key {
                Some(0)
            } else if key.starts_with(&format!("{query_key} ")) {
                Some(1)
            } else if padded_key.contains(&padded_query) {
                Some(2)
            } else if padded_query.contains(&padded_key) {
                Some(3)
            } else if !query_tokens.is_empty()
                && query_tokens
                    .iter()
                    .all(|token| key.split(' ').any(|part| part == *token))
            {
                Some(4)
            } else {
                None
            };
            let Some(score) = score else {
                continue;
            };
            let spread = key.len().abs_diff(query_key.len());
            let entry = best.entry(*index).or_insert((score, spread));
            if (score, spread) < *entry {
                *entry = (score, spread);
            }
        }

        let mut ranked: Vec<(usize, (u8, usize))> = best.into_iter().collect();
        ranked.sort_by_key(|(index, rank)| (*rank, *index));
        ranked
            .into_iter()
            .take(MAX_SEARCH_RESULTS)
            .map(|(index, _)| self.movements[index].clone())
            .collect()
    }
}

#[async_trait]
impl MovementDictionary for InMemoryMovementDictionary {
    async fn normalize(&self, name: &str) -> Result<Option<String>, DictionaryError> {
        Ok(self.lookup(name).map(|m| m.canonical_name.clone()))
    }

    async fn get_by_canonical_name(
        &self,
        canonical_name: &str,
    ) -> Result<Option<MovementIdentity>, DictionaryError> {
        let key = normalize_key(canonical_name);
        Ok(self
            .movements
            .iter()
            .find(|m| normalize_key(&m.canonical_name) == key)
            .cloned())
    }

    async fn search(&self, query: &str) -> Result<Vec<MovementIdentity>, DictionaryError> {
        Ok(self.rank(query))
    }

    async fn known_names(&self) -> Result<Vec<String>, DictionaryError> {
        Ok(self
            .movements
            .iter()
            .map(|m| m.canonical_name.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> InMemoryMovementDictionary {
        InMemoryMovementDictionary::builtin().expect("builtin catalog")
    }

    #[test]
    fn normalize_key_folds_case_punctuation_and_plurals() {
        assert_eq!(normalize_key("Pull-ups"), "pull up");
        assert_eq!(normalize_key("  pull   UP "), "pull up");
        assert_eq!(normalize_key("Farmer's Carry"), "farmer carry");
        assert_eq!(normalize_key("Push Press"), "push press");
        assert_eq!(normalize_key("C&J"), "c&j");
    }

    #[test]
    fn builtin_catalog_loads() {
        let dict = catalog();
        assert!(dict.len() > 40);
    }

    #[tokio::test]
    async fn normalize_resolves_names_and_aliases() {
        let dict = catalog();
        assert_eq!(
            dict.normalize("thrusters").await.expect("lookup").as_deref(),
            Some("Thrusters")
        );
        assert_eq!(
            dict.normalize("HSPU").await.expect("lookup").as_deref(),
            Some("Handstand Push-ups")
        );
        assert_eq!(
            dict.normalize("double unders").await.expect("lookup").as_deref(),
            Some("Double-unders")
        );
        assert_eq!(dict.normalize("Burpies").await.expect("lookup"), None);
    }

    #[tokio::test]
    async fn canonical_lookup_returns_identity() {
        let dict = catalog();
        let identity = dict
            .get_by_canonical_name("Air Squats")
            .await
            .expect("lookup")
            .expect("known");
        assert_eq!(identity.id, "air_squat");
        assert_eq!(identity.category, MovementCategory::Gymnastics);
    }

    #[tokio::test]
    async fn search_ranks_contained_names() {
        let dict = catalog();
        let hits = dict.search("strict pull-ups please").await.expect("search");
        assert_eq!(hits.first().map(|m| m.id.as_str()), Some("pull_up"));

        let hits = dict.search("dumbbell push press").await.expect("search");
        assert!(hits.len() >= 2);
        assert_eq!(hits[0].id, "push_press");
    }

    #[tokio::test]
    async fn search_does_not_match_misspellings() {
        let dict = catalog();
        assert!(dict.search("Burpies").await.expect("search").is_empty());
        assert!(dict.search("").await.expect("search").is_empty());
    }

    #[tokio::test]
    async fn known_names_lists_canonical_names() {
        let names = catalog().known_names().await.expect("names");
        assert!(names.iter().any(|n| n == "Burpees"));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let raw = r#"[
            {"id": "a", "name": "A", "category": "other"},
            {"id": "a", "name": "B", "category": "other"}
        ]"#;
        let err = InMemoryMovementDictionary::from_json(raw).expect_err("duplicate");
        assert!(matches!(err, DictionaryError::Catalog(_)));
    }

    #[test]
    fn malformed_catalog_is_a_json_error() {
        let err = InMemoryMovementDictionary::from_json("{").expect_err("bad json");
        assert!(matches!(err, DictionaryError::Json(_)));
    }
}
