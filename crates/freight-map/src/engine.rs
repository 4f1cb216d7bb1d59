//! Suggestion engine implementation.

use std::collections::{BTreeMap, BTreeSet};

use rapidfuzz::distance::levenshtein::distance as levenshtein_distance;
use tracing::debug;

use freight_model::MappingConfiguration;
use freight_schema::{self as schema, normalize_header, tokenize};

use crate::types::{MappingSuggestion, SuggestionResult};

/// Confidence assigned to an exact normalized alias match.
const EXACT_CONFIDENCE: f32 = 1.0;
/// Confidence when the column's canonical token set equals a field's.
const TOKEN_EQUAL_CONFIDENCE: f32 = 0.95;
/// Confidence when one canonical token set contains the other.
const TOKEN_SUBSET_CONFIDENCE: f32 = 0.85;
/// Base confidence for the edit-distance fallback; each unit of distance
/// subtracts [`EDIT_DISTANCE_STEP`].
const EDIT_BASE_CONFIDENCE: f32 = 0.80;
const EDIT_DISTANCE_STEP: f32 = 0.08;
/// Edit-distance fallback bounds: accept only small typos.
const MAX_EDIT_DISTANCE: usize = 2;
const MAX_LENGTH_DELTA: usize = 2;

/// Engine that proposes target fields for source columns.
#[derive(Debug, Clone, Copy)]
pub struct SuggestionEngine {
    min_confidence: f32,
}

impl Default for SuggestionEngine {
    fn default() -> Self {
        Self {
            min_confidence: 0.6,
        }
    }
}

impl SuggestionEngine {
    /// Creates an engine with a custom acceptance threshold.
    pub fn with_min_confidence(min_confidence: f32) -> Self {
        Self { min_confidence }
    }

    /// Suggests one target field per plausible column.
    ///
    /// Columns are processed in header order. A prior configuration pins
    /// columns whose names match a previously confirmed `source_column`
    /// (case-insensitive) to their previous target before the heuristic
    /// tiers run. The result never assigns two columns to the same target
    /// path and never names a path outside the schema registry.
    pub fn suggest(
        &self,
        columns: &[String],
        prior: Option<&MappingConfiguration>,
    ) -> SuggestionResult {
        let mut claimed_targets: BTreeSet<&str> = BTreeSet::new();
        let mut pinned: BTreeMap<usize, MappingSuggestion> = BTreeMap::new();

        if let Some(prior) = prior {
            for (idx, column) in columns.iter().enumerate() {
                let Some(previous) = prior
                    .mappings
                    .iter()
                    .find(|m| m.source_column.eq_ignore_ascii_case(column.trim()))
                else {
                    continue;
                };
                // A stale path from an older schema is dropped rather than
                // carried into a new mapping.
                let Some(spec) = schema::field(&previous.target_path) else {
                    debug!(
                        column = column.as_str(),
                        target = previous.target_path.as_str(),
                        "prior mapping targets a path no longer in the schema"
                    );
                    continue;
                };
                if !claimed_targets.insert(spec.path) {
                    continue;
                }
                pinned.insert(
                    idx,
                    MappingSuggestion {
                        source_column: column.trim().to_string(),
                        target_path: spec.path.to_string(),
                        confidence: EXACT_CONFIDENCE,
                        pinned: true,
                    },
                );
            }
        }

        let mut suggestions = Vec::new();
        let mut unmapped = Vec::new();

        for (idx, column) in columns.iter().enumerate() {
            if let Some(suggestion) = pinned.remove(&idx) {
                suggestions.push(suggestion);
                continue;
            }
            match self.best_candidate(column, &claimed_targets) {
                Some((path, confidence)) => {
                    claimed_targets.insert(path);
                    suggestions.push(MappingSuggestion {
                        source_column: column.trim().to_string(),
                        target_path: path.to_string(),
                        confidence,
                        pinned: false,
                    });
                }
                None => unmapped.push(column.clone()),
            }
        }

        let unmatched_required = schema::required_fields()
            .into_iter()
            .filter(|path| !claimed_targets.contains(path))
            .map(str::to_string)
            .collect();

        SuggestionResult {
            suggestions,
            unmatched_required,
            unmapped_columns: unmapped,
        }
    }

    /// Best unclaimed target for a column, or `None` below the threshold.
    ///
    /// Ties are broken by earlier schema declaration order, which is the
    /// iteration order here.
    fn best_candidate(
        &self,
        column: &str,
        claimed: &BTreeSet<&str>,
    ) -> Option<(&'static str, f32)> {
        let normalized = normalize_header(column);
        if normalized.is_empty() {
            return None;
        }
        let column_tokens: BTreeSet<String> = tokenize(column).into_iter().collect();

        let exact: BTreeMap<&str, f32> = schema::resolve_aliases(column).into_iter().collect();

        let mut best: Option<(&'static str, f32)> = None;
        for spec in schema::fields() {
            if claimed.contains(spec.path) {
                continue;
            }
            let confidence = match exact.get(spec.path) {
                Some(_) => EXACT_CONFIDENCE,
                None => score_field(&normalized, &column_tokens, spec),
            };
            if confidence < self.min_confidence {
                continue;
            }
            if best.is_none_or(|(_, current)| confidence > current) {
                best = Some((spec.path, confidence));
            }
        }
        best
    }
}

/// Scores a column against one field via the token and edit-distance tiers.
fn score_field(
    normalized_column: &str,
    column_tokens: &BTreeSet<String>,
    spec: &schema::FieldSpec,
) -> f32 {
    let mut best = 0.0f32;

    for alias in spec.aliases {
        let alias_tokens: BTreeSet<String> = tokenize(alias).into_iter().collect();
        if !alias_tokens.is_empty() && !column_tokens.is_empty() {
            if alias_tokens == *column_tokens {
                best = best.max(TOKEN_EQUAL_CONFIDENCE);
                continue;
            }
            if alias_tokens.is_subset(column_tokens) || column_tokens.is_subset(&alias_tokens) {
                best = best.max(TOKEN_SUBSET_CONFIDENCE);
                continue;
            }
        }

        let normalized_alias = normalize_header(alias);
        let length_delta = normalized_alias
            .chars()
            .count()
            .abs_diff(normalized_column.chars().count());
        if length_delta > MAX_LENGTH_DELTA {
            continue;
        }
        let distance =
            levenshtein_distance(normalized_column.chars(), normalized_alias.chars());
        if distance > MAX_EDIT_DISTANCE {
            continue;
        }
        best = best.max(EDIT_BASE_CONFIDENCE - EDIT_DISTANCE_STEP * distance as f32);
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    #[test]
    fn exact_alias_beats_token_match() {
        let engine = SuggestionEngine::default();
        let result = engine.suggest(&columns(&["load number"]), None);
        assert_eq!(result.suggestions.len(), 1);
        let suggestion = &result.suggestions[0];
        assert_eq!(suggestion.target_path, "load.brokerageLoadId");
        assert!((suggestion.confidence - EXACT_CONFIDENCE).abs() < f32::EPSILON);
    }

    #[test]
    fn typo_matches_through_edit_distance() {
        let engine = SuggestionEngine::default();
        // "pickup citty" is distance 1 from the "pickup city" alias.
        let result = engine.suggest(&columns(&["pickup citty"]), None);
        assert_eq!(result.suggestions.len(), 1);
        assert_eq!(
            result.suggestions[0].target_path,
            "load.pickups.0.address.city"
        );
        assert!(result.suggestions[0].confidence < TOKEN_SUBSET_CONFIDENCE);
    }

    #[test]
    fn unmatched_required_fields_are_reported() {
        let engine = SuggestionEngine::default();
        let result = engine.suggest(&columns(&["load_id"]), None);
        assert!(
            result
                .unmatched_required
                .contains(&"load.pickups.0.address.city".to_string())
        );
        assert!(
            !result
                .unmatched_required
                .contains(&"load.brokerageLoadId".to_string())
        );
    }

    #[test]
    fn gibberish_is_left_unmapped() {
        let engine = SuggestionEngine::default();
        let result = engine.suggest(&columns(&["zzzzqqq"]), None);
        assert!(result.suggestions.is_empty());
        assert_eq!(result.unmapped_columns, vec!["zzzzqqq".to_string()]);
    }
}
