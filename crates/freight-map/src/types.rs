//! Suggestion output types.

use serde::{Deserialize, Serialize};

use freight_model::FieldMapping;
use freight_schema as schema;

/// A proposed mapping from one source column to one target field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingSuggestion {
    /// Source column name, as it appeared in the header row.
    pub source_column: String,
    /// Target field path from the schema registry.
    pub target_path: String,
    /// Match confidence in `0.0..=1.0`.
    pub confidence: f32,
    /// True when the column was pinned from a prior configuration rather
    /// than matched heuristically.
    pub pinned: bool,
}

/// Result of one suggestion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestionResult {
    /// Accepted suggestions, one per matched column, in header order.
    pub suggestions: Vec<MappingSuggestion>,
    /// Required target fields no column matched.
    pub unmatched_required: Vec<String>,
    /// Columns that matched nothing above the acceptance threshold.
    pub unmapped_columns: Vec<String>,
}

impl SuggestionResult {
    /// Converts accepted suggestions into confirmed field mappings, taking
    /// each field's required flag from the registry.
    pub fn to_field_mappings(&self) -> Vec<FieldMapping> {
        self.suggestions
            .iter()
            .map(|suggestion| FieldMapping {
                source_column: suggestion.source_column.clone(),
                target_path: suggestion.target_path.clone(),
                required: schema::field(&suggestion.target_path)
                    .is_some_and(|spec| spec.required),
            })
            .collect()
    }
}
