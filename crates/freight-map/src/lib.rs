//! Suggests mappings from spreadsheet headers to target API fields.
//!
//! The engine is pure: given a header row (and optionally the brokerage's
//! previous configuration), it proposes one target field per plausible
//! column and reports which required fields found no source. The caller
//! confirms or overrides the proposal before anything is persisted.

mod engine;
mod types;

pub use engine::SuggestionEngine;
pub use types::{MappingSuggestion, SuggestionResult};
