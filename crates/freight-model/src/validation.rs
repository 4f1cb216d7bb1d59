//! Per-record validation results.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a mapped field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvalidReason {
    /// Required field is empty or whitespace-only.
    MissingRequired,
    /// Date is not in `YYYY-MM-DD` form.
    DateFormat { value: String },
    /// Date parses structurally but names a day that does not exist.
    ImpossibleDate { value: String },
    /// Number has a currency symbol, thousands separator, or is not decimal.
    NotANumber { value: String },
    /// Value is outside the field's accepted enum values.
    NotInEnum { value: String },
    /// Load reference already seen earlier in the batch.
    DuplicateReference { value: String, first_index: usize },
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRequired => write!(f, "required value is missing"),
            Self::DateFormat { value } => {
                write!(f, "'{value}' is not a date in YYYY-MM-DD format")
            }
            Self::ImpossibleDate { value } => write!(f, "'{value}' is not a real calendar date"),
            Self::NotANumber { value } => write!(f, "'{value}' is not a plain decimal number"),
            Self::NotInEnum { value } => write!(f, "'{value}' is not an accepted value"),
            Self::DuplicateReference { value, first_index } => write!(
                f,
                "reference '{value}' already used by record {first_index}"
            ),
        }
    }
}

/// One field-level diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub target_path: String,
    pub reason: InvalidReason,
}

/// Outcome of validating a single record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Position of the record in the uploaded batch.
    pub record_index: usize,
    /// True only when no rule produced a field error.
    pub ok: bool,
    /// Field errors in rule-application order.
    pub field_errors: Vec<FieldError>,
}

impl ValidationResult {
    pub fn passed(record_index: usize) -> Self {
        Self {
            record_index,
            ok: true,
            field_errors: Vec::new(),
        }
    }

    pub fn failed(record_index: usize, field_errors: Vec<FieldError>) -> Self {
        Self {
            record_index,
            ok: false,
            field_errors,
        }
    }
}
