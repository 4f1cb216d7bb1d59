//! Validates mapped upload records against the target schema's rules.
//!
//! Validation is a pure function of the confirmed mapping and the records:
//! nothing is mutated, results preserve input order, and a record is `ok`
//! only when every rule passes. The duplicate-reference rule needs one
//! pass over the whole batch first; everything else is per-record.

mod rules;

use std::collections::BTreeMap;

use tracing::debug;

use freight_model::{FieldError, FieldMapping, InvalidReason, UploadRecord, ValidationResult};
use freight_schema::{self as schema, FieldType, REFERENCE_PATH};

use crate::rules::{check_date, check_enum, check_number};

/// Validates every record against the mapping, in input order.
///
/// # Panics
///
/// Panics when a mapping entry names a target path outside the schema
/// registry. Mappings are confirmed against the registry before they reach
/// validation, so that is a caller bug.
pub fn validate_records(
    mappings: &[FieldMapping],
    records: &[UploadRecord],
) -> Vec<ValidationResult> {
    let reference_column = mappings
        .iter()
        .find(|mapping| mapping.target_path == REFERENCE_PATH)
        .map(|mapping| mapping.source_column.as_str());

    // First pass: the batch index of each reference value's first use.
    let mut first_seen: BTreeMap<&str, usize> = BTreeMap::new();
    if let Some(column) = reference_column {
        for (index, record) in records.iter().enumerate() {
            if let Some(value) = record.get_trimmed(column) {
                first_seen.entry(value).or_insert(index);
            }
        }
    }

    let mut results = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let mut errors = Vec::new();
        for mapping in mappings {
            check_field(mapping, record, index, &first_seen, &mut errors);
        }
        if errors.is_empty() {
            results.push(ValidationResult::passed(index));
        } else {
            debug!(record = index, errors = errors.len(), "record failed validation");
            results.push(ValidationResult::failed(index, errors));
        }
    }
    results
}

fn check_field(
    mapping: &FieldMapping,
    record: &UploadRecord,
    record_index: usize,
    first_seen: &BTreeMap<&str, usize>,
    errors: &mut Vec<FieldError>,
) {
    let path = mapping.target_path.as_str();
    let field_type = schema::field_type(path);

    let Some(value) = record.get_trimmed(&mapping.source_column) else {
        if mapping.required {
            errors.push(FieldError {
                target_path: path.to_string(),
                reason: InvalidReason::MissingRequired,
            });
        }
        return;
    };

    let type_error = match field_type {
        FieldType::Text => None,
        FieldType::Date => check_date(value),
        FieldType::Number => check_number(value),
        FieldType::Enum => check_enum(path, value),
    };
    if let Some(reason) = type_error {
        errors.push(FieldError {
            target_path: path.to_string(),
            reason,
        });
    }

    // Second and later uses of a reference value fail; the first use is
    // left untouched.
    if path == REFERENCE_PATH
        && let Some(&first_index) = first_seen.get(value)
        && first_index < record_index
    {
        errors.push(FieldError {
            target_path: path.to_string(),
            reason: InvalidReason::DuplicateReference {
                value: value.to_string(),
                first_index,
            },
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;

    fn mapping(source: &str, target: &str, required: bool) -> FieldMapping {
        FieldMapping {
            source_column: source.to_string(),
            target_path: target.to_string(),
            required,
        }
    }

    fn record(pairs: &[(&str, &str)]) -> UploadRecord {
        let values: Map<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        UploadRecord::new(values)
    }

    #[test]
    fn missing_required_value_fails() {
        let mappings = vec![mapping("ref", "load.brokerageLoadId", true)];
        let results = validate_records(&mappings, &[record(&[("ref", "   ")])]);
        assert!(!results[0].ok);
        assert_eq!(
            results[0].field_errors[0].reason,
            InvalidReason::MissingRequired
        );
    }

    #[test]
    fn empty_optional_value_passes() {
        let mappings = vec![mapping("weight", "load.items.0.totalWeightLbs", false)];
        let results = validate_records(&mappings, &[record(&[("weight", "")])]);
        assert!(results[0].ok);
    }

    #[test]
    fn results_preserve_input_order() {
        let mappings = vec![mapping("ref", "load.brokerageLoadId", true)];
        let records = vec![
            record(&[("ref", "L-2")]),
            record(&[("ref", "")]),
            record(&[("ref", "L-1")]),
        ];
        let results = validate_records(&mappings, &records);
        let indices: Vec<usize> = results.iter().map(|r| r.record_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(results[0].ok);
        assert!(!results[1].ok);
        assert!(results[2].ok);
    }
}
