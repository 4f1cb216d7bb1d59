use std::collections::BTreeMap;

use freight_model::{FieldMapping, InvalidReason, UploadRecord, UploadTable};
use freight_validate::validate_records;

fn mapping(source: &str, target: &str, required: bool) -> FieldMapping {
    FieldMapping {
        source_column: source.to_string(),
        target_path: target.to_string(),
        required,
    }
}

fn record(pairs: &[(&str, &str)]) -> UploadRecord {
    let values: BTreeMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    UploadRecord::new(values)
}

fn standard_mappings() -> Vec<FieldMapping> {
    vec![
        mapping("load_id", "load.brokerageLoadId", true),
        mapping("pickup_date", "load.pickups.0.scheduledDate", true),
        mapping("weight", "load.items.0.totalWeightLbs", false),
        mapping("mode", "load.mode", true),
    ]
}

#[test]
fn us_style_date_is_rejected_not_coerced() {
    let mappings = standard_mappings();
    let records = vec![record(&[
        ("load_id", "L100"),
        ("pickup_date", "03/15/2024"),
        ("weight", "1200"),
        ("mode", "FTL"),
    ])];
    let results = validate_records(&mappings, &records);
    assert!(!results[0].ok);
    let error = &results[0].field_errors[0];
    assert_eq!(error.target_path, "load.pickups.0.scheduledDate");
    assert!(matches!(
        error.reason,
        InvalidReason::DateFormat { ref value } if value == "03/15/2024"
    ));
}

#[test]
fn duplicate_reference_fails_second_occurrence_only() {
    let mappings = standard_mappings();
    let records = vec![
        record(&[("load_id", "L1"), ("pickup_date", "2024-03-15"), ("mode", "FTL")]),
        record(&[("load_id", "L2"), ("pickup_date", "2024-03-15"), ("mode", "FTL")]),
        record(&[("load_id", "L1"), ("pickup_date", "2024-03-16"), ("mode", "FTL")]),
        record(&[("load_id", "L1"), ("pickup_date", "2024-03-17"), ("mode", "FTL")]),
    ];
    let results = validate_records(&mappings, &records);
    assert!(results[0].ok, "first occurrence stays valid");
    assert!(results[1].ok);
    for dup in [&results[2], &results[3]] {
        assert!(!dup.ok);
        assert!(dup.field_errors.iter().any(|e| matches!(
            e.reason,
            InvalidReason::DuplicateReference { ref value, first_index: 0 } if value == "L1"
        )));
    }
}

#[test]
fn never_marks_two_identical_references_ok() {
    let mappings = vec![mapping("load_id", "load.brokerageLoadId", true)];
    let records = vec![
        record(&[("load_id", "SAME")]),
        record(&[("load_id", "SAME")]),
    ];
    let results = validate_records(&mappings, &records);
    let ok_count = results.iter().filter(|r| r.ok).count();
    assert_eq!(ok_count, 1);
}

#[test]
fn multiple_rules_accumulate_field_errors() {
    let mappings = standard_mappings();
    let records = vec![record(&[
        ("load_id", ""),
        ("pickup_date", "2024-02-30"),
        ("weight", "$1,200"),
        ("mode", "parcel"),
    ])];
    let results = validate_records(&mappings, &records);
    assert!(!results[0].ok);
    let reasons: Vec<&InvalidReason> =
        results[0].field_errors.iter().map(|e| &e.reason).collect();
    assert_eq!(reasons.len(), 4);
    assert!(matches!(reasons[0], InvalidReason::MissingRequired));
    assert!(matches!(reasons[1], InvalidReason::ImpossibleDate { .. }));
    assert!(matches!(reasons[2], InvalidReason::NotANumber { .. }));
    assert!(matches!(reasons[3], InvalidReason::NotInEnum { .. }));
}

#[test]
fn table_built_from_raw_rows_validates_end_to_end() {
    let table = UploadTable::from_rows(
        vec!["load_id".to_string(), "mode".to_string()],
        vec![
            vec!["L1".to_string(), "Full Truckload".to_string()],
            vec!["L2".to_string(), "ltl".to_string()],
        ],
    );
    let mappings = vec![
        mapping("load_id", "load.brokerageLoadId", true),
        mapping("mode", "load.mode", true),
    ];
    let results = validate_records(&mappings, &table.records);
    assert!(results.iter().all(|r| r.ok));
}
