//! Field-level rule implementations.

use chrono::NaiveDate;

use freight_model::InvalidReason;
use freight_schema as schema;

/// Dates must be `YYYY-MM-DD`. A structurally valid string naming a day
/// that does not exist (month 13, day 32) is reported separately from a
/// wrong format, so the operator knows whether to fix the column format
/// or the cell.
pub(crate) fn check_date(value: &str) -> Option<InvalidReason> {
    let bytes = value.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| matches!(i, 4 | 7) || b.is_ascii_digit());
    if !well_formed {
        return Some(InvalidReason::DateFormat {
            value: value.to_string(),
        });
    }

    // The slices are all-digit by the check above, so parsing cannot fail.
    let year: i32 = value[0..4].parse().unwrap_or_default();
    let month: u32 = value[5..7].parse().unwrap_or_default();
    let day: u32 = value[8..10].parse().unwrap_or_default();
    if NaiveDate::from_ymd_opt(year, month, day).is_none() {
        return Some(InvalidReason::ImpossibleDate {
            value: value.to_string(),
        });
    }
    None
}

/// Numbers must be plain decimals: optional sign, digits, at most one
/// decimal point. Currency symbols and thousands separators are rejected,
/// never stripped.
pub(crate) fn check_number(value: &str) -> Option<InvalidReason> {
    let body = value.strip_prefix('-').unwrap_or(value);
    let mut digits = 0usize;
    let mut dots = 0usize;
    for ch in body.chars() {
        match ch {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => {
                return Some(InvalidReason::NotANumber {
                    value: value.to_string(),
                });
            }
        }
    }
    if digits == 0 || dots > 1 || value.parse::<f64>().is_err() {
        return Some(InvalidReason::NotANumber {
            value: value.to_string(),
        });
    }
    None
}

/// Enum values must canonicalize to one of the field's accepted values.
pub(crate) fn check_enum(path: &str, value: &str) -> Option<InvalidReason> {
    if schema::canonicalize_enum(path, value).is_none() {
        return Some(InvalidReason::NotInEnum {
            value: value.to_string(),
        });
    }
    None
}
