//! Transient upload data handed in from the file-upload boundary.
//!
//! The core never parses CSV or Excel itself; callers deliver a header row
//! plus data rows and these types carry them through one
//! upload/validate/submit cycle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One row of source data, keyed by source column name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    values: BTreeMap<String, String>,
}

impl UploadRecord {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    /// Raw value for a source column, if the column exists in this row.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    /// Value for a source column with surrounding whitespace trimmed,
    /// or `None` when the column is absent or blank.
    pub fn get_trimmed(&self, column: &str) -> Option<&str> {
        self.get(column)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// An ordered batch of upload records plus the header row they came from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadTable {
    pub headers: Vec<String>,
    pub records: Vec<UploadRecord>,
}

impl UploadTable {
    /// Builds a table from the raw `(header row, data rows)` shape the
    /// upload boundary produces. Rows shorter than the header are padded
    /// with empty values; extra cells beyond the header are dropped.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let records = rows
            .into_iter()
            .map(|row| {
                let mut values = BTreeMap::new();
                for (idx, header) in headers.iter().enumerate() {
                    let value = row.get(idx).cloned().unwrap_or_default();
                    values.insert(header.clone(), value);
                }
                UploadRecord::new(values)
            })
            .collect();
        Self { headers, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
