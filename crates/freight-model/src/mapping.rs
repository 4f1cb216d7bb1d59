//! Mapping configuration types shared across the workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One column-to-field association inside a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Column name as it appears in the source file header.
    pub source_column: String,
    /// Dotted locator of the target API field (e.g. `load.pickups.0.address.city`).
    pub target_path: String,
    /// Whether an empty source value fails validation.
    pub required: bool,
}

/// Credential for the load-submission API.
///
/// The token is stored only as an encryption envelope; plaintext never
/// appears in this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCredential {
    /// Base URL of the remote API.
    pub base_url: String,
    /// Encrypted API token envelope (`enc:v1:<key-id>:<nonce>:<ciphertext>`).
    pub encrypted_token: String,
}

/// A named, reusable mapping owned by one brokerage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingConfiguration {
    /// Owning brokerage name.
    pub brokerage: String,
    /// Configuration name, unique within the brokerage.
    pub name: String,
    /// Optional operator-facing description.
    pub description: Option<String>,
    /// Confirmed column-to-field mappings.
    pub mappings: Vec<FieldMapping>,
    /// Encrypted API credential owned by this configuration.
    pub credential: ApiCredential,
    /// Header row the mapping was built from, for drift detection.
    pub source_headers: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Monotonically increasing version, checked on every update.
    pub version: u64,
}

impl MappingConfiguration {
    /// Returns the mapping entry targeting `path`, if present.
    pub fn mapping_for(&self, path: &str) -> Option<&FieldMapping> {
        self.mappings.iter().find(|m| m.target_path == path)
    }

    /// Compares the stored header row against a newly uploaded one.
    ///
    /// Returns `(added, removed)` column names. Comparison is
    /// case-insensitive on trimmed names; ordering changes are not drift.
    pub fn compare_headers(&self, current: &[String]) -> (Vec<String>, Vec<String>) {
        let saved: Vec<String> = self
            .source_headers
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        let now: Vec<String> = current.iter().map(|h| h.trim().to_lowercase()).collect();

        let added = current
            .iter()
            .zip(&now)
            .filter(|(_, norm)| !saved.contains(norm))
            .map(|(raw, _)| raw.clone())
            .collect();
        let removed = self
            .source_headers
            .iter()
            .zip(&saved)
            .filter(|(_, norm)| !now.contains(norm))
            .map(|(raw, _)| raw.clone())
            .collect();
        (added, removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config(headers: &[&str]) -> MappingConfiguration {
        MappingConfiguration {
            brokerage: "Acme".to_string(),
            name: "std".to_string(),
            description: None,
            mappings: vec![],
            credential: ApiCredential {
                base_url: "https://api.example.com".to_string(),
                encrypted_token: "enc:v1:k1:n:c".to_string(),
            },
            source_headers: headers.iter().map(|h| (*h).to_string()).collect(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 1,
        }
    }

    #[test]
    fn header_drift_reports_added_and_removed() {
        let config = sample_config(&["load_id", "origin_city"]);
        let current = vec!["Load_ID".to_string(), "dest_city".to_string()];
        let (added, removed) = config.compare_headers(&current);
        assert_eq!(added, vec!["dest_city".to_string()]);
        assert_eq!(removed, vec!["origin_city".to_string()]);
    }

    #[test]
    fn reordered_headers_are_not_drift() {
        let config = sample_config(&["a", "b"]);
        let current = vec!["b".to_string(), "a".to_string()];
        let (added, removed) = config.compare_headers(&current);
        assert!(added.is_empty());
        assert!(removed.is_empty());
    }
}
