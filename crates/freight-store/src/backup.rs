//! Snapshot export and restore.
//!
//! A snapshot is one portable JSON document holding every brokerage and
//! configuration, credentials still as ciphertext, with a format version
//! and an integrity checksum. `Replace` restores are all-or-nothing: the
//! incoming content is fully validated and staged before the store's
//! content is swapped. `Merge` restores apply each configuration as an
//! ordinary optimistic-concurrency write and report per-item outcomes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use freight_model::MappingConfiguration;

use crate::crypto::is_envelope;
use crate::error::{Result, StoreError};
use crate::store::{AuditEntry, AuditOperation, ConfigStore};

/// Format version written by [`ConfigStore::export`].
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;
/// Oldest format version [`ConfigStore::restore`] still reads.
pub const MIN_SUPPORTED_SNAPSHOT_VERSION: u32 = 1;

/// One brokerage with all of its configurations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerageSnapshot {
    pub name: String,
    pub configurations: Vec<MappingConfiguration>,
}

/// Full serialized store state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub format_version: u32,
    pub exported_at: DateTime<Utc>,
    /// SHA-256 over the serialized `brokerages` payload.
    pub checksum: String,
    pub brokerages: Vec<BrokerageSnapshot>,
}

/// How restore treats existing store content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestoreMode {
    /// Discard current content and adopt the snapshot wholesale.
    Replace,
    /// Apply each snapshot configuration as a version-checked write,
    /// skipping items that conflict with newer saves.
    Merge,
}

/// What happened to one configuration during restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestoreOutcome {
    /// Adopted as part of a `Replace` restore.
    Restored,
    /// Merged over the existing configuration of the same version.
    Updated,
    /// Did not exist in the store; inserted as-is.
    Created,
    /// Left untouched, with the reason.
    Skipped { reason: String },
}

/// Per-configuration restore record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreItem {
    pub brokerage: String,
    pub name: String,
    pub outcome: RestoreOutcome,
}

/// Itemized result of a restore.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestoreReport {
    pub items: Vec<RestoreItem>,
}

impl RestoreReport {
    pub fn applied(&self) -> usize {
        self.items
            .iter()
            .filter(|item| !matches!(item.outcome, RestoreOutcome::Skipped { .. }))
            .count()
    }

    pub fn skipped(&self) -> Vec<&RestoreItem> {
        self.items
            .iter()
            .filter(|item| matches!(item.outcome, RestoreOutcome::Skipped { .. }))
            .collect()
    }
}

impl ConfigStore {
    /// Exports the full store as a snapshot, credentials untouched as
    /// ciphertext. The read holds the shared lock only long enough to
    /// clone; writers queue briefly rather than for the whole export.
    pub fn export(&self) -> Result<Snapshot> {
        let brokerages: Vec<BrokerageSnapshot> = {
            let inner = self.read_lock();
            inner
                .brokerages()
                .iter()
                .map(|(name, configs)| BrokerageSnapshot {
                    name: name.clone(),
                    configurations: configs.values().cloned().collect(),
                })
                .collect()
        };
        let checksum = payload_checksum(&brokerages)?;
        let snapshot = Snapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            exported_at: Utc::now(),
            checksum,
            brokerages,
        };
        info!(
            brokerages = snapshot.brokerages.len(),
            "store exported to snapshot"
        );
        Ok(snapshot)
    }

    /// Restores a snapshot in the requested mode.
    ///
    /// Validation (format version, checksum, structure) happens before
    /// any mutation; a rejected snapshot leaves the store untouched.
    pub fn restore(&self, snapshot: &Snapshot, mode: RestoreMode) -> Result<RestoreReport> {
        validate_snapshot(snapshot)?;
        match mode {
            RestoreMode::Replace => self.restore_replace(snapshot),
            RestoreMode::Merge => Ok(self.restore_merge(snapshot)),
        }
    }

    fn restore_replace(&self, snapshot: &Snapshot) -> Result<RestoreReport> {
        // Stage the full content first; the store is swapped only once
        // everything has been materialized.
        let mut staged: BTreeMap<String, BTreeMap<String, MappingConfiguration>> = BTreeMap::new();
        let mut report = RestoreReport::default();
        for brokerage in &snapshot.brokerages {
            let configs = staged.entry(brokerage.name.clone()).or_default();
            for config in &brokerage.configurations {
                configs.insert(config.name.clone(), config.clone());
                report.items.push(RestoreItem {
                    brokerage: brokerage.name.clone(),
                    name: config.name.clone(),
                    outcome: RestoreOutcome::Restored,
                });
            }
        }

        let now = Utc::now();
        let mut inner = self.write_lock();
        inner.replace_content(staged);
        for item in &report.items {
            inner.push_audit(AuditEntry {
                brokerage: item.brokerage.clone(),
                configuration: item.name.clone(),
                operation: AuditOperation::Restored,
                at: now,
            });
        }
        drop(inner);

        info!(restored = report.items.len(), "store replaced from snapshot");
        Ok(report)
    }

    fn restore_merge(&self, snapshot: &Snapshot) -> RestoreReport {
        let mut report = RestoreReport::default();
        for brokerage in &snapshot.brokerages {
            for config in &brokerage.configurations {
                let outcome = self.merge_one(config);
                if let RestoreOutcome::Skipped { reason } = &outcome {
                    warn!(
                        brokerage = brokerage.name.as_str(),
                        configuration = config.name.as_str(),
                        reason = reason.as_str(),
                        "merge restore skipped configuration"
                    );
                }
                report.items.push(RestoreItem {
                    brokerage: brokerage.name.clone(),
                    name: config.name.clone(),
                    outcome,
                });
            }
        }
        info!(
            applied = report.applied(),
            skipped = report.skipped().len(),
            "merge restore finished"
        );
        report
    }

    /// Applies one snapshot configuration with the same optimistic
    /// concurrency as an ordinary update: the snapshot's version is the
    /// expected version, and a mismatch skips the item.
    fn merge_one(&self, config: &MappingConfiguration) -> RestoreOutcome {
        let now = Utc::now();
        let mut inner = self.write_lock();
        let stored_version = inner
            .config_mut(&config.brokerage, &config.name)
            .map(|stored| stored.version);

        let outcome = match stored_version {
            Some(actual) if actual != config.version => {
                return RestoreOutcome::Skipped {
                    reason: format!(
                        "version conflict: snapshot has {}, store has {actual}",
                        config.version
                    ),
                };
            }
            Some(_) => {
                let stored = inner
                    .config_mut(&config.brokerage, &config.name)
                    .expect("configuration checked above");
                stored.description = config.description.clone();
                stored.mappings = config.mappings.clone();
                stored.credential = config.credential.clone();
                stored.source_headers = config.source_headers.clone();
                stored.updated_at = now;
                stored.version += 1;
                RestoreOutcome::Updated
            }
            None => {
                inner.insert_config(config.clone());
                RestoreOutcome::Created
            }
        };
        inner.push_audit(AuditEntry {
            brokerage: config.brokerage.clone(),
            configuration: config.name.clone(),
            operation: AuditOperation::Restored,
            at: now,
        });
        outcome
    }
}

/// Structural and integrity validation, run before any restore mutation.
fn validate_snapshot(snapshot: &Snapshot) -> Result<()> {
    if snapshot.format_version < MIN_SUPPORTED_SNAPSHOT_VERSION
        || snapshot.format_version > SNAPSHOT_FORMAT_VERSION
    {
        return Err(StoreError::UnsupportedSnapshotVersion {
            found: snapshot.format_version,
            min: MIN_SUPPORTED_SNAPSHOT_VERSION,
            max: SNAPSHOT_FORMAT_VERSION,
        });
    }

    let checksum = payload_checksum(&snapshot.brokerages)?;
    if checksum != snapshot.checksum {
        return Err(StoreError::SnapshotFormat {
            reason: "integrity checksum does not match the payload".to_string(),
        });
    }

    let mut seen_brokerages = Vec::new();
    for brokerage in &snapshot.brokerages {
        if brokerage.name.trim().is_empty() {
            return Err(StoreError::SnapshotFormat {
                reason: "brokerage with empty name".to_string(),
            });
        }
        if seen_brokerages.contains(&&brokerage.name) {
            return Err(StoreError::SnapshotFormat {
                reason: format!("duplicate brokerage '{}'", brokerage.name),
            });
        }
        seen_brokerages.push(&brokerage.name);

        let mut seen_configs = Vec::new();
        for config in &brokerage.configurations {
            if config.name.trim().is_empty() {
                return Err(StoreError::SnapshotFormat {
                    reason: format!("brokerage '{}' has a configuration with an empty name", brokerage.name),
                });
            }
            if config.brokerage != brokerage.name {
                return Err(StoreError::SnapshotFormat {
                    reason: format!(
                        "configuration '{}' claims brokerage '{}' but sits under '{}'",
                        config.name, config.brokerage, brokerage.name
                    ),
                });
            }
            if seen_configs.contains(&&config.name) {
                return Err(StoreError::SnapshotFormat {
                    reason: format!(
                        "duplicate configuration '{}' under brokerage '{}'",
                        config.name, brokerage.name
                    ),
                });
            }
            seen_configs.push(&config.name);
            if !is_envelope(&config.credential.encrypted_token) {
                return Err(StoreError::SnapshotFormat {
                    reason: format!(
                        "configuration '{}' carries a credential outside an encryption envelope",
                        config.name
                    ),
                });
            }
        }
    }
    Ok(())
}

fn payload_checksum(brokerages: &[BrokerageSnapshot]) -> Result<String> {
    let bytes = serde_json::to_vec(brokerages).map_err(|err| StoreError::SnapshotFormat {
        reason: format!("payload serialization failed: {err}"),
    })?;
    Ok(hex::encode(Sha256::digest(bytes)))
}
