//! The configuration store.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use freight_model::{ApiCredential, FieldMapping, MappingConfiguration, UploadSummary};

use crate::crypto::CredentialCipher;
use crate::error::{Result, StoreError};

/// Store mutation kinds recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOperation {
    Created,
    Updated,
    Deleted,
    Restored,
}

/// One append-only audit entry per store mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub brokerage: String,
    pub configuration: String,
    pub operation: AuditOperation,
    pub at: DateTime<Utc>,
}

/// Caller-supplied content for a create or update.
///
/// Carries the plaintext API token for the duration of the call only; the
/// token is encrypted before the write takes the lock and the draft is
/// consumed by the operation.
#[derive(Debug, Clone)]
pub struct ConfigurationDraft {
    pub name: String,
    pub description: Option<String>,
    pub mappings: Vec<FieldMapping>,
    pub base_url: String,
    pub api_token: String,
    pub source_headers: Vec<String>,
}

#[derive(Default)]
pub(crate) struct StoreInner {
    /// brokerage name → configuration name → configuration.
    brokerages: BTreeMap<String, BTreeMap<String, MappingConfiguration>>,
    audit: Vec<AuditEntry>,
    uploads: Vec<UploadSummary>,
}

/// Keyed storage for brokerages, configurations, and encrypted
/// credentials, safe for concurrent use from many callers.
///
/// The write lock is held only for the version-check-and-commit step;
/// encryption and cloning happen outside it.
pub struct ConfigStore {
    inner: RwLock<StoreInner>,
    cipher: Arc<dyn CredentialCipher>,
}

impl ConfigStore {
    pub fn new(cipher: Arc<dyn CredentialCipher>) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            cipher,
        }
    }

    /// Creates a configuration under `brokerage`, which is itself created
    /// on first use. Fails when the `(brokerage, name)` pair exists.
    pub fn create(&self, brokerage: &str, draft: ConfigurationDraft) -> Result<MappingConfiguration> {
        let credential = self.encrypt_credential(&draft)?;
        let now = Utc::now();
        let config = MappingConfiguration {
            brokerage: brokerage.to_string(),
            name: draft.name.clone(),
            description: draft.description,
            mappings: draft.mappings,
            credential,
            source_headers: draft.source_headers,
            created_at: now,
            updated_at: now,
            version: 1,
        };

        let mut inner = self.write_lock();
        let configs = inner.brokerages.entry(brokerage.to_string()).or_default();
        if configs.contains_key(&draft.name) {
            return Err(StoreError::DuplicateName {
                brokerage: brokerage.to_string(),
                name: draft.name,
            });
        }
        configs.insert(draft.name.clone(), config.clone());
        inner.audit.push(AuditEntry {
            brokerage: brokerage.to_string(),
            configuration: draft.name.clone(),
            operation: AuditOperation::Created,
            at: now,
        });
        drop(inner);

        info!(brokerage, configuration = draft.name.as_str(), "configuration created");
        Ok(config)
    }

    /// Replaces a configuration's content if and only if the stored
    /// version equals `expected_version`; the new version is returned in
    /// the updated configuration.
    pub fn update(
        &self,
        brokerage: &str,
        name: &str,
        expected_version: u64,
        draft: ConfigurationDraft,
    ) -> Result<MappingConfiguration> {
        let credential = self.encrypt_credential(&draft)?;
        let now = Utc::now();

        let mut inner = self.write_lock();
        let stored = inner
            .brokerages
            .get_mut(brokerage)
            .and_then(|configs| configs.get_mut(name))
            .ok_or_else(|| StoreError::NotFound {
                brokerage: brokerage.to_string(),
                name: name.to_string(),
            })?;
        if stored.version != expected_version {
            return Err(StoreError::VersionConflict {
                brokerage: brokerage.to_string(),
                name: name.to_string(),
                expected: expected_version,
                actual: stored.version,
            });
        }
        stored.description = draft.description;
        stored.mappings = draft.mappings;
        stored.credential = credential;
        stored.source_headers = draft.source_headers;
        stored.updated_at = now;
        stored.version += 1;
        let updated = stored.clone();
        inner.audit.push(AuditEntry {
            brokerage: brokerage.to_string(),
            configuration: name.to_string(),
            operation: AuditOperation::Updated,
            at: now,
        });
        drop(inner);

        info!(
            brokerage,
            configuration = name,
            version = updated.version,
            "configuration updated"
        );
        Ok(updated)
    }

    /// Snapshot-consistent read of one configuration.
    pub fn get(&self, brokerage: &str, name: &str) -> Result<MappingConfiguration> {
        let inner = self.read_lock();
        inner
            .brokerages
            .get(brokerage)
            .and_then(|configs| configs.get(name))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                brokerage: brokerage.to_string(),
                name: name.to_string(),
            })
    }

    /// All configurations for a brokerage, ordered by name.
    pub fn list(&self, brokerage: &str) -> Vec<MappingConfiguration> {
        let inner = self.read_lock();
        inner
            .brokerages
            .get(brokerage)
            .map(|configs| configs.values().cloned().collect())
            .unwrap_or_default()
    }

    /// All brokerage names, ordered.
    pub fn list_brokerages(&self) -> Vec<String> {
        let inner = self.read_lock();
        inner.brokerages.keys().cloned().collect()
    }

    /// Deletes a configuration. Idempotent: deleting a missing
    /// configuration returns `false` and is not an error.
    pub fn delete(&self, brokerage: &str, name: &str) -> bool {
        let mut inner = self.write_lock();
        let removed = inner
            .brokerages
            .get_mut(brokerage)
            .and_then(|configs| configs.remove(name))
            .is_some();
        if removed {
            inner.audit.push(AuditEntry {
                brokerage: brokerage.to_string(),
                configuration: name.to_string(),
                operation: AuditOperation::Deleted,
                at: Utc::now(),
            });
        }
        drop(inner);
        if removed {
            info!(brokerage, configuration = name, "configuration deleted");
        }
        removed
    }

    /// Decrypts a configuration's API token.
    ///
    /// This is the only plaintext read path; it exists for the moment a
    /// submission run builds its API client and must not be used to
    /// display or persist the token.
    pub fn decrypt_token(&self, config: &MappingConfiguration) -> Result<String> {
        Ok(self.cipher.decrypt(&config.credential.encrypted_token)?)
    }

    /// The append-only audit log, oldest first.
    pub fn audit_log(&self) -> Vec<AuditEntry> {
        self.read_lock().audit.clone()
    }

    /// Appends a submission-run summary to the upload history.
    pub fn record_upload(&self, summary: UploadSummary) {
        info!(
            brokerage = summary.brokerage.as_str(),
            configuration = summary.configuration.as_str(),
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "upload recorded"
        );
        self.write_lock().uploads.push(summary);
    }

    /// Upload history, newest first, optionally filtered by brokerage.
    pub fn upload_history(&self, brokerage: Option<&str>, limit: usize) -> Vec<UploadSummary> {
        let inner = self.read_lock();
        inner
            .uploads
            .iter()
            .rev()
            .filter(|summary| brokerage.is_none_or(|b| summary.brokerage == b))
            .take(limit)
            .cloned()
            .collect()
    }

    fn encrypt_credential(&self, draft: &ConfigurationDraft) -> Result<ApiCredential> {
        let encrypted_token = self.cipher.encrypt(&draft.api_token)?;
        Ok(ApiCredential {
            base_url: draft.base_url.clone(),
            encrypted_token,
        })
    }

    pub(crate) fn read_lock(&self) -> std::sync::RwLockReadGuard<'_, StoreInner> {
        self.inner.read().expect("store lock poisoned")
    }

    pub(crate) fn write_lock(&self) -> std::sync::RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().expect("store lock poisoned")
    }
}

impl StoreInner {
    pub(crate) fn brokerages(&self) -> &BTreeMap<String, BTreeMap<String, MappingConfiguration>> {
        &self.brokerages
    }

    pub(crate) fn replace_content(
        &mut self,
        brokerages: BTreeMap<String, BTreeMap<String, MappingConfiguration>>,
    ) {
        self.brokerages = brokerages;
    }

    pub(crate) fn push_audit(&mut self, entry: AuditEntry) {
        self.audit.push(entry);
    }

    pub(crate) fn config_mut(
        &mut self,
        brokerage: &str,
        name: &str,
    ) -> Option<&mut MappingConfiguration> {
        self.brokerages
            .get_mut(brokerage)
            .and_then(|configs| configs.get_mut(name))
    }

    pub(crate) fn insert_config(&mut self, config: MappingConfiguration) {
        self.brokerages
            .entry(config.brokerage.clone())
            .or_default()
            .insert(config.name.clone(), config);
    }
}
