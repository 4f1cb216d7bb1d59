//! Shared configuration store for brokerage mapping configurations.
//!
//! The store is the one mutable resource several team members touch at
//! once. Writes are optimistic: callers read a configuration together with
//! its version, edit, and write back with the version they saw; a
//! concurrent save in between fails the write with a version conflict
//! instead of silently overwriting it. Reads clone under a shared lock and
//! never observe a half-written record.
//!
//! API tokens are encrypted with a process-wide key before a write becomes
//! visible and stay ciphertext in snapshots, logs, and every read path
//! except [`ConfigStore::decrypt_token`], which exists solely to feed the
//! outbound API client.

mod backup;
mod crypto;
mod error;
mod io;
mod store;

pub use backup::{
    BrokerageSnapshot, MIN_SUPPORTED_SNAPSHOT_VERSION, RestoreItem, RestoreMode, RestoreOutcome,
    RestoreReport, SNAPSHOT_FORMAT_VERSION, Snapshot,
};
pub use crypto::{ChaChaCredentialCipher, CredentialCipher, CryptoError, is_envelope};
pub use error::{Result, StoreError};
pub use io::{load_snapshot, save_snapshot};
pub use store::{AuditEntry, AuditOperation, ConfigStore, ConfigurationDraft};
