//! Store error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::crypto::CryptoError;

/// Errors from store, backup, and restore operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A configuration with the same `(brokerage, name)` already exists.
    #[error("configuration '{name}' already exists for brokerage '{brokerage}'")]
    DuplicateName { brokerage: String, name: String },

    /// The stored version moved past the caller's copy. Recoverable:
    /// re-read the configuration and retry the edit.
    #[error(
        "configuration '{name}' conflicts with a more recent save \
         (expected version {expected}, stored version {actual})"
    )]
    VersionConflict {
        brokerage: String,
        name: String,
        expected: u64,
        actual: u64,
    },

    /// No such configuration.
    #[error("configuration '{name}' not found for brokerage '{brokerage}'")]
    NotFound { brokerage: String, name: String },

    /// Credential encryption or decryption failed. Fatal to the operation
    /// that needed it; a credential is never stored or sent unencrypted.
    #[error("credential handling failed")]
    Encryption(#[from] CryptoError),

    /// The snapshot was written by an incompatible format version.
    #[error(
        "snapshot format version {found} is not supported \
         (supported: {min} through {max})"
    )]
    UnsupportedSnapshotVersion { found: u32, min: u32, max: u32 },

    /// The snapshot failed structural or integrity validation. Restore
    /// aborts before touching the store.
    #[error("snapshot rejected: {reason}")]
    SnapshotFormat { reason: String },

    /// Snapshot file I/O failed.
    #[error("failed to {operation} snapshot file {path}")]
    SnapshotIo {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;
