//! Snapshot file I/O.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::backup::Snapshot;
use crate::error::{Result, StoreError};

/// Writes a snapshot to disk as pretty-printed JSON.
///
/// Uses atomic write (temp file + rename) so a crash mid-save never
/// leaves a truncated snapshot at the target path.
pub fn save_snapshot(snapshot: &Snapshot, path: &Path) -> Result<()> {
    let bytes =
        serde_json::to_vec_pretty(snapshot).map_err(|err| StoreError::SnapshotFormat {
            reason: format!("snapshot serialization failed: {err}"),
        })?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| StoreError::SnapshotIo {
            operation: "create directory for",
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let temp_path = path.with_extension("json.tmp");
    let mut file = File::create(&temp_path).map_err(|e| StoreError::SnapshotIo {
        operation: "create",
        path: temp_path.clone(),
        source: e,
    })?;
    file.write_all(&bytes).map_err(|e| StoreError::SnapshotIo {
        operation: "write",
        path: temp_path.clone(),
        source: e,
    })?;
    file.sync_all().map_err(|e| StoreError::SnapshotIo {
        operation: "sync",
        path: temp_path.clone(),
        source: e,
    })?;
    fs::rename(&temp_path, path).map_err(|e| StoreError::SnapshotIo {
        operation: "rename",
        path: path.to_path_buf(),
        source: e,
    })?;

    info!(path = %path.display(), "snapshot saved");
    Ok(())
}

/// Reads a snapshot from disk.
///
/// Parse failures surface as [`StoreError::SnapshotFormat`]; the caller
/// still runs the full restore validation before the content touches the
/// store.
pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let bytes = fs::read(path).map_err(|e| StoreError::SnapshotIo {
        operation: "read",
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_slice(&bytes).map_err(|err| StoreError::SnapshotFormat {
        reason: format!("snapshot parse failed: {err}"),
    })
}
