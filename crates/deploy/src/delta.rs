//! Change detection against the remote inventory.

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use static_deploy_model::{Inventory, WorkBatch};
use static_deploy_transfer::calculate_file_checksum;
use tracing::debug;

use crate::error::DeployError;

/// Decides whether the file stored under `upload_key` must be uploaded.
///
/// Unknown keys are always uploaded. Matching hashes are never uploaded,
/// whatever the timestamps say. Otherwise the local copy wins only if
/// it is strictly newer than the remote one.
pub fn decide(
    local_modified: DateTime<Utc>,
    local_hash: &str,
    inventory: &Inventory,
    upload_key: &str,
) -> bool {
    let Some(remote) = inventory.get(upload_key) else {
        return true;
    };

    if remote.content_hash == local_hash {
        return false;
    }

    local_modified > remote.last_modified
}

/// Modification time and MD5 of a local file.
pub fn local_state(path: &Path) -> Result<(DateTime<Utc>, String), DeployError> {
    let modified: SystemTime = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|source| DeployError::Traversal {
            path: path.to_path_buf(),
            source,
        })?;
    let hash = calculate_file_checksum(path)?;

    Ok((DateTime::<Utc>::from(modified), hash))
}

/// Drops every entry of `batch` that the remote side already has.
///
/// Hashes every file, so this blocks; run it off the async runtime.
pub fn filter_changed(batch: WorkBatch, inventory: &Inventory) -> Result<WorkBatch, DeployError> {
    let total = batch.len();
    let mut changed = WorkBatch::new();

    for entry in batch {
        let (modified, hash) = local_state(entry.local_path())?;
        if decide(modified, &hash, inventory, entry.upload_key()) {
            changed.insert(entry);
        } else {
            debug!(key = %entry.upload_key(), "unchanged, skipping");
        }
    }

    debug!(total, changed = changed.len(), "delta computed");
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use static_deploy_model::{FileEntry, RemoteRecord};
    use static_deploy_transfer::checksum_bytes;
    use std::fs;
    use tempfile::TempDir;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn inventory(key: &str, hash: &str, modified: DateTime<Utc>) -> Inventory {
        [RemoteRecord {
            key: key.into(),
            content_hash: hash.into(),
            last_modified: modified,
        }]
        .into_iter()
        .collect()
    }

    #[test]
    fn missing_remote_always_transfers() {
        let inv = Inventory::new();
        assert!(decide(t0(), "abc", &inv, "index.html"));
        assert!(decide(t0() - Duration::days(365), "abc", &inv, "index.html"));
    }

    #[test]
    fn equal_hash_skips_regardless_of_time() {
        let inv = inventory("index.html", "abc", t0());
        assert!(!decide(t0() + Duration::seconds(1), "abc", &inv, "index.html"));
        assert!(!decide(t0() - Duration::seconds(1), "abc", &inv, "index.html"));
        assert!(!decide(t0(), "abc", &inv, "index.html"));
    }

    #[test]
    fn changed_and_newer_transfers() {
        let inv = inventory("index.html", "abc", t0());
        assert!(decide(t0() + Duration::seconds(1), "def", &inv, "index.html"));
    }

    #[test]
    fn changed_but_not_newer_skips() {
        let inv = inventory("index.html", "abc", t0());
        assert!(!decide(t0(), "def", &inv, "index.html"));
        assert!(!decide(t0() - Duration::seconds(1), "def", &inv, "index.html"));
    }

    #[test]
    fn local_state_hashes_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"hello").unwrap();

        let (modified, hash) = local_state(&path).unwrap();
        assert_eq!(hash, checksum_bytes(b"hello"));
        assert!(modified <= Utc::now());
    }

    #[test]
    fn filter_changed_keeps_only_uploads() {
        let dir = TempDir::new().unwrap();
        let index = dir.path().join("index.html");
        let logo = dir.path().join("logo.png");
        fs::write(&index, b"<html/>").unwrap();
        fs::write(&logo, b"PNG").unwrap();

        let batch: WorkBatch = [
            FileEntry::new(index.clone(), "index.html".into(), Vec::new()),
            FileEntry::new(logo.clone(), "logo.png".into(), Vec::new()),
        ]
        .into_iter()
        .collect();

        // Remote copy of index.html has identical content.
        let inv = inventory("index.html", &checksum_bytes(b"<html/>"), t0());
        let changed = filter_changed(batch, &inv).unwrap();

        assert_eq!(changed.len(), 1);
        assert!(changed.get(&logo).is_some());
        assert!(changed.get(&index).is_none());
    }

    #[test]
    fn filter_changed_missing_file_fails() {
        let batch: WorkBatch = [FileEntry::new(
            "/nonexistent/static-deploy/a.txt".into(),
            "a.txt".into(),
            Vec::new(),
        )]
        .into_iter()
        .collect();

        assert!(filter_changed(batch, &Inventory::new()).is_err());
    }
}
