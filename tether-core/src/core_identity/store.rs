//! Persisted identity snapshots
//!
//! One JSON snapshot per device id under `<root>/<id>/identity.json`.
//! Snapshots are written through on every identity or pairing change and
//! removed only by an explicit forget.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::device_id::DeviceId;
use super::errors::{IdentityError, IdentityResult};
use super::payload::DeviceKind;

const RECORD_FILE: &str = "identity.json";

/// Persisted snapshot of one device's identity and pairing flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub id: DeviceId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub kind: DeviceKind,
    pub paired: bool,
}

/// Loads and persists identity records under a configuration root
///
/// Pure storage: no network awareness, no retention logic.
pub struct IdentityStore {
    root: PathBuf,
}

impl IdentityStore {
    /// Open (creating if necessary) a store rooted at `root`
    ///
    /// An unusable root is a fatal initialization error.
    pub fn new(root: impl Into<PathBuf>) -> IdentityResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(IdentityStore { root })
    }

    /// Directory holding one device's snapshot
    fn device_dir(&self, id: &DeviceId) -> PathBuf {
        self.root.join(id.as_str())
    }

    fn record_path(&self, id: &DeviceId) -> PathBuf {
        self.device_dir(id).join(RECORD_FILE)
    }

    /// Load every readable record
    ///
    /// A malformed or unreadable single record is logged and skipped; only
    /// an unreadable root is fatal.
    pub fn load_all(&self) -> IdentityResult<Vec<IdentityRecord>> {
        let mut records = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable store entry");
                    continue;
                }
            };

            let path = entry.path().join(RECORD_FILE);
            if !path.is_file() {
                continue;
            }

            match Self::read_record(&path) {
                Ok(record) => {
                    // The directory name is authoritative for lookup; a
                    // snapshot claiming a different id is corrupt.
                    if entry.file_name().to_string_lossy() != record.id.as_str() {
                        warn!(path = %path.display(), id = %record.id, "Skipping record with mismatched id");
                        continue;
                    }
                    records.push(record);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping malformed identity record");
                }
            }
        }

        debug!(count = records.len(), "Loaded identity records");
        Ok(records)
    }

    fn read_record(path: &Path) -> IdentityResult<IdentityRecord> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Load the record for one id
    pub fn load(&self, id: &DeviceId) -> IdentityResult<IdentityRecord> {
        let path = self.record_path(id);
        if !path.is_file() {
            return Err(IdentityError::NotFound(id.to_string()));
        }
        Self::read_record(&path)
    }

    /// Upsert the record for `record.id`
    pub fn save(&self, record: &IdentityRecord) -> IdentityResult<()> {
        let dir = self.device_dir(&record.id);
        fs::create_dir_all(&dir)?;

        let contents = serde_json::to_vec_pretty(record)?;
        write_atomic(&dir.join(RECORD_FILE), &contents)?;

        debug!(id = %record.id, paired = record.paired, "Saved identity record");
        Ok(())
    }

    /// Remove the snapshot for `id` (explicit forget)
    pub fn delete(&self, id: &DeviceId) -> IdentityResult<()> {
        let dir = self.device_dir(id);
        if dir.is_dir() {
            fs::remove_dir_all(&dir)?;
            debug!(id = %id, "Deleted identity record");
        }
        Ok(())
    }
}

/// Write file atomically (write to temp, then rename)
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, data)?;
    fs::rename(temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str, paired: bool) -> IdentityRecord {
        IdentityRecord {
            id: DeviceId::new(id).unwrap(),
            name: Some(format!("{} name", id)),
            kind: DeviceKind::Phone,
            paired,
        }
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = IdentityStore::new(dir.path()).unwrap();

        let rec = record("test-device", true);
        store.save(&rec).unwrap();

        let loaded = store.load(&rec.id).unwrap();
        assert_eq!(loaded, rec);

        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], rec);
    }

    #[test]
    fn test_save_is_idempotent_upsert() {
        let dir = TempDir::new().unwrap();
        let store = IdentityStore::new(dir.path()).unwrap();

        let mut rec = record("test-device", false);
        store.save(&rec).unwrap();
        rec.paired = true;
        store.save(&rec).unwrap();

        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].paired);
    }

    #[test]
    fn test_malformed_record_is_skipped() {
        let dir = TempDir::new().unwrap();
        let store = IdentityStore::new(dir.path()).unwrap();

        store.save(&record("good-device", true)).unwrap();

        let bad_dir = dir.path().join("bad-device");
        fs::create_dir_all(&bad_dir).unwrap();
        fs::write(bad_dir.join(RECORD_FILE), b"{ not json").unwrap();

        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id.as_str(), "good-device");
    }

    #[test]
    fn test_mismatched_directory_name_is_skipped() {
        let dir = TempDir::new().unwrap();
        let store = IdentityStore::new(dir.path()).unwrap();

        // Record claims a different id than its directory name
        let sneaky_dir = dir.path().join("dir-name");
        fs::create_dir_all(&sneaky_dir).unwrap();
        let rec = record("other-id", true);
        fs::write(
            sneaky_dir.join(RECORD_FILE),
            serde_json::to_vec(&rec).unwrap(),
        )
        .unwrap();

        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_delete_removes_record() {
        let dir = TempDir::new().unwrap();
        let store = IdentityStore::new(dir.path()).unwrap();

        let rec = record("test-device", true);
        store.save(&rec).unwrap();
        store.delete(&rec.id).unwrap();

        assert!(matches!(
            store.load(&rec.id),
            Err(IdentityError::NotFound(_))
        ));
        assert!(store.load_all().unwrap().is_empty());

        // Deleting a missing record is not an error
        store.delete(&rec.id).unwrap();
    }
}
