//! One JSON file per account, written atomically.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use sessionkeeper_types::{AccountRecord, StoreError};
use tracing::warn;

use super::{validate_account_id, AccountStore, StoreResult};

/// Directory name for individual account files.
pub const ACCOUNTS_DIR: &str = "accounts";

pub struct JsonAccountStore {
    dir: PathBuf,
    /// Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl JsonAccountStore {
    /// Open (and create if needed) `<data_dir>/accounts`.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        let dir = data_dir.join(ACCOUNTS_DIR);
        fs::create_dir_all(&dir).map_err(|e| StoreError::Io {
            message: format!("Failed to create accounts directory {}: {e}", dir.display()),
        })?;
        Ok(Self { dir, write_lock: Mutex::new(()) })
    }

    fn record_path(&self, account_id: &str) -> PathBuf {
        self.dir.join(format!("{account_id}.json"))
    }

    fn read_record(path: &Path) -> StoreResult<AccountRecord> {
        let content = fs::read_to_string(path).map_err(|e| StoreError::Io {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        serde_json::from_str(&content).map_err(|e| StoreError::Serialization {
            message: format!("Failed to parse {}: {e}", path.display()),
        })
    }

    fn write_record(&self, record: &AccountRecord) -> StoreResult<()> {
        validate_account_id(&record.id)?;
        let path = self.record_path(&record.id);
        let temp_path = self.dir.join(format!("{}.json.tmp", record.id));

        let content = serde_json::to_string_pretty(record)
            .map_err(|e| StoreError::Serialization { message: e.to_string() })?;

        if let Err(e) = fs::write(&temp_path, content) {
            let _ = fs::remove_file(&temp_path);
            return Err(StoreError::Io { message: format!("Failed to write temp record: {e}") });
        }

        fs::rename(&temp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StoreError::Io { message: format!("Failed to replace record file: {e}") }
        })
    }
}

impl AccountStore for JsonAccountStore {
    fn load(&self, account_id: &str) -> StoreResult<Option<AccountRecord>> {
        validate_account_id(account_id)?;
        let path = self.record_path(account_id);
        if !path.exists() {
            return Ok(None);
        }
        Self::read_record(&path).map(Some)
    }

    fn save(&self, record: &AccountRecord) -> StoreResult<()> {
        let _guard = self.write_lock.lock();
        self.write_record(record)
    }

    fn list(&self) -> StoreResult<Vec<AccountRecord>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| StoreError::Io {
            message: format!("Failed to list {}: {e}", self.dir.display()),
        })?;

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_record(&path) {
                Ok(record) => records.push(record),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable account record"),
            }
        }
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    fn remove(&self, account_id: &str) -> StoreResult<bool> {
        validate_account_id(account_id)?;
        let _guard = self.write_lock.lock();
        let path = self.record_path(account_id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|e| StoreError::Io {
            message: format!("Failed to remove {}: {e}", path.display()),
        })?;
        Ok(true)
    }

    fn update(
        &self,
        account_id: &str,
        apply: &mut dyn FnMut(&mut AccountRecord),
    ) -> StoreResult<AccountRecord> {
        validate_account_id(account_id)?;
        let _guard = self.write_lock.lock();
        let path = self.record_path(account_id);
        let mut record = if path.exists() {
            Self::read_record(&path)?
        } else {
            AccountRecord::new(account_id, account_id)
        };
        apply(&mut record);
        self.write_record(&record)?;
        Ok(record)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sessionkeeper_types::{ConnectionState, LastKnownState};
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_roundtrip_on_disk() {
        let tmp = TempDir::new().unwrap();
        let store = JsonAccountStore::open(tmp.path()).unwrap();

        let mut record = AccountRecord::new("support", "Support desk");
        record.session_path = Some("/data/sessions/support".to_string());
        store.save(&record).unwrap();

        assert!(tmp.path().join("accounts/support.json").exists());
        assert!(!tmp.path().join("accounts/support.json.tmp").exists());
        assert_eq!(store.load("support").unwrap(), Some(record));
        assert_eq!(store.load("missing").unwrap(), None);
    }

    #[test]
    fn test_update_creates_and_applies() {
        let tmp = TempDir::new().unwrap();
        let store = JsonAccountStore::open(tmp.path()).unwrap();

        let record = store
            .update("sales", &mut |r: &mut AccountRecord| r.apply_state(ConnectionState::Connected))
            .unwrap();
        assert!(record.device_linked);
        assert!(store.was_previously_linked("sales"));

        store.update("sales", &mut |r: &mut AccountRecord| r.mark_relinking()).unwrap();
        let reloaded = store.load("sales").unwrap().unwrap();
        assert_eq!(reloaded.last_known_state, LastKnownState::Relinking);
        assert!(reloaded.requires_qr_code);
        assert!(!reloaded.is_active);
    }

    #[test]
    fn test_list_skips_corrupt_files() {
        let tmp = TempDir::new().unwrap();
        let store = JsonAccountStore::open(tmp.path()).unwrap();
        store.save(&AccountRecord::new("b", "B")).unwrap();
        store.save(&AccountRecord::new("a", "A")).unwrap();
        fs::write(tmp.path().join("accounts/broken.json"), "{not json").unwrap();

        let ids: Vec<String> = store.list().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_rejects_path_traversal_ids() {
        let tmp = TempDir::new().unwrap();
        let store = JsonAccountStore::open(tmp.path()).unwrap();
        assert!(store.load("../etc/passwd").is_err());
        assert!(store.save(&AccountRecord::new("a/b", "x")).is_err());
    }

    #[test]
    fn test_remove() {
        let tmp = TempDir::new().unwrap();
        let store = JsonAccountStore::open(tmp.path()).unwrap();
        store.save(&AccountRecord::new("a", "A")).unwrap();
        assert!(store.remove("a").unwrap());
        assert!(!store.remove("a").unwrap());
    }
}
