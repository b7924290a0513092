//! Persisted account records.
//!
//! The supervision layer writes lifecycle flags on every state-affecting
//! transition and reads `device_linked` to decide recovery eligibility.

mod json;
mod memory;

pub use json::JsonAccountStore;
pub use memory::MemoryAccountStore;

use sessionkeeper_types::{AccountRecord, StoreError};

pub type StoreResult<T> = Result<T, StoreError>;

pub trait AccountStore: Send + Sync {
    fn load(&self, account_id: &str) -> StoreResult<Option<AccountRecord>>;

    fn save(&self, record: &AccountRecord) -> StoreResult<()>;

    fn list(&self) -> StoreResult<Vec<AccountRecord>>;

    /// Returns whether a record was removed.
    fn remove(&self, account_id: &str) -> StoreResult<bool>;

    /// Load (or create) a record, apply `apply`, and save it.
    fn update(
        &self,
        account_id: &str,
        apply: &mut dyn FnMut(&mut AccountRecord),
    ) -> StoreResult<AccountRecord> {
        let mut record = self
            .load(account_id)?
            .unwrap_or_else(|| AccountRecord::new(account_id, account_id));
        apply(&mut record);
        self.save(&record)?;
        Ok(record)
    }

    /// Whether the account has completed a device link at least once.
    fn was_previously_linked(&self, account_id: &str) -> bool {
        matches!(self.load(account_id), Ok(Some(record)) if record.device_linked)
    }
}

/// Reject ids that would escape the store directory.
pub(crate) fn validate_account_id(account_id: &str) -> StoreResult<()> {
    let invalid = account_id.is_empty()
        || account_id.contains(['/', '\\'])
        || account_id.contains("..")
        || account_id.starts_with('.');
    if invalid {
        return Err(StoreError::Io { message: format!("invalid account id: {account_id:?}") });
    }
    Ok(())
}
