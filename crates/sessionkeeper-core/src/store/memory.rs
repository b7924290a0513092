//! In-memory account store.

use std::collections::HashMap;

use parking_lot::RwLock;
use sessionkeeper_types::AccountRecord;

use super::{AccountStore, StoreResult};

#[derive(Default)]
pub struct MemoryAccountStore {
    records: RwLock<HashMap<String, AccountRecord>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record, replacing any existing one.
    pub fn insert(&self, record: AccountRecord) {
        self.records.write().insert(record.id.clone(), record);
    }
}

impl AccountStore for MemoryAccountStore {
    fn load(&self, account_id: &str) -> StoreResult<Option<AccountRecord>> {
        Ok(self.records.read().get(account_id).cloned())
    }

    fn save(&self, record: &AccountRecord) -> StoreResult<()> {
        self.insert(record.clone());
        Ok(())
    }

    fn list(&self) -> StoreResult<Vec<AccountRecord>> {
        let mut records: Vec<AccountRecord> = self.records.read().values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    fn remove(&self, account_id: &str) -> StoreResult<bool> {
        Ok(self.records.write().remove(account_id).is_some())
    }

    fn update(
        &self,
        account_id: &str,
        apply: &mut dyn FnMut(&mut AccountRecord),
    ) -> StoreResult<AccountRecord> {
        let mut records = self.records.write();
        let record = records
            .entry(account_id.to_string())
            .or_insert_with(|| AccountRecord::new(account_id, account_id));
        apply(record);
        Ok(record.clone())
    }
}
