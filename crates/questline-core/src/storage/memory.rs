//! In-memory progress store for tests and embedders without a database.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{AccountWork, Domain, ProgressStore};
use crate::error::{CoreError, StoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<(String, String), serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records across all accounts.
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProgressStore for MemoryStore {
    fn get(&self, account_id: &str, domain: &Domain) -> Result<Option<serde_json::Value>, StoreError> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(records.get(&(account_id.to_string(), domain.key())).cloned())
    }

    fn set(&self, account_id: &str, domain: &Domain, value: &serde_json::Value) -> Result<(), StoreError> {
        let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        records.insert((account_id.to_string(), domain.key()), value.clone());
        Ok(())
    }

    /// Callers serialise per account themselves; writes are not rolled back.
    fn with_account(&self, _account_id: &str, work: &mut AccountWork<'_>) -> Result<(), CoreError> {
        work(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accounts_do_not_share_records() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        store.set("a", &Domain::Xp, &serde_json::json!(1)).unwrap();
        store.set("b", &Domain::Xp, &serde_json::json!(2)).unwrap();
        assert_eq!(store.get("a", &Domain::Xp).unwrap(), Some(serde_json::json!(1)));
        assert_eq!(store.get("b", &Domain::Xp).unwrap(), Some(serde_json::json!(2)));
        assert!(store.get("a", &Domain::Badges).unwrap().is_none());
        assert_eq!(store.len(), 2);
    }
}
