//! [`UsageStore`] implementations.
//!
//! - [`StorageUsageStore`] - records as JSON strings in a [`KeyValueStore`]
//! - [`MemoryUsageStore`] - typed records in a map, for tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use sugesto_core::{CoreError, UsageState, UsageStore};
use tracing::debug;

use crate::error::StoreError;
use crate::storage::KeyValueStore;

/// Key prefix for meter records.
pub const USAGE_KEY_PREFIX: &str = "sugesto_free_trials_";

/// Returns the storage key for `tool_id`.
pub fn usage_key(tool_id: &str) -> String {
    format!("{USAGE_KEY_PREFIX}{tool_id}")
}

fn check_tool_id(tool_id: &str) -> Result<(), CoreError> {
    if tool_id.trim().is_empty() {
        return Err(CoreError::InvalidToolId(tool_id.to_string()));
    }
    Ok(())
}

// ============================================================================
// Storage-Backed Store
// ============================================================================

/// Usage records kept in key-value storage under `sugesto_free_trials_<tool>`.
#[derive(Clone)]
pub struct StorageUsageStore {
    storage: Arc<dyn KeyValueStore>,
}

impl StorageUsageStore {
    /// Creates a store over `storage`.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Returns the tool identifiers that have a stored record.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read.
    pub fn tool_ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .storage
            .keys()?
            .into_iter()
            .filter_map(|k| k.strip_prefix(USAGE_KEY_PREFIX).map(str::to_string))
            .collect())
    }
}

impl std::fmt::Debug for StorageUsageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageUsageStore").finish_non_exhaustive()
    }
}

impl UsageStore for StorageUsageStore {
    fn get(&self, tool_id: &str) -> Result<Option<UsageState>, CoreError> {
        check_tool_id(tool_id)?;
        let key = usage_key(tool_id);
        let Some(raw) = self.storage.get_item(&key)? else {
            return Ok(None);
        };

        let state: UsageState = serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
            key,
            reason: e.to_string(),
        })?;
        Ok(Some(state))
    }

    fn put(&self, tool_id: &str, state: &UsageState) -> Result<(), CoreError> {
        check_tool_id(tool_id)?;
        state.validate()?;
        let raw = serde_json::to_string(state)?;
        debug!(tool_id, trials_used = state.trials_used, "Persisting usage record");
        Ok(self.storage.set_item(&usage_key(tool_id), &raw)?)
    }

    fn remove(&self, tool_id: &str) -> Result<(), CoreError> {
        check_tool_id(tool_id)?;
        Ok(self.storage.remove_item(&usage_key(tool_id))?)
    }
}

// ============================================================================
// Memory Store
// ============================================================================

/// In-memory usage records.
#[derive(Debug, Default)]
pub struct MemoryUsageStore {
    records: Mutex<HashMap<String, UsageState>>,
}

impl MemoryUsageStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl UsageStore for MemoryUsageStore {
    fn get(&self, tool_id: &str) -> Result<Option<UsageState>, CoreError> {
        check_tool_id(tool_id)?;
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(tool_id).cloned())
    }

    fn put(&self, tool_id: &str, state: &UsageState) -> Result<(), CoreError> {
        check_tool_id(tool_id)?;
        state.validate()?;
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.insert(tool_id.to_string(), state.clone());
        Ok(())
    }

    fn remove(&self, tool_id: &str) -> Result<(), CoreError> {
        check_tool_id(tool_id)?;
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.remove(tool_id);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_usage_key() {
        assert_eq!(usage_key("bulk-checker"), "sugesto_free_trials_bulk-checker");
    }

    #[test]
    fn test_storage_round_trip() {
        let storage = Arc::new(MemoryStorage::new());
        let store = StorageUsageStore::new(storage.clone());

        assert!(store.get("list-cleaner").unwrap().is_none());

        let mut state = UsageState::new("list-cleaner", 3, 100);
        state.record_trial(1_000);
        store.put("list-cleaner", &state).unwrap();

        assert_eq!(store.get("list-cleaner").unwrap(), Some(state));
        assert!(storage
            .get_item("sugesto_free_trials_list-cleaner")
            .unwrap()
            .is_some());
        assert_eq!(store.tool_ids().unwrap(), vec!["list-cleaner"]);

        store.remove("list-cleaner").unwrap();
        assert!(store.get("list-cleaner").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_record_is_invalid_data() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set_item("sugesto_free_trials_x", "{\"trials_used\": -1}")
            .unwrap();
        let store = StorageUsageStore::new(storage);

        assert!(matches!(store.get("x"), Err(CoreError::InvalidData(_))));
    }

    #[test]
    fn test_empty_tool_id_rejected() {
        let store = MemoryUsageStore::new();
        assert!(matches!(store.get(" "), Err(CoreError::InvalidToolId(_))));
        let state = UsageState::new("", 3, 100);
        assert!(store.put("", &state).is_err());
    }

    #[test]
    fn test_put_rejects_unbalanced_credits() {
        let storage = Arc::new(MemoryStorage::new());
        let stored = StorageUsageStore::new(storage.clone());
        let memory = MemoryUsageStore::new();

        let mut state = UsageState::new("bulk-checker", 3, 100);
        state.credits_available = 90;

        assert!(matches!(
            stored.put("bulk-checker", &state),
            Err(CoreError::InvalidData(_))
        ));
        assert!(matches!(
            memory.put("bulk-checker", &state),
            Err(CoreError::InvalidData(_))
        ));
        assert!(storage
            .get_item("sugesto_free_trials_bulk-checker")
            .unwrap()
            .is_none());
        assert!(memory.get("bulk-checker").unwrap().is_none());
    }

    #[test]
    fn test_other_keys_ignored_by_tool_ids() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("access_token", "t").unwrap();
        let store = StorageUsageStore::new(storage);
        assert!(store.tool_ids().unwrap().is_empty());
    }
}
