//! Draft records and the storage interface
//!
//! The draft layer depends only on this three-operation interface (plus a
//! diagnostic listing), never on a particular storage engine. The SQLite
//! `Database` and the in-memory store both implement it.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::Result;

/// A single persisted draft: the serialized form state at the time of the
/// last debounced save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftRecord {
    /// Identity of the draft; unique per form instance/mode
    pub key: String,
    /// Opaque serialized form state
    pub data: serde_json::Value,
    /// Time of last write; diagnostics and ordering only
    pub updated_at: DateTime<Utc>,
}

impl DraftRecord {
    pub fn new(key: String, data: serde_json::Value) -> Self {
        Self {
            key,
            data,
            updated_at: Utc::now(),
        }
    }
}

/// Key-value draft persistence. At most one record exists per key; `put`
/// overwrites in place.
pub trait DraftStorage: Send + Sync {
    /// Fetch the draft for `key`, if any.
    fn get(&self, key: &str) -> Result<Option<DraftRecord>>;

    /// Insert or overwrite the draft for `record.key`.
    fn put(&self, record: &DraftRecord) -> Result<()>;

    /// Remove the draft for `key`. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    /// All drafts, most recently updated first.
    fn list(&self) -> Result<Vec<DraftRecord>>;
}

/// In-memory implementation for tests and ephemeral use.
pub struct MemoryDraftStore {
    records: Arc<RwLock<HashMap<String, DraftRecord>>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for MemoryDraftStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryDraftStore {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}

impl DraftStorage for MemoryDraftStore {
    fn get(&self, key: &str) -> Result<Option<DraftRecord>> {
        Ok(self.records.read().get(key).cloned())
    }

    fn put(&self, record: &DraftRecord) -> Result<()> {
        self.records
            .write()
            .insert(record.key.clone(), record.clone());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.records.write().remove(key);
        Ok(())
    }

    fn list(&self) -> Result<Vec<DraftRecord>> {
        let mut records: Vec<DraftRecord> = self.records.read().values().cloned().collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_put_overwrites_in_place() {
        let store = MemoryDraftStore::new();

        store
            .put(&DraftRecord::new("blog:edit:42".to_string(), json!({"title": "a"})))
            .unwrap();
        store
            .put(&DraftRecord::new("blog:edit:42".to_string(), json!({"title": "b"})))
            .unwrap();

        let record = store.get("blog:edit:42").unwrap().unwrap();
        assert_eq!(record.data, json!({"title": "b"}));
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_delete_missing_key_is_ok() {
        let store = MemoryDraftStore::new();
        store.delete("never-written").unwrap();
        assert!(store.get("never-written").unwrap().is_none());
    }
}
