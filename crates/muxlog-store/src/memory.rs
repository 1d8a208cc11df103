use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use muxlog_types::{ClassInfo, Context, Record, RecordKey};

use crate::error::{StoreError, StoreResult};
use crate::traits::Store;

/// In-memory, `BTreeMap`-based record store.
///
/// The default delegate behind routing and journaling stores. Records are
/// held behind a `RwLock` for safe concurrent access and cloned on
/// read/write. Writes to the same key are serialized by the lock.
pub struct InMemoryStore {
    class: ClassInfo,
    records: RwLock<BTreeMap<RecordKey, Record>>,
}

impl InMemoryStore {
    /// Create a new empty store for `class`.
    pub fn new(class: ClassInfo) -> Self {
        Self {
            class,
            records: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a store, rejecting an unusable class descriptor.
    pub fn try_new(class: ClassInfo) -> StoreResult<Self> {
        class.validate()?;
        Ok(Self::new(class))
    }

    /// Number of records currently stored.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read_map()?.len())
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.read_map()?.is_empty())
    }

    /// Sorted list of all keys.
    pub fn keys(&self) -> StoreResult<Vec<RecordKey>> {
        Ok(self.read_map()?.keys().cloned().collect())
    }

    fn read_map(&self) -> StoreResult<RwLockReadGuard<'_, BTreeMap<RecordKey, Record>>> {
        self.records.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write_map(&self) -> StoreResult<RwLockWriteGuard<'_, BTreeMap<RecordKey, Record>>> {
        self.records.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl Store for InMemoryStore {
    fn of(&self) -> &ClassInfo {
        &self.class
    }

    fn put(&self, _ctx: &Context, record: Record) -> StoreResult<Record> {
        let key = self.class.key_of(&record)?;
        self.write_map()?.insert(key, record.clone());
        Ok(record)
    }

    fn remove(&self, _ctx: &Context, record: &Record) -> StoreResult<Option<Record>> {
        let key = self.class.key_of(record)?;
        Ok(self.write_map()?.remove(&key))
    }

    fn find(&self, _ctx: &Context, key: &RecordKey) -> StoreResult<Option<Record>> {
        Ok(self.read_map()?.get(key).cloned())
    }

    fn select(&self, _ctx: &Context) -> StoreResult<Vec<Record>> {
        Ok(self.read_map()?.values().cloned().collect())
    }

    fn remove_all(&self, _ctx: &Context) -> StoreResult<u64> {
        let mut map = self.write_map()?;
        let removed = map.len() as u64;
        map.clear();
        Ok(removed)
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.records.read().map(|m| m.len()).unwrap_or_default();
        f.debug_struct("InMemoryStore")
            .field("class", &self.class.id)
            .field("record_count", &count)
            .finish()
    }
}
