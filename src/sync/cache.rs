use super::types::SyncMappingTable;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

/// Storage for built mapping tables.
///
/// Values are shared as `Arc`s, so a reader either sees a complete table or
/// nothing at all.
pub trait CacheStore: Send + Sync + fmt::Debug {
    fn get(&self, key: &str) -> Option<Arc<SyncMappingTable>>;

    fn set(&self, key: &str, table: Arc<SyncMappingTable>);

    fn delete(&self, key: &str);
}

/// Process-local cache store.
#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStore {
    entries: Arc<DashMap<String, Arc<SyncMappingTable>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Option<Arc<SyncMappingTable>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    fn set(&self, key: &str, table: Arc<SyncMappingTable>) {
        self.entries.insert(key.to_string(), table);
    }

    fn delete(&self, key: &str) {
        self.entries.remove(key);
    }
}
