//! In-memory store engine

use super::{Store, StoreTransaction};
use crate::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Process-local store
///
/// Clones share the same records. Transactions stage writes privately and
/// apply them in one step on commit; only one transaction is open at a time.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    write_lock: Arc<Mutex<()>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// List committed keys starting with `prefix`, in key order
    pub async fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.records
            .read()
            .await
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.records.read().await.contains_key(key))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let guard = Arc::clone(&self.write_lock).lock_owned().await;

        Ok(Box::new(MemoryTransaction {
            records: Arc::clone(&self.records),
            staged: BTreeMap::new(),
            _guard: guard,
        }))
    }
}

struct MemoryTransaction {
    records: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    staged: BTreeMap<String, Vec<u8>>,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn has(&mut self, key: &str) -> Result<bool> {
        if self.staged.contains_key(key) {
            return Ok(true);
        }
        Ok(self.records.read().await.contains_key(key))
    }

    async fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(value) = self.staged.get(key) {
            return Ok(Some(value.clone()));
        }
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn put(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.staged.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction { records, staged, _guard } = *self;
        records.write().await.extend(staged);
        Ok(())
    }

    async fn discard(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_uncommitted_writes_are_private() {
        let store = MemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        tx.put("a", b"1").await.unwrap();
        assert!(tx.has("a").await.unwrap());
        assert!(!store.has("a").await.unwrap());

        tx.commit().await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(b"1".to_vec()));
    }

    #[tokio::test]
    async fn test_discard_drops_staged_writes() {
        let store = MemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        tx.put("a", b"1").await.unwrap();
        tx.discard().await.unwrap();

        assert!(store.keys_with_prefix("").await.is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_records() {
        let store = MemoryStore::new();
        let other = store.clone();

        let mut tx = store.begin().await.unwrap();
        tx.put("1024:x.wav", b"[]").await.unwrap();
        tx.put("fft_keys", b"[]").await.unwrap();
        tx.commit().await.unwrap();

        assert!(other.has("1024:x.wav").await.unwrap());
        assert_eq!(other.keys_with_prefix("").await.len(), 2);
        assert_eq!(other.keys_with_prefix("1024:").await, vec!["1024:x.wav".to_string()]);
    }
}
