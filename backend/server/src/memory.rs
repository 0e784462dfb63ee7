use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::database::{Entry, KvStore, StoreError};

/// In-process store for local runs and tests.
///
/// Counts reads and writes so callers can check a request never reached storage.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Value>>,
    reads: AtomicU64,
    writes: AtomicU64,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Makes every following call fail with [`StoreError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub async fn insert(&self, key: impl Into<String>, value: Value) {
        self.entries.lock().await.insert(key.into(), value);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("memory store set to fail".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.check()?;

        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.check()?;

        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.clone());

        Ok(())
    }

    async fn list(&self, prefix: &str, include_values: bool) -> Result<Vec<Entry>, StoreError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.check()?;

        let entries = self.entries.lock().await;

        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| Entry {
                key: key.clone(),
                value: include_values.then(|| value.clone()),
            })
            .collect())
    }
}
