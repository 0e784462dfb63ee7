//! # Key-Value Store
//!
//! Projects live in a key-value store owned by an external service. Handlers only see
//! the [`KvStore`] contract: `get`, `set` and a prefix `list`.
//!
//! ## Implementation
//!
//! - [`RedisStore`]: values are JSON strings, prefix listing is `SCAN MATCH` + `MGET`
//! - [`crate::memory::MemoryStore`]: in-process map for local runs and tests
//! - [`UserStore`]: per-user namespace over a shared store, `roomify:<user>:<key>`
//!
//! No transactions or locking. Two saves racing on one key resolve to whichever the
//! store applies last.
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use redis::{
    AsyncCommands, Client, RedisError,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

const SCAN_BATCH: usize = 100;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),

    #[error("Stored value under {key} is not valid JSON: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode value: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    pub value: Option<Value>,
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, key: &str, value: &Value) -> Result<(), StoreError>;

    /// Every entry whose key starts with `prefix`. Values are only loaded when asked for.
    async fn list(&self, prefix: &str, include_values: bool) -> Result<Vec<Entry>, StoreError>;
}

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, StoreError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url)?;
    let connection_manager = client.get_connection_manager_with_config(config).await?;

    info!("Connected to Redis");

    Ok(connection_manager)
}

#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut connection = self.connection.clone();
        let raw: Option<String> = connection.get(key).await?;

        raw.map(|raw| decode(key, &raw)).transpose()
    }

    async fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let raw = serde_json::to_string(value)?;

        connection.set::<_, _, ()>(key, raw).await?;

        Ok(())
    }

    async fn list(&self, prefix: &str, include_values: bool) -> Result<Vec<Entry>, StoreError> {
        let mut connection = self.connection.clone();
        let pattern = format!("{}*", escape_glob(prefix));

        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut connection)
                .await?;

            keys.extend(batch);
            cursor = next;

            if cursor == 0 {
                break;
            }
        }

        // SCAN may repeat keys across iterations
        keys.sort();
        keys.dedup();

        if !include_values || keys.is_empty() {
            return Ok(keys
                .into_iter()
                .map(|key| Entry { key, value: None })
                .collect());
        }

        let raws: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut connection)
            .await?;

        keys.into_iter()
            .zip(raws)
            // keys deleted between SCAN and MGET come back empty
            .filter_map(|(key, raw)| raw.map(|raw| (key, raw)))
            .map(|(key, raw)| -> Result<Entry, StoreError> {
                let value = decode(&key, &raw)?;
                Ok(Entry {
                    key,
                    value: Some(value),
                })
            })
            .collect()
    }
}

/// A single user's view of a shared store.
#[derive(Clone)]
pub struct UserStore {
    inner: Arc<dyn KvStore>,
    namespace: String,
}

impl UserStore {
    pub fn new(inner: Arc<dyn KvStore>, user_id: &str) -> Self {
        Self {
            inner,
            namespace: format!("roomify:{user_id}:"),
        }
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}{key}", self.namespace)
    }
}

#[async_trait]
impl KvStore for UserStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get(&self.scoped(key)).await
    }

    async fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.inner.set(&self.scoped(key), value).await
    }

    async fn list(&self, prefix: &str, include_values: bool) -> Result<Vec<Entry>, StoreError> {
        let entries = self.inner.list(&self.scoped(prefix), include_values).await?;

        Ok(entries
            .into_iter()
            .filter_map(|entry| {
                let key = entry.key.strip_prefix(&self.namespace)?.to_string();
                Some(Entry {
                    key,
                    value: entry.value,
                })
            })
            .collect())
    }
}

fn decode(key: &str, raw: &str) -> Result<Value, StoreError> {
    serde_json::from_str(raw).map_err(|source| StoreError::Corrupt {
        key: key.to_string(),
        source,
    })
}

fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
