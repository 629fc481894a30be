//! In-memory query cache with per-entry TTL.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;

use cinetrack_core::ports::{CacheError, QueryCache};

struct CacheEntry {
    value: String,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self) -> bool {
        self.stored_at.elapsed() < self.ttl
    }
}

/// In-memory cache using a HashMap behind an async RwLock.
///
/// Note: Data is lost on process restart.
pub struct InMemoryCache {
    store: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
        }
    }

    /// Number of entries, fresh or not.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryCache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let store = self.store.read().await;
        let entry = store.get(key)?;

        if !entry.is_fresh() {
            drop(store);
            // Clean up expired entry with write lock
            let mut store = self.store.write().await;
            if store.get(key).is_some_and(|e| !e.is_fresh()) {
                store.remove(key);
            }
            return None;
        }

        Some(entry.value.clone())
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut store = self.store.write().await;

        store.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                stored_at: Instant::now(),
                ttl,
            },
        );

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.store.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut store = self.store.write().await;
        let dropped = store.len();
        store.clear();
        tracing::debug!(dropped, "Query cache cleared");
        Ok(())
    }
}

/// Deterministic cache key for a query: the operation name followed by the
/// parameters as JSON with sorted keys and null fields dropped.
pub fn query_key<P: Serialize>(operation: &str, params: &P) -> Result<String, CacheError> {
    let value =
        serde_json::to_value(params).map_err(|e| CacheError::Serialization(e.to_string()))?;
    Ok(format!("{operation}:{}", normalize(value)))
}

fn normalize(value: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, normalize(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        other => other,
    }
}
