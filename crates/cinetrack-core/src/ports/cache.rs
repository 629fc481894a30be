use async_trait::async_trait;
use std::time::Duration;

/// Query cache - short-lived storage of read results keyed by query shape.
#[async_trait]
pub trait QueryCache: Send + Sync {
    /// Get a fresh value; expired entries are treated as absent.
    async fn get(&self, key: &str) -> Option<String>;

    /// Store a value that stays fresh for `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Delete a single key.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Drop every entry.
    async fn clear(&self) -> Result<(), CacheError>;
}

/// Cache operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}
