//! Typed JSON values stored under a single storage key.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use cinetrack_core::domain::{PendingOperation, Session};
use cinetrack_core::ports::{Storage, StorageError};

/// Key holding the serialized session.
pub const SESSION_KEY: &str = "cinetrack.auth.session";

/// Key holding the offline operation queue.
pub const PENDING_OPERATIONS_KEY: &str = "cinetrack.sync.pending";

/// A JSON-serialized value living under one storage key.
pub struct Persisted<T> {
    storage: Arc<dyn Storage>,
    key: String,
    _value: PhantomData<fn() -> T>,
}

impl<T> Clone for Persisted<T> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            key: self.key.clone(),
            _value: PhantomData,
        }
    }
}

impl<T: Serialize + DeserializeOwned> Persisted<T> {
    pub fn with_key(storage: Arc<dyn Storage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            _value: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the stored value.
    ///
    /// An undecodable blob is discarded and reported as absent.
    pub async fn load(&self) -> Result<Option<T>, StorageError> {
        let Some(raw) = self.storage.get(&self.key).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Discarding unreadable stored value");
                self.storage.remove(&self.key).await?;
                Ok(None)
            }
        }
    }

    pub async fn save(&self, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)?;
        self.storage.set(&self.key, &raw).await
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(&self.key).await
    }
}

/// Durable slot for the current session.
pub type SessionStore = Persisted<Session>;

impl Persisted<Session> {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_key(storage, SESSION_KEY)
    }
}

/// Durable slot for the offline operation queue.
pub type PendingStore = Persisted<Vec<PendingOperation>>;

impl Persisted<Vec<PendingOperation>> {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_key(storage, PENDING_OPERATIONS_KEY)
    }
}
