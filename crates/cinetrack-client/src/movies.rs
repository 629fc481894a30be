//! Cached, offline-tolerant access to the user's collection.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use cinetrack_core::ApiError;
use cinetrack_core::domain::{
    Movie, MovieQuery, MovieUpdate, NewMovie, Page, PendingOperation, StatsQuery, ViewingStats,
};
use cinetrack_core::ports::{MovieBackend, QueryCache};
use cinetrack_infra::ConnectivityMonitor;
use cinetrack_infra::cache::query_key;

use crate::sync::{QueuedMutation, SyncManager};

/// Freshness of cached reads.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Lists and single titles.
    pub list_ttl: Duration,
    /// Aggregates tolerate more staleness.
    pub stats_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            list_ttl: Duration::from_secs(5 * 60),
            stats_ttl: Duration::from_secs(10 * 60),
        }
    }
}

/// What happened to a mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome<T> {
    /// The backend applied it.
    Applied(T),
    /// The backend was unreachable; the mutation waits in the sync queue.
    Queued(PendingOperation),
}

impl<T> MutationOutcome<T> {
    pub fn is_queued(&self) -> bool {
        matches!(self, MutationOutcome::Queued(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            MutationOutcome::Applied(value) => Some(value),
            MutationOutcome::Queued(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct MovieService {
    backend: Arc<dyn MovieBackend>,
    cache: Arc<dyn QueryCache>,
    connectivity: Arc<ConnectivityMonitor>,
    sync: SyncManager,
    config: CacheConfig,
}

impl MovieService {
    pub fn new(
        backend: Arc<dyn MovieBackend>,
        cache: Arc<dyn QueryCache>,
        connectivity: Arc<ConnectivityMonitor>,
        sync: SyncManager,
        config: CacheConfig,
    ) -> Self {
        Self {
            backend,
            cache,
            connectivity,
            sync,
            config,
        }
    }

    pub async fn list(&self, query: &MovieQuery) -> Result<Page<Movie>, ApiError> {
        self.cached("movies.list", query, self.config.list_ttl, || {
            self.backend.list(query)
        })
        .await
    }

    pub async fn get(&self, id: &str) -> Result<Movie, ApiError> {
        self.cached("movies.get", &json!({ "id": id }), self.config.list_ttl, || {
            self.backend.get(id)
        })
        .await
    }

    pub async fn stats(&self, query: &StatsQuery) -> Result<ViewingStats, ApiError> {
        self.cached("analytics.stats", query, self.config.stats_ttl, || {
            self.backend.stats(query)
        })
        .await
    }

    pub async fn create(&self, movie: NewMovie) -> Result<MutationOutcome<Movie>, ApiError> {
        let call = || self.backend.create(&movie);
        self.mutate(QueuedMutation::Create(movie.clone()), call).await
    }

    pub async fn update(
        &self,
        id: &str,
        changes: MovieUpdate,
    ) -> Result<MutationOutcome<Movie>, ApiError> {
        let call = || self.backend.update(id, &changes);
        self.mutate(
            QueuedMutation::Update {
                id: id.to_string(),
                changes: changes.clone(),
            },
            call,
        )
        .await
    }

    pub async fn delete(&self, id: &str) -> Result<MutationOutcome<()>, ApiError> {
        let call = || self.backend.delete(id);
        self.mutate(QueuedMutation::Delete { id: id.to_string() }, call)
            .await
    }

    /// Create several titles in order. Stops at the first hard error.
    pub async fn create_many(
        &self,
        movies: Vec<NewMovie>,
    ) -> Result<Vec<MutationOutcome<Movie>>, ApiError> {
        let mut outcomes = Vec::with_capacity(movies.len());
        for movie in movies {
            outcomes.push(self.create(movie).await?);
        }
        Ok(outcomes)
    }

    /// Delete several titles in order. Stops at the first hard error.
    pub async fn delete_many(&self, ids: &[String]) -> Result<Vec<MutationOutcome<()>>, ApiError> {
        let mut outcomes = Vec::with_capacity(ids.len());
        for id in ids {
            outcomes.push(self.delete(id).await?);
        }
        Ok(outcomes)
    }

    /// Serve from the cache, or fetch and cache the result.
    ///
    /// Cache trouble never fails a read; it only costs a network round trip.
    async fn cached<P, T, F, Fut>(
        &self,
        operation: &str,
        params: &P,
        ttl: Duration,
        fetch: F,
    ) -> Result<T, ApiError>
    where
        P: Serialize,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let key = match query_key(operation, params) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(operation, error = %e, "Uncacheable query");
                return fetch().await;
            }
        };

        if let Some(raw) = self.cache.get(&key).await {
            match serde_json::from_str(&raw) {
                Ok(value) => {
                    tracing::debug!(key = %key, "Cache hit");
                    return Ok(value);
                }
                Err(e) => tracing::warn!(key = %key, error = %e, "Dropping undecodable cache entry"),
            }
        }

        let generation = self.sync.cache_generation();
        let value = fetch().await?;
        if self.sync.cache_generation() != generation {
            tracing::debug!(key = %key, "Cache invalidated during fetch, not caching");
            return Ok(value);
        }
        match serde_json::to_string(&value) {
            Ok(raw) => {
                if let Err(e) = self.cache.set(&key, &raw, ttl).await {
                    tracing::warn!(key = %key, error = %e, "Failed to cache response");
                }
            }
            Err(e) => tracing::warn!(key = %key, error = %e, "Failed to encode response for cache"),
        }
        // An invalidation may have slipped in while the entry was written
        if self.sync.cache_generation() != generation {
            if let Err(e) = self.cache.delete(&key).await {
                tracing::warn!(key = %key, error = %e, "Failed to drop stale cache entry");
            }
        }
        Ok(value)
    }

    /// Run a mutation, or queue it when the backend is out of reach.
    async fn mutate<T, F, Fut>(
        &self,
        mutation: QueuedMutation,
        call: F,
    ) -> Result<MutationOutcome<T>, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if !self.connectivity.is_online() {
            return self.enqueue(&mutation).await;
        }

        match call().await {
            Ok(value) => {
                self.sync.invalidate_cache().await;
                Ok(MutationOutcome::Applied(value))
            }
            Err(e) if e.is_connectivity() => {
                tracing::warn!(op_type = %mutation.op_type(), error = %e, "Backend unreachable, queueing mutation");
                self.enqueue(&mutation).await
            }
            Err(e) => Err(e),
        }
    }

    async fn enqueue<T>(&self, mutation: &QueuedMutation) -> Result<MutationOutcome<T>, ApiError> {
        let op = self
            .sync
            .queue_mutation(mutation)
            .await
            .map_err(|e| ApiError::unknown(e.to_string()))?;
        Ok(MutationOutcome::Queued(op))
    }
}
