//! Composition root: wires adapters and services into one client.

use std::sync::Arc;

use cinetrack_core::ports::{
    AuthBackend, BearerToken, Clock, MovieBackend, QueryCache, Storage,
};
use cinetrack_infra::{
    ApiClient, ConnectivityMonitor, FileStorage, HttpAuthBackend, HttpMovieBackend,
    InMemoryCache, InMemoryStorage, JwtTokenDecoder, MetadataClient, PendingStore, SessionStore,
    SlidingWindowLimiter, SystemClock,
};

use crate::auth::AuthService;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::movies::MovieService;
use crate::sync::SyncManager;

/// A fully wired CineTrack client.
pub struct CineTrack {
    api: Arc<ApiClient>,
    connectivity: Arc<ConnectivityMonitor>,
    auth: AuthService,
    sync: SyncManager,
    movies: MovieService,
    metadata: Arc<MetadataClient>,
}

impl CineTrack {
    /// Build the client from configuration, restore persisted state and
    /// start background tasks.
    pub async fn init(config: ClientConfig) -> Result<Self, ClientError> {
        Self::builder(config).build().await
    }

    pub fn builder(config: ClientConfig) -> CineTrackBuilder {
        CineTrackBuilder::new(config)
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn sync(&self) -> &SyncManager {
        &self.sync
    }

    pub fn movies(&self) -> &MovieService {
        &self.movies
    }

    pub fn metadata(&self) -> &MetadataClient {
        &self.metadata
    }

    /// Stop background tasks and drop auth listeners.
    pub fn dispose(&self) {
        self.auth.dispose();
        self.sync.dispose();
        tracing::info!("CineTrack client disposed");
    }
}

/// Builder for [`CineTrack`], letting hosts swap in their own adapters.
pub struct CineTrackBuilder {
    config: ClientConfig,
    storage: Option<Arc<dyn Storage>>,
    clock: Option<Arc<dyn Clock>>,
    connectivity: Option<Arc<ConnectivityMonitor>>,
    cache: Option<Arc<dyn QueryCache>>,
    auth_backend: Option<Arc<dyn AuthBackend>>,
    movie_backend: Option<Arc<dyn MovieBackend>>,
}

impl CineTrackBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            storage: None,
            clock: None,
            connectivity: None,
            cache: None,
            auth_backend: None,
            movie_backend: None,
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Share a monitor the host feeds with platform connectivity events.
    pub fn with_connectivity(mut self, connectivity: Arc<ConnectivityMonitor>) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_auth_backend(mut self, backend: Arc<dyn AuthBackend>) -> Self {
        self.auth_backend = Some(backend);
        self
    }

    pub fn with_movie_backend(mut self, backend: Arc<dyn MovieBackend>) -> Self {
        self.movie_backend = Some(backend);
        self
    }

    pub async fn build(self) -> Result<CineTrack, ClientError> {
        let config = self.config;

        let storage: Arc<dyn Storage> = match (self.storage, &config.storage_dir) {
            (Some(storage), _) => storage,
            (None, Some(dir)) => Arc::new(FileStorage::open(dir).await?),
            (None, None) => Arc::new(InMemoryStorage::new()),
        };
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let cache: Arc<dyn QueryCache> = match self.cache {
            Some(cache) => cache,
            None => Arc::new(InMemoryCache::new()),
        };
        let connectivity = self.connectivity.unwrap_or_default();

        // One token slot shared by every request the client sends
        let token = BearerToken::new();
        let api = Arc::new(ApiClient::new(&config.api, token.clone())?);

        let auth_backend: Arc<dyn AuthBackend> = match self.auth_backend {
            Some(backend) => backend,
            None => Arc::new(HttpAuthBackend::new(api.clone())),
        };
        let movie_backend: Arc<dyn MovieBackend> = match self.movie_backend {
            Some(backend) => backend,
            None => Arc::new(HttpMovieBackend::new(api.clone())),
        };

        let auth = AuthService::new(
            auth_backend,
            Arc::new(JwtTokenDecoder::new()),
            SessionStore::new(storage.clone()),
            token,
            clock,
            config.auth.clone(),
        );
        let sync = SyncManager::new(
            movie_backend.clone(),
            cache.clone(),
            connectivity.clone(),
            PendingStore::new(storage),
            config.sync.clone(),
        );
        let movies = MovieService::new(
            movie_backend,
            cache,
            connectivity.clone(),
            sync.clone(),
            config.cache.clone(),
        );
        let limiter = Arc::new(SlidingWindowLimiter::new(
            config.metadata_rate_limit.clone(),
        ));
        let metadata = Arc::new(MetadataClient::new(&config.metadata, limiter)?);

        let state = auth.init().await;
        let restored = sync.init().await?;

        tracing::info!(
            api = %api.base_url(),
            signed_in = state.is_signed_in(),
            pending = restored,
            online = connectivity.is_online(),
            "CineTrack client initialized"
        );

        Ok(CineTrack {
            api,
            connectivity,
            auth,
            sync,
            movies,
            metadata,
        })
    }
}
