//! # CineTrack Infrastructure
//!
//! Concrete implementations of the ports defined in `cinetrack-core`.
//! This crate contains the HTTP client, storage, cache and timing adapters.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No token decoding
//! - `jwt` - Unverified JWT claim decoding for federated logins

pub mod api;
pub mod cache;
pub mod clock;
pub mod connectivity;
pub mod rate_limit;
pub mod storage;

#[cfg(feature = "jwt")]
pub mod auth;

// Re-exports
pub use api::{
    ApiClient, ApiConfig, HttpAuthBackend, HttpMovieBackend, MetadataClient, MetadataConfig,
    MetadataMatch, RequestOptions,
};
pub use cache::InMemoryCache;
pub use clock::{ManualClock, SystemClock};
pub use connectivity::ConnectivityMonitor;
pub use rate_limit::{RateLimitConfig, SlidingWindowLimiter};
pub use storage::{FileStorage, InMemoryStorage, PendingStore, Persisted, SessionStore};

#[cfg(feature = "jwt")]
pub use auth::JwtTokenDecoder;
