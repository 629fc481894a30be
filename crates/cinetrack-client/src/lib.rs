//! # CineTrack Client
//!
//! Application services of the CineTrack client: the session lifecycle
//! manager, the offline operation queue, and cached access to the user's
//! collection. [`CineTrack`] wires them together.

pub mod app;
pub mod auth;
pub mod background;
pub mod config;
pub mod error;
pub mod movies;
pub mod sync;

#[cfg(feature = "telemetry")]
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use app::{CineTrack, CineTrackBuilder};
pub use auth::{AuthConfig, AuthService, FederatedTokens, Subscription};
pub use config::ClientConfig;
pub use error::ClientError;
pub use movies::{CacheConfig, MovieService, MutationOutcome};
pub use sync::{SyncConfig, SyncManager, SyncReport};
