//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod cache;
mod clock;
mod movies;
mod rate_limit;
mod storage;

pub use auth::{AuthBackend, AuthError, BearerToken, Credentials, TokenClaims, TokenDecoder};
pub use cache::{CacheError, QueryCache};
pub use clock::Clock;
pub use movies::MovieBackend;
pub use rate_limit::RateLimiter;
pub use storage::{Storage, StorageError};
