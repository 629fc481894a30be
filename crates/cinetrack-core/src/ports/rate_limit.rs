//! Rate limiting port.

use async_trait::async_trait;
use std::time::Duration;

/// Rate limiter that delays instead of rejecting.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Wait until a request slot is free and claim it.
    /// Returns how long the caller was held back.
    async fn acquire(&self) -> Duration;
}
