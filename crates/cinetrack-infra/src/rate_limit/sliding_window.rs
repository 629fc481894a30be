//! Sliding-window rate limiter that delays callers instead of rejecting them.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use cinetrack_core::ports::RateLimiter;

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Window duration.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 40,
            window: Duration::from_secs(10),
        }
    }
}

/// Admits at most `max_requests` per sliding `window`.
///
/// A caller beyond the limit sleeps until the oldest admitted request falls
/// out of the window, so every caller eventually gets through.
pub struct SlidingWindowLimiter {
    admitted: Mutex<VecDeque<Instant>>,
    config: RateLimitConfig,
}

impl SlidingWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let config = RateLimitConfig {
            max_requests: config.max_requests.max(1),
            ..config
        };
        Self {
            admitted: Mutex::new(VecDeque::with_capacity(config.max_requests as usize)),
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Claim a slot now, or report how long until one frees up.
    async fn try_claim(&self) -> Result<(), Duration> {
        let mut admitted = self.admitted.lock().await;
        let now = Instant::now();

        while let Some(oldest) = admitted.front() {
            if now.duration_since(*oldest) >= self.config.window {
                admitted.pop_front();
            } else {
                break;
            }
        }

        if admitted.len() < self.config.max_requests as usize {
            admitted.push_back(now);
            return Ok(());
        }

        match admitted.front() {
            Some(oldest) => Err(self.config.window - now.duration_since(*oldest)),
            None => Ok(()),
        }
    }
}

impl Default for SlidingWindowLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

#[async_trait]
impl RateLimiter for SlidingWindowLimiter {
    async fn acquire(&self) -> Duration {
        let mut waited = Duration::ZERO;
        loop {
            match self.try_claim().await {
                Ok(()) => return waited,
                Err(wait) => {
                    tracing::debug!(wait_ms = wait.as_millis() as u64, "Rate limit reached, delaying request");
                    tokio::time::sleep(wait).await;
                    waited += wait;
                }
            }
        }
    }
}
