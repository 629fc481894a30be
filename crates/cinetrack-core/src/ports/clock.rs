use chrono::{DateTime, Utc};

/// Wall-clock source used for token expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
