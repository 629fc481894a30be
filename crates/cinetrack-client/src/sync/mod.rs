//! Offline queue and background synchronization.

mod manager;
mod mutation;

pub use manager::{SyncConfig, SyncManager, SyncReport};
pub use mutation::QueuedMutation;
