//! Storage implementations - in-memory and file-backed key/value stores, and
//! typed JSON slots on top of them.

mod file;
mod memory;
mod persisted;

pub use file::FileStorage;
pub use memory::InMemoryStorage;
pub use persisted::{PENDING_OPERATIONS_KEY, PendingStore, Persisted, SESSION_KEY, SessionStore};
