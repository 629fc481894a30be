//! Auth state listeners.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use cinetrack_core::domain::{AuthEvent, User};

/// Callback invoked after each auth event.
pub type AuthCallback = dyn Fn(AuthEvent, Option<&User>) + Send + Sync;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Arc<AuthCallback>)>,
}

/// Ordered set of auth listeners.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(inner: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
        inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(AuthEvent, Option<&User>) + Send + Sync + 'static,
    {
        let mut registry = Self::lock(&self.inner);
        registry.next_id += 1;
        let id = registry.next_id;
        registry.listeners.push((id, Arc::new(callback)));

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Call every listener in registration order.
    ///
    /// Listeners run outside the registry lock, so a callback may subscribe
    /// or unsubscribe without deadlocking.
    pub fn notify(&self, event: AuthEvent, user: Option<&User>) {
        let snapshot: Vec<Arc<AuthCallback>> = Self::lock(&self.inner)
            .listeners
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();

        tracing::debug!(event = ?event, listeners = snapshot.len(), "Notifying auth listeners");
        for callback in snapshot {
            callback(event, user);
        }
    }

    pub fn len(&self) -> usize {
        Self::lock(&self.inner).listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        Self::lock(&self.inner).listeners.clear();
    }
}

/// Handle returned by `on_auth_state_change`.
///
/// Dropping the handle keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remove exactly this listener. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        let Some(inner) = self.registry.upgrade() else {
            return false;
        };
        let mut registry = ListenerRegistry::lock(&inner);
        let before = registry.listeners.len();
        registry.listeners.retain(|(id, _)| *id != self.id);
        registry.listeners.len() != before
    }
}
