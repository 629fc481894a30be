//! Connectivity tracking.
//!
//! Hosts forward platform online/offline signals into the monitor; services
//! read the current flag or subscribe to transitions.

use tokio::sync::watch;

/// Process-wide online/offline flag.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    state: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    /// Create a monitor seeded with the startup connectivity check.
    pub fn new(initially_online: bool) -> Self {
        let (state, _) = watch::channel(initially_online);
        Self { state }
    }

    pub fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    /// Record a connectivity signal. Returns true if the flag changed.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });

        if changed {
            tracing::info!(online, "Connectivity changed");
        }
        changed
    }

    /// Receiver that observes every change of the flag.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transitions_reach_subscribers() {
        let monitor = ConnectivityMonitor::new(false);
        let mut rx = monitor.subscribe();

        assert!(monitor.set_online(true));
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());
        assert!(monitor.is_online());
    }

    #[test]
    fn test_repeated_signal_is_not_a_change() {
        let monitor = ConnectivityMonitor::new(true);
        assert!(!monitor.set_online(true));
        assert!(monitor.set_online(false));
        assert!(!monitor.is_online());
    }
}
