//! Session lifecycle management.

mod listeners;
mod service;

pub use listeners::{AuthCallback, ListenerRegistry, Subscription};
pub use service::{AuthConfig, AuthService, FederatedTokens};
