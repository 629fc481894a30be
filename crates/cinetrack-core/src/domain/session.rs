use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::User;

/// Token material returned by sign-in and sign-up.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    /// Absolute expiry if the server supplied one.
    pub expires_at: Option<i64>,
    pub token_type: Option<String>,
}

/// Result of a successful credential exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthGrant {
    pub user: User,
    pub tokens: TokenGrant,
}

/// Result of a refresh call. Anything the server leaves out is carried over
/// from the previous session.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshedTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub expires_at: Option<i64>,
    pub token_type: Option<String>,
    pub user: Option<User>,
}

/// Session - the token pair proving an authenticated identity.
///
/// `expires_at` is always populated. A session with `expires_at <= now` must
/// not authorize a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub expires_at: i64,
    pub token_type: String,
    pub user: User,
}

impl Session {
    /// Build a session from a fresh grant.
    pub fn from_grant(grant: AuthGrant, now: DateTime<Utc>) -> Self {
        let AuthGrant { user, tokens } = grant;
        Self {
            expires_at: tokens
                .expires_at
                .unwrap_or_else(|| now.timestamp() + tokens.expires_in),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
            token_type: tokens.token_type.unwrap_or_else(default_token_type),
            user,
        }
    }

    /// Successor session after a refresh.
    pub fn renewed(&self, refreshed: RefreshedTokens, now: DateTime<Utc>) -> Self {
        Self {
            expires_at: refreshed
                .expires_at
                .unwrap_or_else(|| now.timestamp() + refreshed.expires_in),
            access_token: refreshed.access_token,
            refresh_token: refreshed
                .refresh_token
                .unwrap_or_else(|| self.refresh_token.clone()),
            expires_in: refreshed.expires_in,
            token_type: refreshed
                .token_type
                .unwrap_or_else(|| self.token_type.clone()),
            user: refreshed.user.unwrap_or_else(|| self.user.clone()),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now.timestamp()
    }

    /// Seconds until expiry; zero or negative once expired.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        self.expires_at - now.timestamp()
    }
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Snapshot handed back by `get_session`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub session: Option<Session>,
    pub user: Option<User>,
}

impl AuthState {
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }
}

impl From<Session> for AuthState {
    fn from(session: Session) -> Self {
        Self {
            user: Some(session.user.clone()),
            session: Some(session),
        }
    }
}

/// What happened to the session, delivered to auth listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedUp,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}
