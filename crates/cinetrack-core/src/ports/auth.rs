//! Authentication ports.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::domain::{AuthGrant, RefreshedTokens, User, UserAttributes};
use crate::error::ApiError;

/// Email/password pair sent to sign-in and sign-up.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Backend auth endpoints.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Register a new account.
    async fn sign_up(&self, credentials: &Credentials) -> Result<AuthGrant, ApiError>;

    /// Exchange credentials for a session.
    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthGrant, ApiError>;

    /// Invalidate the server-side session for the current bearer token.
    async fn sign_out(&self) -> Result<(), ApiError>;

    /// Exchange a refresh token for a new access token.
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, ApiError>;

    /// Fetch the profile for the current bearer token.
    async fn get_user(&self) -> Result<User, ApiError>;

    /// Apply profile changes and return the new profile.
    async fn update_user(&self, attributes: &UserAttributes) -> Result<User, ApiError>;
}

/// Claims read from an access token without verifying its signature.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenClaims {
    pub sub: Option<String>,
    pub email: Option<String>,
    pub exp: Option<i64>,
    pub user_metadata: Map<String, Value>,
    pub app_metadata: Map<String, Value>,
}

impl TokenClaims {
    /// User record built from whatever the claims carry.
    pub fn to_user(&self) -> User {
        User {
            user_metadata: self.user_metadata.clone(),
            app_metadata: self.app_metadata.clone(),
            ..User::minimal(
                self.sub.clone().unwrap_or_default(),
                self.email.clone().unwrap_or_default(),
            )
        }
    }
}

/// Decodes tokens handed over by a federated-login callback.
pub trait TokenDecoder: Send + Sync {
    fn decode(&self, access_token: &str) -> Result<TokenClaims, AuthError>;
}

/// The process-wide bearer token read by every outgoing request.
///
/// Cloning shares the same slot. Only the auth service writes to it.
#[derive(Debug, Clone, Default)]
pub struct BearerToken {
    inner: Arc<RwLock<Option<String>>>,
}

impl BearerToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<String> {
        match self.inner.read() {
            Ok(token) => token.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set(&self, token: Option<String>) {
        match self.inner.write() {
            Ok(mut slot) => *slot = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }
}

/// Authentication errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    /// The backend rejected the call; the message is the server's own.
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("No refresh token available")]
    MissingRefreshToken,

    #[error("No active session")]
    NoSession,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_is_shared_between_clones() {
        let token = BearerToken::new();
        let reader = token.clone();

        token.set(Some("t1".to_string()));
        assert_eq!(reader.get().as_deref(), Some("t1"));

        token.set(None);
        assert_eq!(reader.get(), None);
    }

    #[test]
    fn test_api_error_message_is_verbatim() {
        let err = AuthError::from(ApiError::http(400, "Email already registered", None));
        assert_eq!(err.to_string(), "Email already registered");
    }

    #[test]
    fn test_claims_to_minimal_user() {
        let claims = TokenClaims {
            sub: Some("u1".to_string()),
            ..TokenClaims::default()
        };
        let user = claims.to_user();
        assert_eq!(user.id, "u1");
        assert_eq!(user.email, "");
    }
}
