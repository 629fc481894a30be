//! Data Transfer Objects - request/response bodies of the auth API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /auth/signin` and `POST /auth/signup`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /auth/refresh`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// User as returned by the auth API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_metadata: Map<String, Value>,
    #[serde(default)]
    pub app_metadata: Map<String, Value>,
}

/// Token block of an auth response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Response of sign-in and sign-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserPayload,
    pub session: SessionPayload,
}

/// Response of `POST /auth/refresh`: a flat token block, optionally with the
/// current user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    #[serde(flatten)]
    pub session: SessionPayload,
    #[serde(default)]
    pub user: Option<UserPayload>,
}

/// Response of `GET /auth/user` and `PUT /auth/user`: wrapped in `user`
/// or bare.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserResponse {
    Wrapped { user: UserPayload },
    Bare(UserPayload),
}

impl UserResponse {
    pub fn into_user(self) -> UserPayload {
        match self {
            UserResponse::Wrapped { user } | UserResponse::Bare(user) => user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_response_without_user() {
        let body: RefreshResponse =
            serde_json::from_str(r#"{"accessToken":"t2","expiresIn":3600}"#).unwrap();
        assert_eq!(body.session.access_token, "t2");
        assert!(body.session.refresh_token.is_none());
        assert!(body.user.is_none());
    }

    #[test]
    fn test_user_response_wrapped_or_bare() {
        let wrapped: UserResponse =
            serde_json::from_str(r#"{"user":{"id":"u1","email":"a@b.com"}}"#).unwrap();
        assert!(matches!(wrapped, UserResponse::Wrapped { .. }));
        assert_eq!(wrapped.into_user().email.as_deref(), Some("a@b.com"));

        let bare: UserResponse = serde_json::from_str(r#"{"id":"u2"}"#).unwrap();
        assert_eq!(bare.into_user().id, "u2");
    }

    #[test]
    fn test_auth_response_shape() {
        let body: AuthResponse = serde_json::from_str(
            r#"{"user":{"id":"u1","email":"a@b.com"},
                "session":{"accessToken":"t1","refreshToken":"r1","expiresIn":3600}}"#,
        )
        .unwrap();
        assert_eq!(body.user.id, "u1");
        assert_eq!(body.session.refresh_token.as_deref(), Some("r1"));
    }
}
