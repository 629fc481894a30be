//! Auth endpoints over HTTP.

use std::sync::Arc;

use async_trait::async_trait;

use cinetrack_core::ApiError;
use cinetrack_core::domain::{AuthGrant, RefreshedTokens, TokenGrant, User, UserAttributes};
use cinetrack_core::ports::{AuthBackend, Credentials};
use cinetrack_shared::dto::{
    AuthResponse, CredentialsRequest, RefreshRequest, RefreshResponse, UserPayload,
    UserResponse,
};

use super::client::{ApiClient, RequestOptions};

/// `AuthBackend` speaking to `/auth/*`.
pub struct HttpAuthBackend {
    api: Arc<ApiClient>,
}

impl HttpAuthBackend {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    async fn exchange(&self, endpoint: &str, credentials: &Credentials) -> Result<AuthGrant, ApiError> {
        let body = CredentialsRequest {
            email: credentials.email.clone(),
            password: credentials.password.clone(),
        };
        let response: AuthResponse = self.api.post(endpoint, &body).await?;

        Ok(AuthGrant {
            user: user_from_payload(response.user),
            tokens: TokenGrant {
                access_token: response.session.access_token,
                refresh_token: response.session.refresh_token.unwrap_or_default(),
                expires_in: response.session.expires_in,
                expires_at: response.session.expires_at,
                token_type: response.session.token_type,
            },
        })
    }

    async fn user_request(&self, options: RequestOptions) -> Result<User, ApiError> {
        let value = self.api.request("/auth/user", options).await?;
        let body: UserResponse = serde_json::from_value(value)
            .map_err(|e| ApiError::unknown(format!("Unexpected user payload: {e}")))?;
        Ok(user_from_payload(body.into_user()))
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn sign_up(&self, credentials: &Credentials) -> Result<AuthGrant, ApiError> {
        self.exchange("/auth/signup", credentials).await
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthGrant, ApiError> {
        self.exchange("/auth/signin", credentials).await
    }

    async fn sign_out(&self) -> Result<(), ApiError> {
        self.api
            .request("/auth/signout", RequestOptions::post(None))
            .await?;
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, ApiError> {
        let body = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };
        let response: RefreshResponse = self.api.post("/auth/refresh", &body).await?;

        Ok(RefreshedTokens {
            access_token: response.session.access_token,
            refresh_token: response.session.refresh_token,
            expires_in: response.session.expires_in,
            expires_at: response.session.expires_at,
            token_type: response.session.token_type,
            user: response.user.map(user_from_payload),
        })
    }

    async fn get_user(&self) -> Result<User, ApiError> {
        self.user_request(RequestOptions::get()).await
    }

    async fn update_user(&self, attributes: &UserAttributes) -> Result<User, ApiError> {
        let body = serde_json::to_value(attributes)
            .map_err(|e| ApiError::unknown(format!("Invalid request body: {e}")))?;
        self.user_request(RequestOptions::put(body)).await
    }
}

fn user_from_payload(payload: UserPayload) -> User {
    User {
        id: payload.id,
        email: payload.email.unwrap_or_default(),
        email_confirmed_at: payload.email_confirmed_at,
        created_at: payload.created_at,
        updated_at: payload.updated_at,
        user_metadata: payload.user_metadata,
        app_metadata: payload.app_metadata,
    }
}
