//! HTTP client - the single network egress point of the CineTrack client.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use cinetrack_core::ApiError;
use cinetrack_core::ports::BearerToken;
use cinetrack_shared::ErrorBody;

/// API client configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL every endpoint is appended to.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Per-request options merged over the client defaults.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: Option<Value>) -> Self {
        Self {
            method: Method::POST,
            body,
            ..Self::default()
        }
    }

    pub fn put(body: Value) -> Self {
        Self {
            method: Method::PUT,
            body: Some(body),
            ..Self::default()
        }
    }

    pub fn delete() -> Self {
        Self {
            method: Method::DELETE,
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }
}

/// JSON-over-HTTP client carrying the shared bearer token.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: BearerToken,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, token: BearerToken) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::unknown(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::with_http(http, &config.base_url, token))
    }

    pub fn with_http(http: reqwest::Client, base_url: &str, token: BearerToken) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replace the bearer token used by subsequent requests.
    /// In-flight requests keep the token they were sent with.
    pub fn set_token(&self, token: Option<String>) {
        self.token.set(token);
    }

    pub fn token(&self) -> &BearerToken {
        &self.token
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    fn headers(&self, options: &RequestOptions) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = self.token.get() {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ApiError::unknown(format!("Invalid bearer token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::unknown(format!("Invalid header name {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ApiError::unknown(format!("Invalid header value: {e}")))?;
            headers.insert(name, value);
        }

        Ok(headers)
    }

    /// Send a request and return the decoded JSON body.
    ///
    /// `204 No Content` and empty bodies resolve to `Value::Null`.
    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> Result<Value, ApiError> {
        let url = self.url(endpoint);
        let mut builder = self
            .http
            .request(options.method.clone(), &url)
            .headers(self.headers(&options)?);

        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(body) = &options.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(endpoint = %endpoint, error = %e, "Request failed before a response");
            ApiError::network(e.to_string())
        })?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        let text = response
            .text()
            .await
            .map_err(|e| ApiError::network(e.to_string()))?;

        if !status.is_success() {
            let error = error_from_body(status.as_u16(), &text);
            tracing::debug!(
                endpoint = %endpoint,
                status = status.as_u16(),
                kind = ?error.kind,
                "Request rejected"
            );
            return Err(error);
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text)
            .map_err(|e| ApiError::unknown(format!("Invalid response body: {e}")))
    }

    /// Send a request and decode the body into `T`.
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let value = self.request(endpoint, options).await?;
        serde_json::from_value(value)
            .map_err(|e| ApiError::unknown(format!("Unexpected response shape: {e}")))
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.request_as(endpoint, RequestOptions::get()).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request_as(endpoint, RequestOptions::post(Some(to_body(body)?)))
            .await
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request_as(endpoint, RequestOptions::put(to_body(body)?))
            .await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<(), ApiError> {
        self.request(endpoint, RequestOptions::delete()).await?;
        Ok(())
    }
}

fn to_body<B: Serialize>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::unknown(format!("Invalid request body: {e}")))
}

/// Build the typed error for a non-2xx response.
fn error_from_body(status: u16, body: &str) -> ApiError {
    match ErrorBody::parse(body) {
        Some(parsed) => {
            let message = parsed
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| ApiError::default_message(status));
            ApiError::http(status, message, parsed.code)
        }
        None => ApiError::http(status, ApiError::default_message(status), None),
    }
}

/// Flatten a serializable filter into query pairs, skipping nulls.
pub fn query_pairs<T: Serialize>(params: &T) -> Vec<(String, String)> {
    let Ok(Value::Object(map)) = serde_json::to_value(params) else {
        return Vec::new();
    };

    map.into_iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) => Some((key, s)),
            Value::Array(items) => {
                let joined = items
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                Some((key, joined))
            }
            other => Some((key, other.to_string())),
        })
        .collect()
}
