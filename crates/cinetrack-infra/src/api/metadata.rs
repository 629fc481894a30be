//! Rate-limited client for the third-party title metadata API.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use cinetrack_core::ApiError;
use cinetrack_core::domain::MediaType;
use cinetrack_core::ports::{BearerToken, RateLimiter};

use super::client::{ApiClient, ApiConfig, RequestOptions};

/// Metadata API configuration.
#[derive(Debug, Clone)]
pub struct MetadataConfig {
    pub base_url: String,
    /// Sent as the `api_key` query parameter.
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.themoviedb.org/3".to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// A search hit from the metadata API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataMatch {
    pub external_id: u64,
    pub title: String,
    pub media_type: MediaType,
    pub release_year: Option<i32>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: u64,
    media_type: Option<String>,
    title: Option<String>,
    name: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
}

impl SearchResult {
    /// People and other non-title results are dropped.
    fn into_match(self) -> Option<MetadataMatch> {
        let media_type = match self.media_type.as_deref() {
            Some("movie") => MediaType::Movie,
            Some("tv") => MediaType::Series,
            _ => return None,
        };
        let title = self.title.or(self.name)?;
        let release_year = self
            .release_date
            .or(self.first_air_date)
            .and_then(|d| d.get(..4).and_then(|y| y.parse().ok()));

        Some(MetadataMatch {
            external_id: self.id,
            title,
            media_type,
            release_year,
            overview: self.overview.filter(|o| !o.is_empty()),
            poster_path: self.poster_path,
        })
    }
}

/// Title lookup against the metadata provider.
///
/// Every request passes through the rate limiter first; callers over the
/// provider's quota are delayed rather than failed.
pub struct MetadataClient {
    api: ApiClient,
    api_key: Option<String>,
    limiter: Arc<dyn RateLimiter>,
}

impl MetadataClient {
    pub fn new(config: &MetadataConfig, limiter: Arc<dyn RateLimiter>) -> Result<Self, ApiError> {
        let api = ApiClient::new(
            &ApiConfig {
                base_url: config.base_url.clone(),
                timeout: config.timeout,
            },
            // The provider authenticates by API key, never with the user's token
            BearerToken::new(),
        )?;
        Ok(Self::with_api(api, config.api_key.clone(), limiter))
    }

    pub fn with_api(api: ApiClient, api_key: Option<String>, limiter: Arc<dyn RateLimiter>) -> Self {
        Self {
            api,
            api_key,
            limiter,
        }
    }

    /// Search movies and series by title.
    pub async fn search(&self, query: &str) -> Result<Vec<MetadataMatch>, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let waited = self.limiter.acquire().await;
        if !waited.is_zero() {
            tracing::debug!(waited_ms = waited.as_millis() as u64, "Metadata request delayed by rate limit");
        }

        let mut params = vec![("query".to_string(), query.to_string())];
        if let Some(key) = &self.api_key {
            params.push(("api_key".to_string(), key.clone()));
        }

        let page: SearchPage = self
            .api
            .request_as("/search/multi", RequestOptions::get().with_query(params))
            .await?;

        Ok(page
            .results
            .into_iter()
            .filter_map(SearchResult::into_match)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_server::{self, Recorded};
    use crate::rate_limit::{RateLimitConfig, SlidingWindowLimiter};
    use axum::Json;
    use axum::extract::Query;
    use axum::routing::get;
    use serde_json::json;
    use std::collections::HashMap;

    async fn client(recorded: Recorded) -> MetadataClient {
        let router = axum::Router::new().route(
            "/search/multi",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let recorded = recorded.clone();
                async move {
                    recorded.push(format!(
                        "{}|{}",
                        params.get("query").cloned().unwrap_or_default(),
                        params.get("api_key").cloned().unwrap_or_default()
                    ));
                    Json(json!({"results": [
                        {"id": 1, "media_type": "movie", "title": "Dune", "release_date": "2021-10-22"},
                        {"id": 2, "media_type": "tv", "name": "Dune: Prophecy", "first_air_date": "2024-11-17", "overview": ""},
                        {"id": 3, "media_type": "person", "name": "Denis Villeneuve"}
                    ]}))
                }
            }),
        );
        let base = test_server::spawn(router).await;
        let api = ApiClient::with_http(reqwest::Client::new(), &base, BearerToken::new());
        let limiter = Arc::new(SlidingWindowLimiter::new(RateLimitConfig {
            max_requests: 5,
            window: Duration::from_secs(1),
        }));
        MetadataClient::with_api(api, Some("k1".to_string()), limiter)
    }

    #[tokio::test]
    async fn test_search_maps_titles_and_drops_people() {
        let recorded = Recorded::default();
        let client = client(recorded.clone()).await;

        let matches = client.search(" dune ").await.unwrap();

        assert_eq!(recorded.take(), vec!["dune|k1"]);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].media_type, MediaType::Movie);
        assert_eq!(matches[0].release_year, Some(2021));
        assert_eq!(matches[1].title, "Dune: Prophecy");
        assert_eq!(matches[1].media_type, MediaType::Series);
        assert_eq!(matches[1].overview, None);
    }

    #[tokio::test]
    async fn test_blank_query_skips_network() {
        let recorded = Recorded::default();
        let client = client(recorded.clone()).await;

        assert!(client.search("   ").await.unwrap().is_empty());
        assert!(recorded.take().is_empty());
    }
}
