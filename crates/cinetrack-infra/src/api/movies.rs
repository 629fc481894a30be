//! Collection and analytics endpoints over HTTP.

use std::sync::Arc;

use async_trait::async_trait;

use cinetrack_core::ApiError;
use cinetrack_core::domain::{Movie, MovieQuery, MovieUpdate, NewMovie, Page, StatsQuery, ViewingStats};
use cinetrack_core::ports::MovieBackend;

use super::client::{ApiClient, RequestOptions, query_pairs};

/// `MovieBackend` speaking to `/movies` and `/analytics`.
pub struct HttpMovieBackend {
    api: Arc<ApiClient>,
}

impl HttpMovieBackend {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl MovieBackend for HttpMovieBackend {
    async fn list(&self, query: &MovieQuery) -> Result<Page<Movie>, ApiError> {
        self.api
            .request_as("/movies", RequestOptions::get().with_query(query_pairs(query)))
            .await
    }

    async fn get(&self, id: &str) -> Result<Movie, ApiError> {
        self.api.get(&format!("/movies/{id}")).await
    }

    async fn create(&self, movie: &NewMovie) -> Result<Movie, ApiError> {
        self.api.post("/movies", movie).await
    }

    async fn update(&self, id: &str, changes: &MovieUpdate) -> Result<Movie, ApiError> {
        self.api.put(&format!("/movies/{id}"), changes).await
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.api.delete(&format!("/movies/{id}")).await
    }

    async fn stats(&self, query: &StatsQuery) -> Result<ViewingStats, ApiError> {
        self.api
            .request_as(
                "/analytics/stats",
                RequestOptions::get().with_query(query_pairs(query)),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_server::{self, Recorded};
    use axum::Json;
    use axum::extract::{Path, Query};
    use axum::routing::{get, put};
    use cinetrack_core::domain::{StatsBucket, WatchStatus};
    use cinetrack_core::ports::BearerToken;
    use serde_json::{Value, json};
    use std::collections::HashMap;

    async fn backend(router: axum::Router) -> HttpMovieBackend {
        let base = test_server::spawn(router).await;
        let api = ApiClient::with_http(reqwest::Client::new(), &base, BearerToken::new());
        HttpMovieBackend::new(Arc::new(api))
    }

    fn movie_json(id: &str) -> Value {
        json!({"id": id, "title": "Dune", "mediaType": "movie", "status": "watching"})
    }

    #[tokio::test]
    async fn test_list_sends_filters_as_query() {
        let recorded = Recorded::default();
        let seen = recorded.clone();
        let router = axum::Router::new().route(
            "/movies",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let seen = seen.clone();
                async move {
                    let mut keys: Vec<_> = params
                        .iter()
                        .map(|(k, v)| format!("{k}={v}"))
                        .collect();
                    keys.sort();
                    seen.push(keys.join("&"));
                    Json(json!({"items": [movie_json("m1")], "total": 1, "page": 1, "perPage": 20}))
                }
            }),
        );
        let backend = backend(router).await;

        let query = MovieQuery {
            genre: Some("Sci-Fi".to_string()),
            status: Some(WatchStatus::Watching),
            page: Some(1),
            ..MovieQuery::default()
        };
        let page = backend.list(&query).await.unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(recorded.take(), vec!["genre=Sci-Fi&page=1&status=watching"]);
    }

    #[tokio::test]
    async fn test_update_sends_partial_body() {
        let recorded = Recorded::default();
        let seen = recorded.clone();
        let router = axum::Router::new().route(
            "/movies/{id}",
            put(move |Path(id): Path<String>, Json(body): Json<Value>| {
                let seen = seen.clone();
                async move {
                    seen.push(format!("{id} {body}"));
                    Json(movie_json(&id))
                }
            }),
        );
        let backend = backend(router).await;

        let movie = backend
            .update("m7", &MovieUpdate::status(WatchStatus::Completed))
            .await
            .unwrap();

        assert_eq!(movie.id, "m7");
        assert_eq!(recorded.take(), vec![r#"m7 {"status":"completed"}"#]);
    }

    #[tokio::test]
    async fn test_stats_decodes_buckets() {
        let router = axum::Router::new().route(
            "/analytics/stats",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                Json(json!({
                    "totalTitles": 3,
                    "byStatus": {"completed": 2, "watching": 1},
                    "timeline": [{"period": params.get("bucket").cloned().unwrap_or_default(), "count": 2}]
                }))
            }),
        );
        let backend = backend(router).await;

        let stats = backend
            .stats(&StatsQuery {
                bucket: StatsBucket::Week,
                ..StatsQuery::default()
            })
            .await
            .unwrap();

        assert_eq!(stats.total_titles, 3);
        assert_eq!(stats.by_status.get("completed"), Some(&2));
        assert_eq!(stats.timeline[0].period, "week");
    }
}
