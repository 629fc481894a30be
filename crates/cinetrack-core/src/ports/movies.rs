//! Movie collection port.

use async_trait::async_trait;

use crate::domain::{Movie, MovieQuery, MovieUpdate, NewMovie, Page, StatsQuery, ViewingStats};
use crate::error::ApiError;

/// Backend endpoints for the user's collection and its analytics.
#[async_trait]
pub trait MovieBackend: Send + Sync {
    async fn list(&self, query: &MovieQuery) -> Result<Page<Movie>, ApiError>;

    async fn get(&self, id: &str) -> Result<Movie, ApiError>;

    async fn create(&self, movie: &NewMovie) -> Result<Movie, ApiError>;

    /// Apply a partial update; absent fields are left untouched.
    async fn update(&self, id: &str, changes: &MovieUpdate) -> Result<Movie, ApiError>;

    async fn delete(&self, id: &str) -> Result<(), ApiError>;

    /// Time-bucketed viewing aggregates.
    async fn stats(&self, query: &StatsQuery) -> Result<ViewingStats, ApiError>;
}
