//! Backend adapters built on the shared HTTP client.

mod auth;
mod client;
mod metadata;
mod movies;

#[cfg(test)]
pub(crate) mod test_server;

pub use auth::HttpAuthBackend;
pub use client::{ApiClient, ApiConfig, RequestOptions, query_pairs};
pub use metadata::{MetadataClient, MetadataConfig, MetadataMatch};
pub use movies::HttpMovieBackend;
