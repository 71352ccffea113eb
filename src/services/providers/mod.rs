//! Movie metadata provider abstraction
//!
//! The service never talks to an upstream API directly; it goes through
//! [`MovieProvider`] so the upstream can be swapped or faked in tests.
use crate::{
    error::AppResult,
    models::{TimeWindow, TmdbMovie, TmdbPage},
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

/// Read-only source of movie listings and details
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieProvider: Send + Sync {
    /// Trending movies for the given window
    async fn trending(&self, window: TimeWindow, page: u32) -> AppResult<TmdbPage>;

    async fn popular(&self, page: u32) -> AppResult<TmdbPage>;

    async fn top_rated(&self, page: u32) -> AppResult<TmdbPage>;

    async fn upcoming(&self, page: u32) -> AppResult<TmdbPage>;

    /// Title search. A blank query returns an empty first page without an upstream call.
    async fn search(&self, query: &str, page: u32) -> AppResult<TmdbPage>;

    /// Full details for one movie. Unknown ids yield `AppError::NotFound`.
    async fn movie_details(&self, tmdb_id: i64) -> AppResult<TmdbMovie>;

    /// Provider-computed recommendations seeded by one movie
    async fn recommendations(&self, tmdb_id: i64, page: u32) -> AppResult<TmdbPage>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
