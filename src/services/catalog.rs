use std::sync::Arc;

use crate::{
    db::repositories::MovieRepository,
    error::{AppError, AppResult},
    models::{Movie, NewMovie, TmdbMovie},
    services::providers::MovieProvider,
};

/// Local movie catalog, filled lazily from the provider
#[derive(Clone)]
pub struct CatalogService {
    movies: Arc<dyn MovieRepository>,
    provider: Arc<dyn MovieProvider>,
}

impl CatalogService {
    pub fn new(movies: Arc<dyn MovieRepository>, provider: Arc<dyn MovieProvider>) -> Self {
        Self { movies, provider }
    }

    /// Returns the catalog row for a TMDb id, importing it from the provider on first access
    pub async fn get_or_fetch(&self, tmdb_id: i64) -> AppResult<Movie> {
        if let Some(movie) = self.movies.find_by_tmdb_id(tmdb_id).await? {
            return Ok(movie);
        }

        let details = self.provider.movie_details(tmdb_id).await?;
        let new_movie = NewMovie::from(&details);
        new_movie.validate().map_err(|e| {
            tracing::error!(tmdb_id, error = %e, provider = self.provider.name(), "Provider returned an unusable movie");
            AppError::ExternalApi(format!("Provider returned invalid data for movie {}", tmdb_id))
        })?;

        let movie = self.movies.upsert(new_movie).await?;
        tracing::info!(tmdb_id, id = movie.id, "Movie imported into catalog");
        Ok(movie)
    }

    /// Upserts listing results into the catalog. Failures are logged and skipped.
    ///
    /// Returns how many movies were stored.
    pub async fn remember(&self, movies: &[TmdbMovie]) -> usize {
        let mut stored = 0;
        for movie in movies {
            let new_movie = NewMovie::from(movie);
            if let Err(e) = new_movie.validate() {
                tracing::debug!(tmdb_id = movie.id, error = %e, "Skipping invalid provider movie");
                continue;
            }
            match self.movies.upsert(new_movie).await {
                Ok(_) => stored += 1,
                Err(e) => tracing::warn!(tmdb_id = movie.id, error = %e, "Failed to store provider movie"),
            }
        }
        stored
    }
}
