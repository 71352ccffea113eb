use std::collections::BTreeSet;
use std::sync::Arc;

use crate::{
    db::repositories::{FavoriteRepository, MovieRepository},
    error::AppResult,
    models::{Movie, MovieSummary},
    services::providers::MovieProvider,
};

/// Genre-overlap recommendations over the local catalog
///
/// Neither entry point fails: data errors degrade to a popularity list or an
/// empty list, and are logged.
#[derive(Clone)]
pub struct RecommendationService {
    movies: Arc<dyn MovieRepository>,
    favorites: Arc<dyn FavoriteRepository>,
    provider: Arc<dyn MovieProvider>,
}

impl RecommendationService {
    pub fn new(
        movies: Arc<dyn MovieRepository>,
        favorites: Arc<dyn FavoriteRepository>,
        provider: Arc<dyn MovieProvider>,
    ) -> Self {
        Self {
            movies,
            favorites,
            provider,
        }
    }

    /// Movies sharing a genre with the user's favorites, excluding the favorites themselves
    ///
    /// Users with no favorites, or whose genres match nothing else, get the popularity list.
    pub async fn recommend(&self, user_id: i64, limit: i64) -> Vec<Movie> {
        match self.by_favorite_genres(user_id, limit).await {
            Ok(Some(movies)) => movies,
            Ok(None) => self.popular_fallback(limit).await,
            Err(e) => {
                tracing::error!(user_id, error = %e, "Recommendation query failed, using popular movies");
                self.popular_fallback(limit).await
            }
        }
    }

    async fn by_favorite_genres(&self, user_id: i64, limit: i64) -> AppResult<Option<Vec<Movie>>> {
        let favorites = self.favorites.favorited_movies(user_id).await?;
        if favorites.is_empty() {
            tracing::debug!(user_id, "No favorites, recommending popular movies");
            return Ok(None);
        }

        let genre_ids: Vec<i32> = favorite_genres(&favorites).into_iter().collect();
        if genre_ids.is_empty() {
            return Ok(None);
        }
        let exclude: Vec<i64> = favorites.iter().map(|m| m.tmdb_id).collect();

        let movies = self
            .movies
            .sharing_genres(&genre_ids, &exclude, limit)
            .await?;
        tracing::debug!(user_id, genres = genre_ids.len(), matches = movies.len(), "Genre overlap computed");

        if movies.is_empty() {
            return Ok(None);
        }
        Ok(Some(movies))
    }

    /// Most popular catalog movies, or nothing if the catalog is unreachable
    pub async fn popular_fallback(&self, limit: i64) -> Vec<Movie> {
        self.movies.most_popular(limit).await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Popular movie fallback failed");
            Vec::new()
        })
    }

    /// Movies similar to one TMDb id
    ///
    /// Provider recommendations come first. When the provider fails or has
    /// nothing, catalog movies sharing a genre with the seed are used instead.
    pub async fn similar_to(&self, tmdb_id: i64, limit: i64) -> Vec<MovieSummary> {
        let limit = limit.max(0);
        match self.provider.recommendations(tmdb_id, 1).await {
            Ok(page) if !page.results.is_empty() => {
                return page
                    .results
                    .into_iter()
                    .take(limit as usize)
                    .map(MovieSummary::from)
                    .collect();
            }
            Ok(_) => tracing::debug!(tmdb_id, "Provider has no similar movies, using catalog"),
            Err(e) => tracing::warn!(
                tmdb_id,
                error = %e,
                provider = self.provider.name(),
                "Provider recommendations failed, using catalog"
            ),
        }

        self.similar_in_catalog(tmdb_id, limit)
            .await
            .unwrap_or_else(|e| {
                tracing::error!(tmdb_id, error = %e, "Catalog similarity lookup failed");
                Vec::new()
            })
    }

    async fn similar_in_catalog(&self, tmdb_id: i64, limit: i64) -> AppResult<Vec<MovieSummary>> {
        let Some(seed) = self.movies.find_by_tmdb_id(tmdb_id).await? else {
            return Ok(Vec::new());
        };
        if seed.genre_ids.is_empty() {
            return Ok(Vec::new());
        }

        let similar = self
            .movies
            .sharing_genres(&seed.genre_ids, &[tmdb_id], limit)
            .await?;
        Ok(similar.into_iter().map(MovieSummary::from).collect())
    }
}

/// Union of genre ids across movies, in ascending order
fn favorite_genres(movies: &[Movie]) -> BTreeSet<i32> {
    movies
        .iter()
        .flat_map(|m| m.genre_ids.iter().copied())
        .collect()
}
