use sqlx::PgPool;

use crate::{
    error::AppResult,
    models::{Movie, NewMovie},
};

pub(crate) const MOVIE_COLUMNS: &str = "m.id, m.tmdb_id, m.title, m.overview, m.release_date, \
     m.poster_path, m.backdrop_path, m.vote_average, m.vote_count, m.popularity, m.genre_ids, \
     m.original_language, m.created_at, m.updated_at";

const POPULARITY_ORDER: &str = "m.popularity DESC NULLS LAST, m.vote_average DESC NULLS LAST, m.id";

/// Access to the local movie catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Movie>>;

    async fn find_by_tmdb_id(&self, tmdb_id: i64) -> AppResult<Option<Movie>>;

    /// Inserts the movie or refreshes the existing row with the same TMDb id
    async fn upsert(&self, movie: NewMovie) -> AppResult<Movie>;

    /// Whole catalog ordered by popularity then rating
    async fn most_popular(&self, limit: i64) -> AppResult<Vec<Movie>>;

    /// Movies carrying any of `genre_ids`, minus the excluded TMDb ids, in popularity order
    async fn sharing_genres(
        &self,
        genre_ids: &[i32],
        exclude_tmdb_ids: &[i64],
        limit: i64,
    ) -> AppResult<Vec<Movie>>;
}

pub struct PgMovieRepository {
    pool: PgPool,
}

impl PgMovieRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MovieRepository for PgMovieRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Movie>> {
        let sql = format!("SELECT {} FROM movies m WHERE m.id = $1", MOVIE_COLUMNS);
        let movie = sqlx::query_as::<_, Movie>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(movie)
    }

    async fn find_by_tmdb_id(&self, tmdb_id: i64) -> AppResult<Option<Movie>> {
        let sql = format!("SELECT {} FROM movies m WHERE m.tmdb_id = $1", MOVIE_COLUMNS);
        let movie = sqlx::query_as::<_, Movie>(&sql)
            .bind(tmdb_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(movie)
    }

    async fn upsert(&self, movie: NewMovie) -> AppResult<Movie> {
        movie.validate()?;

        let sql = format!(
            r#"
            INSERT INTO movies AS m (
                tmdb_id, title, overview, release_date, poster_path, backdrop_path,
                vote_average, vote_count, popularity, genre_ids, original_language
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (tmdb_id) DO UPDATE SET
                title = EXCLUDED.title,
                overview = EXCLUDED.overview,
                release_date = EXCLUDED.release_date,
                poster_path = EXCLUDED.poster_path,
                backdrop_path = EXCLUDED.backdrop_path,
                vote_average = EXCLUDED.vote_average,
                vote_count = EXCLUDED.vote_count,
                popularity = EXCLUDED.popularity,
                genre_ids = EXCLUDED.genre_ids,
                original_language = EXCLUDED.original_language,
                updated_at = NOW()
            RETURNING {}
            "#,
            MOVIE_COLUMNS
        );

        let stored = sqlx::query_as::<_, Movie>(&sql)
            .bind(movie.tmdb_id)
            .bind(&movie.title)
            .bind(&movie.overview)
            .bind(movie.release_date)
            .bind(&movie.poster_path)
            .bind(&movie.backdrop_path)
            .bind(movie.vote_average)
            .bind(movie.vote_count)
            .bind(movie.popularity)
            .bind(&movie.genre_ids)
            .bind(&movie.original_language)
            .fetch_one(&self.pool)
            .await?;

        tracing::debug!(tmdb_id = stored.tmdb_id, id = stored.id, "Movie upserted");
        Ok(stored)
    }

    async fn most_popular(&self, limit: i64) -> AppResult<Vec<Movie>> {
        let sql = format!(
            "SELECT {} FROM movies m ORDER BY {} LIMIT $1",
            MOVIE_COLUMNS, POPULARITY_ORDER
        );
        let movies = sqlx::query_as::<_, Movie>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(movies)
    }

    async fn sharing_genres(
        &self,
        genre_ids: &[i32],
        exclude_tmdb_ids: &[i64],
        limit: i64,
    ) -> AppResult<Vec<Movie>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM movies m
            WHERE m.genre_ids && $1
              AND NOT (m.tmdb_id = ANY($2))
            ORDER BY {}
            LIMIT $3
            "#,
            MOVIE_COLUMNS, POPULARITY_ORDER
        );
        let movies = sqlx::query_as::<_, Movie>(&sql)
            .bind(genre_ids)
            .bind(exclude_tmdb_ids)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(movies)
    }
}
