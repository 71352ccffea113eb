use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::movies::MOVIE_COLUMNS;
use crate::{
    error::{AppError, AppResult},
    models::{Favorite, Movie},
};

/// Access to users' favorite movies
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FavoriteRepository: Send + Sync {
    /// One page of the user's favorites, newest first
    async fn list_for_user(&self, user_id: i64, limit: i64, offset: i64) -> AppResult<Vec<Favorite>>;

    async fn count_for_user(&self, user_id: i64) -> AppResult<i64>;

    /// Every movie the user has favorited
    async fn favorited_movies(&self, user_id: i64) -> AppResult<Vec<Movie>>;

    async fn get(&self, user_id: i64, favorite_id: i64) -> AppResult<Option<Favorite>>;

    /// Creates the favorite. Fails with [`AppError::Conflict`] if the pair already exists.
    async fn create(&self, user_id: i64, movie_id: i64, notes: Option<String>) -> AppResult<Favorite>;

    async fn update_notes(
        &self,
        user_id: i64,
        favorite_id: i64,
        notes: Option<String>,
    ) -> AppResult<Option<Favorite>>;

    /// Returns whether a row was removed
    async fn delete(&self, user_id: i64, favorite_id: i64) -> AppResult<bool>;

    /// Returns whether a row was removed
    async fn delete_by_movie(&self, user_id: i64, movie_id: i64) -> AppResult<bool>;
}

#[derive(sqlx::FromRow)]
struct FavoriteRow {
    favorite_id: i64,
    user_id: i64,
    notes: Option<String>,
    favorite_created_at: DateTime<Utc>,
    favorite_updated_at: DateTime<Utc>,
    #[sqlx(flatten)]
    movie: Movie,
}

impl From<FavoriteRow> for Favorite {
    fn from(row: FavoriteRow) -> Self {
        Favorite {
            id: row.favorite_id,
            user_id: row.user_id,
            movie: row.movie,
            notes: row.notes,
            created_at: row.favorite_created_at,
            updated_at: row.favorite_updated_at,
        }
    }
}

fn favorite_select() -> String {
    format!(
        "SELECT f.id AS favorite_id, f.user_id, f.notes, f.created_at AS favorite_created_at, \
         f.updated_at AS favorite_updated_at, {} \
         FROM favorite_movies f JOIN movies m ON m.id = f.movie_id",
        MOVIE_COLUMNS
    )
}

pub struct PgFavoriteRepository {
    pool: PgPool,
}

impl PgFavoriteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl FavoriteRepository for PgFavoriteRepository {
    async fn list_for_user(&self, user_id: i64, limit: i64, offset: i64) -> AppResult<Vec<Favorite>> {
        let sql = format!(
            "{} WHERE f.user_id = $1 ORDER BY f.created_at DESC, f.id DESC LIMIT $2 OFFSET $3",
            favorite_select()
        );
        let rows = sqlx::query_as::<_, FavoriteRow>(&sql)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Favorite::from).collect())
    }

    async fn count_for_user(&self, user_id: i64) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM favorite_movies WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn favorited_movies(&self, user_id: i64) -> AppResult<Vec<Movie>> {
        let sql = format!(
            "SELECT {} FROM favorite_movies f JOIN movies m ON m.id = f.movie_id WHERE f.user_id = $1",
            MOVIE_COLUMNS
        );
        let movies = sqlx::query_as::<_, Movie>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(movies)
    }

    async fn get(&self, user_id: i64, favorite_id: i64) -> AppResult<Option<Favorite>> {
        let sql = format!("{} WHERE f.user_id = $1 AND f.id = $2", favorite_select());
        let row = sqlx::query_as::<_, FavoriteRow>(&sql)
            .bind(user_id)
            .bind(favorite_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Favorite::from))
    }

    async fn create(&self, user_id: i64, movie_id: i64, notes: Option<String>) -> AppResult<Favorite> {
        let inserted: i64 = sqlx::query_scalar(
            "INSERT INTO favorite_movies (user_id, movie_id, notes) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(user_id)
        .bind(movie_id)
        .bind(&notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("Movie is already in your favorites.".to_string())
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                AppError::NotFound("Movie not found.".to_string())
            }
            _ => AppError::from(e),
        })?;

        self.get(user_id, inserted)
            .await?
            .ok_or_else(|| AppError::Internal("Favorite vanished after insert".to_string()))
    }

    async fn update_notes(
        &self,
        user_id: i64,
        favorite_id: i64,
        notes: Option<String>,
    ) -> AppResult<Option<Favorite>> {
        let updated: Option<i64> = sqlx::query_scalar(
            "UPDATE favorite_movies SET notes = $1, updated_at = NOW() \
             WHERE id = $2 AND user_id = $3 RETURNING id",
        )
        .bind(&notes)
        .bind(favorite_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(id) => self.get(user_id, id).await,
            None => Ok(None),
        }
    }

    async fn delete(&self, user_id: i64, favorite_id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM favorite_movies WHERE id = $1 AND user_id = $2")
            .bind(favorite_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_movie(&self, user_id: i64, movie_id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM favorite_movies WHERE movie_id = $1 AND user_id = $2")
            .bind(movie_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
