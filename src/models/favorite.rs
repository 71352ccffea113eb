use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::movie::{Movie, MovieSummary};

/// A user's saved movie
#[derive(Debug, Clone, PartialEq)]
pub struct Favorite {
    pub id: i64,
    pub user_id: i64,
    pub movie: Movie,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Favorite as returned to clients
#[derive(Debug, Clone, Serialize)]
pub struct FavoriteResponse {
    pub id: i64,
    pub user: i64,
    pub movie: MovieSummary,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Favorite> for FavoriteResponse {
    fn from(favorite: Favorite) -> Self {
        Self {
            id: favorite.id,
            user: favorite.user_id,
            movie: MovieSummary::from(favorite.movie),
            notes: favorite.notes,
            created_at: favorite.created_at,
            updated_at: favorite.updated_at,
        }
    }
}

/// Body for `POST /favorites`
#[derive(Debug, Deserialize)]
pub struct CreateFavoriteRequest {
    /// Local catalog id of the movie
    pub movie_id: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Body for `POST /movies/{tmdb_id}/favorite`
#[derive(Debug, Default, Deserialize)]
pub struct FavoriteNoteRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

/// Body for `PUT`/`PATCH /favorites/{id}`
///
/// `notes` is `None` when the field was left out and `Some(None)` when it was sent as null.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateFavoriteRequest {
    #[serde(default, deserialize_with = "present")]
    pub notes: Option<Option<String>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Empty notes are stored as absent
pub fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes.filter(|n| !n.trim().is_empty())
}
