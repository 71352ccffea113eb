use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";
const BACKDROP_BASE_URL: &str = "https://image.tmdb.org/t/p/w1280";

/// Width of the `movies.title` column
pub const MAX_TITLE_CHARS: usize = 255;

/// Full poster URL for a TMDb image path fragment
pub fn poster_url(path: Option<&str>) -> Option<String> {
    path.map(|p| format!("{}{}", POSTER_BASE_URL, p))
}

/// Full backdrop URL for a TMDb image path fragment
pub fn backdrop_url(path: Option<&str>) -> Option<String> {
    path.map(|p| format!("{}{}", BACKDROP_BASE_URL, p))
}

/// A movie stored in the local catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Movie {
    pub id: i64,
    pub tmdb_id: i64,
    pub title: String,
    pub overview: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    /// Rating average, always within [0, 10] when present
    pub vote_average: Option<f64>,
    pub vote_count: i32,
    pub popularity: Option<f64>,
    pub genre_ids: Vec<i32>,
    pub original_language: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Movie data ready to be inserted or refreshed in the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovie {
    pub tmdb_id: i64,
    pub title: String,
    pub overview: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub vote_average: Option<f64>,
    pub vote_count: i32,
    pub popularity: Option<f64>,
    pub genre_ids: Vec<i32>,
    pub original_language: Option<String>,
}

impl NewMovie {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(rating) = self.vote_average {
            if !(0.0..=10.0).contains(&rating) {
                return Err(AppError::field(
                    "vote_average",
                    format!("Rating {} is outside 0-10", rating),
                ));
            }
        }
        if self.title.trim().is_empty() {
            return Err(AppError::field("title", "Title may not be blank."));
        }
        if self.title.chars().count() > MAX_TITLE_CHARS {
            return Err(AppError::field(
                "title",
                format!("Title is longer than {} characters.", MAX_TITLE_CHARS),
            ));
        }
        Ok(())
    }
}

/// Movie representation returned to clients, for both catalog rows and raw provider results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieSummary {
    /// Local catalog id, absent for movies that only exist upstream
    pub id: Option<i64>,
    pub tmdb_id: i64,
    pub title: String,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub vote_average: Option<f64>,
    pub vote_count: i32,
    pub popularity: Option<f64>,
    pub genre_ids: Vec<i32>,
    pub original_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Movie> for MovieSummary {
    fn from(movie: Movie) -> Self {
        Self {
            id: Some(movie.id),
            tmdb_id: movie.tmdb_id,
            poster_url: poster_url(movie.poster_path.as_deref()),
            backdrop_url: backdrop_url(movie.backdrop_path.as_deref()),
            title: movie.title,
            overview: movie.overview,
            release_date: movie.release_date.map(|d| d.format("%Y-%m-%d").to_string()),
            poster_path: movie.poster_path,
            backdrop_path: movie.backdrop_path,
            vote_average: movie.vote_average,
            vote_count: movie.vote_count,
            popularity: movie.popularity,
            genre_ids: movie.genre_ids,
            original_language: movie.original_language,
            created_at: Some(movie.created_at),
            updated_at: Some(movie.updated_at),
        }
    }
}

/// One page of a movie listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoviePage {
    pub page: u32,
    pub results: Vec<MovieSummary>,
    pub total_pages: u32,
    pub total_results: u32,
}

impl MoviePage {
    /// Page returned for blank searches
    pub fn empty() -> Self {
        Self {
            page: 1,
            results: Vec::new(),
            total_pages: 0,
            total_results: 0,
        }
    }
}
