use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::movie::{backdrop_url, poster_url, MoviePage, MovieSummary, NewMovie};

// ============================================================================
// TMDb API Types
// ============================================================================

/// Movie as returned by TMDb listing and detail endpoints
///
/// Listing endpoints carry `genre_ids`, the detail endpoint carries `genres`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmdbMovie {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<i32>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub genre_ids: Vec<i32>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub original_language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmdbGenre {
    pub id: i32,
    pub name: String,
}

impl TmdbMovie {
    /// Genre ids regardless of which endpoint produced this movie
    pub fn all_genre_ids(&self) -> Vec<i32> {
        let mut ids = self.genre_ids.clone();
        for genre in &self.genres {
            if !ids.contains(&genre.id) {
                ids.push(genre.id);
            }
        }
        ids
    }

    fn parsed_release_date(&self) -> Option<NaiveDate> {
        self.release_date
            .as_deref()
            .filter(|d| !d.is_empty())
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    }
}

impl From<&TmdbMovie> for NewMovie {
    fn from(movie: &TmdbMovie) -> Self {
        NewMovie {
            tmdb_id: movie.id,
            title: movie.title.clone(),
            overview: movie.overview.clone(),
            release_date: movie.parsed_release_date(),
            poster_path: movie.poster_path.clone(),
            backdrop_path: movie.backdrop_path.clone(),
            vote_average: movie.vote_average,
            vote_count: movie.vote_count.unwrap_or(0),
            popularity: movie.popularity,
            genre_ids: movie.all_genre_ids(),
            original_language: movie.original_language.clone(),
        }
    }
}

impl From<TmdbMovie> for MovieSummary {
    fn from(movie: TmdbMovie) -> Self {
        let genre_ids = movie.all_genre_ids();
        Self {
            id: None,
            tmdb_id: movie.id,
            poster_url: poster_url(movie.poster_path.as_deref()),
            backdrop_url: backdrop_url(movie.backdrop_path.as_deref()),
            title: movie.title,
            overview: movie.overview,
            release_date: movie.release_date.filter(|d| !d.is_empty()),
            poster_path: movie.poster_path,
            backdrop_path: movie.backdrop_path,
            vote_average: movie.vote_average,
            vote_count: movie.vote_count.unwrap_or(0),
            popularity: movie.popularity,
            genre_ids,
            original_language: movie.original_language,
            created_at: None,
            updated_at: None,
        }
    }
}

/// Paginated TMDb response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmdbPage {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<TmdbMovie>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

fn first_page() -> u32 {
    1
}

impl From<TmdbPage> for MoviePage {
    fn from(page: TmdbPage) -> Self {
        MoviePage {
            page: page.page,
            results: page.results.into_iter().map(MovieSummary::from).collect(),
            total_pages: page.total_pages,
            total_results: page.total_results,
        }
    }
}

/// Trending window accepted by TMDb. Anything unrecognised means `day`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeWindow {
    #[default]
    Day,
    Week,
}

impl TimeWindow {
    pub fn parse_lenient(value: Option<&str>) -> Self {
        match value {
            Some("week") => TimeWindow::Week,
            _ => TimeWindow::Day,
        }
    }
}

impl Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeWindow::Day => write!(f, "day"),
            TimeWindow::Week => write!(f, "week"),
        }
    }
}
