//! Test doubles for the HTTP suite: an in-memory relational store and a scripted provider
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use nexus_api::{
    api::{AppState, Repositories},
    auth::TokenService,
    create_router,
    db::{
        repositories::{FavoriteRepository, MovieRepository, UserRepository},
        Cache, MemoryStore,
    },
    error::{AppError, AppResult},
    models::{Favorite, Movie, NewMovie, TimeWindow, TmdbMovie, TmdbPage, User},
    services::providers::MovieProvider,
};

pub const JWT_SECRET: &str = "integration-test-secret-value";

// ============================================================================
// In-memory relational store
// ============================================================================

struct FavoriteRow {
    id: i64,
    user_id: i64,
    movie_id: i64,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    movies: Vec<Movie>,
    favorites: Vec<FavoriteRow>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn movie(&self, id: i64) -> Option<&Movie> {
        self.movies.iter().find(|m| m.id == id)
    }

    fn hydrate(&self, row: &FavoriteRow) -> Option<Favorite> {
        Some(Favorite {
            id: row.id,
            user_id: row.user_id,
            movie: self.movie(row.movie_id)?.clone(),
            notes: row.notes.clone(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Implements every repository trait over plain vectors
#[derive(Default)]
pub struct InMemoryDb {
    tables: Mutex<Tables>,
}

impl InMemoryDb {
    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    /// Inserts a catalog movie directly and returns its local id
    pub fn seed_movie(&self, tmdb_id: i64, genres: &[i32], popularity: f64, rating: f64) -> i64 {
        let mut tables = self.tables();
        let id = tables.next_id();
        let now = Utc::now();
        tables.movies.push(Movie {
            id,
            tmdb_id,
            title: format!("Seeded {}", tmdb_id),
            overview: None,
            release_date: None,
            poster_path: Some(format!("/{}.jpg", tmdb_id)),
            backdrop_path: None,
            vote_average: Some(rating),
            vote_count: 100,
            popularity: Some(popularity),
            genre_ids: genres.to_vec(),
            original_language: Some("en".to_string()),
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn movie_count(&self) -> usize {
        self.tables().movies.len()
    }

    pub fn favorite_count(&self) -> usize {
        self.tables().favorites.len()
    }

    pub fn deactivate(&self, user_id: i64) {
        if let Some(user) = self.tables().users.iter_mut().find(|u| u.id == user_id) {
            user.is_active = false;
        }
    }
}

/// Popularity descending, then rating descending, missing values last
fn popularity_order(a: &Movie, b: &Movie) -> std::cmp::Ordering {
    desc_nulls_last(a.popularity, b.popularity)
        .then_with(|| desc_nulls_last(a.vote_average, b.vote_average))
}

fn desc_nulls_last(a: Option<f64>, b: Option<f64>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn ranked(mut movies: Vec<Movie>, limit: i64) -> Vec<Movie> {
    movies.sort_by(popularity_order);
    movies.truncate(limit.max(0) as usize);
    movies
}

#[async_trait::async_trait]
impl MovieRepository for InMemoryDb {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Movie>> {
        Ok(self.tables().movie(id).cloned())
    }

    async fn find_by_tmdb_id(&self, tmdb_id: i64) -> AppResult<Option<Movie>> {
        Ok(self
            .tables()
            .movies
            .iter()
            .find(|m| m.tmdb_id == tmdb_id)
            .cloned())
    }

    async fn upsert(&self, movie: NewMovie) -> AppResult<Movie> {
        movie.validate()?;
        let mut tables = self.tables();
        let now = Utc::now();

        if let Some(existing) = tables.movies.iter_mut().find(|m| m.tmdb_id == movie.tmdb_id) {
            existing.title = movie.title;
            existing.overview = movie.overview;
            existing.release_date = movie.release_date;
            existing.poster_path = movie.poster_path;
            existing.backdrop_path = movie.backdrop_path;
            existing.vote_average = movie.vote_average;
            existing.vote_count = movie.vote_count;
            existing.popularity = movie.popularity;
            existing.genre_ids = movie.genre_ids;
            existing.original_language = movie.original_language;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let stored = Movie {
            id: tables.next_id(),
            tmdb_id: movie.tmdb_id,
            title: movie.title,
            overview: movie.overview,
            release_date: movie.release_date,
            poster_path: movie.poster_path,
            backdrop_path: movie.backdrop_path,
            vote_average: movie.vote_average,
            vote_count: movie.vote_count,
            popularity: movie.popularity,
            genre_ids: movie.genre_ids,
            original_language: movie.original_language,
            created_at: now,
            updated_at: now,
        };
        tables.movies.push(stored.clone());
        Ok(stored)
    }

    async fn most_popular(&self, limit: i64) -> AppResult<Vec<Movie>> {
        Ok(ranked(self.tables().movies.clone(), limit))
    }

    async fn sharing_genres(
        &self,
        genre_ids: &[i32],
        exclude_tmdb_ids: &[i64],
        limit: i64,
    ) -> AppResult<Vec<Movie>> {
        let matches = self
            .tables()
            .movies
            .iter()
            .filter(|m| m.genre_ids.iter().any(|g| genre_ids.contains(g)))
            .filter(|m| !exclude_tmdb_ids.contains(&m.tmdb_id))
            .cloned()
            .collect();
        Ok(ranked(matches, limit))
    }
}

#[async_trait::async_trait]
impl FavoriteRepository for InMemoryDb {
    async fn list_for_user(&self, user_id: i64, limit: i64, offset: i64) -> AppResult<Vec<Favorite>> {
        let tables = self.tables();
        let mut rows: Vec<&FavoriteRow> = tables
            .favorites
            .iter()
            .filter(|f| f.user_id == user_id)
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .filter_map(|row| tables.hydrate(row))
            .collect())
    }

    async fn count_for_user(&self, user_id: i64) -> AppResult<i64> {
        Ok(self
            .tables()
            .favorites
            .iter()
            .filter(|f| f.user_id == user_id)
            .count() as i64)
    }

    async fn favorited_movies(&self, user_id: i64) -> AppResult<Vec<Movie>> {
        let tables = self.tables();
        Ok(tables
            .favorites
            .iter()
            .filter(|f| f.user_id == user_id)
            .filter_map(|f| tables.movie(f.movie_id).cloned())
            .collect())
    }

    async fn get(&self, user_id: i64, favorite_id: i64) -> AppResult<Option<Favorite>> {
        let tables = self.tables();
        Ok(tables
            .favorites
            .iter()
            .find(|f| f.id == favorite_id && f.user_id == user_id)
            .and_then(|row| tables.hydrate(row)))
    }

    async fn create(&self, user_id: i64, movie_id: i64, notes: Option<String>) -> AppResult<Favorite> {
        let mut tables = self.tables();
        if tables.movie(movie_id).is_none() {
            return Err(AppError::NotFound("Movie not found.".to_string()));
        }
        if tables
            .favorites
            .iter()
            .any(|f| f.user_id == user_id && f.movie_id == movie_id)
        {
            return Err(AppError::Conflict(
                "Movie is already in your favorites.".to_string(),
            ));
        }

        let now = Utc::now();
        let row = FavoriteRow {
            id: tables.next_id(),
            user_id,
            movie_id,
            notes,
            created_at: now,
            updated_at: now,
        };
        let favorite = tables
            .hydrate(&row)
            .ok_or_else(|| AppError::Internal("movie vanished".to_string()))?;
        tables.favorites.push(row);
        Ok(favorite)
    }

    async fn update_notes(
        &self,
        user_id: i64,
        favorite_id: i64,
        notes: Option<String>,
    ) -> AppResult<Option<Favorite>> {
        let mut tables = self.tables();
        let Some(index) = tables
            .favorites
            .iter()
            .position(|f| f.id == favorite_id && f.user_id == user_id)
        else {
            return Ok(None);
        };
        tables.favorites[index].notes = notes;
        tables.favorites[index].updated_at = Utc::now();
        Ok(tables.hydrate(&tables.favorites[index]))
    }

    async fn delete(&self, user_id: i64, favorite_id: i64) -> AppResult<bool> {
        let mut tables = self.tables();
        let before = tables.favorites.len();
        tables
            .favorites
            .retain(|f| !(f.id == favorite_id && f.user_id == user_id));
        Ok(tables.favorites.len() < before)
    }

    async fn delete_by_movie(&self, user_id: i64, movie_id: i64) -> AppResult<bool> {
        let mut tables = self.tables();
        let before = tables.favorites.len();
        tables
            .favorites
            .retain(|f| !(f.movie_id == movie_id && f.user_id == user_id));
        Ok(tables.favorites.len() < before)
    }
}

#[async_trait::async_trait]
impl UserRepository for InMemoryDb {
    async fn create(&self, username: &str, email: &str, password_hash: &str) -> AppResult<User> {
        let mut tables = self.tables();
        if tables.users.iter().any(|u| u.username == username) {
            return Err(AppError::field(
                "username",
                "A user with that username already exists.",
            ));
        }
        let user = User {
            id: tables.next_id(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            is_active: true,
            date_joined: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.tables().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self
            .tables()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }
}

// ============================================================================
// Scripted provider
// ============================================================================

/// Provider that serves canned pages and counts upstream calls
#[derive(Default)]
pub struct FakeProvider {
    calls: AtomicUsize,
    failing: AtomicBool,
    details: Mutex<HashMap<i64, TmdbMovie>>,
    recommendations: Mutex<HashMap<i64, Vec<TmdbMovie>>>,
}

pub fn tmdb_movie(id: i64, genres: &[i32], popularity: f64) -> TmdbMovie {
    serde_json::from_value(json!({
        "id": id,
        "title": format!("Upstream {}", id),
        "overview": "From the provider",
        "release_date": "2020-01-01",
        "poster_path": format!("/p{}.jpg", id),
        "vote_average": 7.0,
        "vote_count": 10,
        "popularity": popularity,
        "genre_ids": genres,
        "original_language": "en"
    }))
    .unwrap()
}

impl FakeProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn add_details(&self, movie: TmdbMovie) {
        self.details.lock().unwrap().insert(movie.id, movie);
    }

    pub fn add_recommendations(&self, tmdb_id: i64, movies: Vec<TmdbMovie>) {
        self.recommendations.lock().unwrap().insert(tmdb_id, movies);
    }

    fn hit(&self) -> AppResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::ExternalApi("provider is down".to_string()));
        }
        Ok(())
    }

    fn page(page: u32, results: Vec<TmdbMovie>) -> TmdbPage {
        TmdbPage {
            page,
            total_pages: 5,
            total_results: 100,
            results,
        }
    }
}

#[async_trait::async_trait]
impl MovieProvider for FakeProvider {
    async fn trending(&self, window: TimeWindow, page: u32) -> AppResult<TmdbPage> {
        self.hit()?;
        let base = if window == TimeWindow::Week { 700 } else { 600 };
        Ok(Self::page(page, vec![tmdb_movie(base + page as i64, &[28], 80.0)]))
    }

    async fn popular(&self, page: u32) -> AppResult<TmdbPage> {
        self.hit()?;
        Ok(Self::page(
            page,
            vec![tmdb_movie(100, &[28, 12], 90.0), tmdb_movie(101, &[35], 70.0)],
        ))
    }

    async fn top_rated(&self, page: u32) -> AppResult<TmdbPage> {
        self.hit()?;
        Ok(Self::page(page, vec![tmdb_movie(200, &[18], 50.0)]))
    }

    async fn upcoming(&self, page: u32) -> AppResult<TmdbPage> {
        self.hit()?;
        Ok(Self::page(page, vec![tmdb_movie(300, &[27], 20.0)]))
    }

    async fn search(&self, query: &str, page: u32) -> AppResult<TmdbPage> {
        self.hit()?;
        let mut movie = tmdb_movie(400, &[878], 60.0);
        movie.title = format!("{} Reloaded", query);
        Ok(Self::page(page, vec![movie]))
    }

    async fn movie_details(&self, tmdb_id: i64) -> AppResult<TmdbMovie> {
        self.hit()?;
        self.details
            .lock()
            .unwrap()
            .get(&tmdb_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("movie {} not found", tmdb_id)))
    }

    async fn recommendations(&self, tmdb_id: i64, page: u32) -> AppResult<TmdbPage> {
        self.hit()?;
        let results = self
            .recommendations
            .lock()
            .unwrap()
            .get(&tmdb_id)
            .cloned()
            .unwrap_or_default();
        Ok(Self::page(page, results))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

// ============================================================================
// Server harness
// ============================================================================

pub struct TestApp {
    pub server: TestServer,
    pub db: Arc<InMemoryDb>,
    pub provider: Arc<FakeProvider>,
}

pub fn spawn_app() -> TestApp {
    let db = Arc::new(InMemoryDb::default());
    let provider = Arc::new(FakeProvider::default());
    let cache = Cache::new(Arc::new(MemoryStore::new()));
    let tokens = TokenService::new(JWT_SECRET, 300, 86400, cache.clone());

    let repositories = Repositories {
        movies: db.clone(),
        favorites: db.clone(),
        users: db.clone(),
    };
    let state = AppState::new(cache, repositories, provider.clone(), tokens);

    TestApp {
        server: TestServer::new(create_router(state)).unwrap(),
        db,
        provider,
    }
}

pub struct Session {
    pub user_id: i64,
    pub access: String,
    pub refresh: String,
}

impl TestApp {
    pub async fn register(&self, username: &str) -> Session {
        let response = self
            .server
            .post("/api/v1/auth/register")
            .json(&json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": "correct-horse-battery",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);

        let body: Value = response.json();
        Session {
            user_id: body["data"]["user"]["id"].as_i64().unwrap(),
            access: body["data"]["tokens"]["access"].as_str().unwrap().to_string(),
            refresh: body["data"]["tokens"]["refresh"].as_str().unwrap().to_string(),
        }
    }
}
