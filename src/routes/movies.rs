use std::future::Future;

use axum::{
    extract::{OriginalUri, Query, State},
    http::{StatusCode, Uri},
};
use serde::Deserialize;

use crate::{
    api::{
        pagination::page_number, ApiResponse, AppPath, AppState, AuthUser, LimitParam,
        OptionalJson, Viewer,
    },
    db::CacheTtl,
    error::{AppError, AppResult},
    models::{
        favorite::normalize_notes, FavoriteNoteRequest, FavoriteResponse, MoviePage, MovieSummary,
        TimeWindow, TmdbPage,
    },
};

// (anonymous, authenticated) seconds
const DETAIL_TTL: CacheTtl = CacheTtl::new(900, 300);
const TRENDING_TTL: CacheTtl = CacheTtl::new(900, 300);
const POPULAR_TTL: CacheTtl = CacheTtl::new(3600, 1800);
const TOP_RATED_TTL: CacheTtl = CacheTtl::new(3600, 1800);
const UPCOMING_TTL: CacheTtl = CacheTtl::new(3600, 1800);
const SEARCH_TTL: CacheTtl = CacheTtl::new(7200, 3600);

const SIMILAR_DEFAULT_LIMIT: i64 = 10;
const SIMILAR_MAX_LIMIT: i64 = 50;

#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    page: Option<String>,
    time_window: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    query: Option<String>,
    /// Short alias for `query`
    q: Option<String>,
    page: Option<String>,
}

/// Serves a provider listing through the response cache, recording the results in the catalog
async fn cached_listing<F, Fut>(
    state: &AppState,
    viewer: &Viewer,
    uri: &Uri,
    ttl: CacheTtl,
    fetch: F,
) -> AppResult<ApiResponse<MoviePage>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = AppResult<TmdbPage>>,
{
    let catalog = &state.catalog;
    let page = state
        .cache
        .cached_fetch(
            &viewer.cache_key(uri),
            ttl,
            viewer.is_authenticated(),
            move || async move {
                let upstream = fetch().await?;
                catalog.remember(&upstream.results).await;
                Ok::<_, AppError>(MoviePage::from(upstream))
            },
        )
        .await?;
    Ok(ApiResponse::ok(page))
}

/// Handler for trending movies
pub async fn trending(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<ListingQuery>,
) -> AppResult<ApiResponse<MoviePage>> {
    let page = page_number(params.page.as_deref());
    let window = TimeWindow::parse_lenient(params.time_window.as_deref());
    cached_listing(&state, &viewer, &uri, TRENDING_TTL, || {
        state.provider.trending(window, page)
    })
    .await
}

/// Handler for popular movies
pub async fn popular(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<ListingQuery>,
) -> AppResult<ApiResponse<MoviePage>> {
    let page = page_number(params.page.as_deref());
    cached_listing(&state, &viewer, &uri, POPULAR_TTL, || state.provider.popular(page)).await
}

pub async fn top_rated(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<ListingQuery>,
) -> AppResult<ApiResponse<MoviePage>> {
    let page = page_number(params.page.as_deref());
    cached_listing(&state, &viewer, &uri, TOP_RATED_TTL, || {
        state.provider.top_rated(page)
    })
    .await
}

pub async fn upcoming(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<ListingQuery>,
) -> AppResult<ApiResponse<MoviePage>> {
    let page = page_number(params.page.as_deref());
    cached_listing(&state, &viewer, &uri, UPCOMING_TTL, || {
        state.provider.upcoming(page)
    })
    .await
}

/// Handler for title search. A blank query answers an empty page without touching the provider.
pub async fn search(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<SearchQuery>,
) -> AppResult<ApiResponse<MoviePage>> {
    let query = params
        .query
        .or(params.q)
        .map(|q| q.trim().to_string())
        .unwrap_or_default();
    if query.is_empty() {
        return Ok(ApiResponse::ok(MoviePage::empty()));
    }

    let page = page_number(params.page.as_deref());
    cached_listing(&state, &viewer, &uri, SEARCH_TTL, || {
        state.provider.search(&query, page)
    })
    .await
}

/// Handler for a single movie, imported from the provider on first request
pub async fn retrieve(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    AppPath(tmdb_id): AppPath<i64>,
) -> AppResult<ApiResponse<MovieSummary>> {
    let catalog = &state.catalog;
    let movie = state
        .cache
        .cached_fetch(
            &viewer.cache_key(&uri),
            DETAIL_TTL,
            viewer.is_authenticated(),
            move || async move {
                Ok::<_, AppError>(MovieSummary::from(catalog.get_or_fetch(tmdb_id).await?))
            },
        )
        .await?;
    Ok(ApiResponse::ok(movie))
}

/// Handler for favoriting a movie by TMDb id
pub async fn add_favorite(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(tmdb_id): AppPath<i64>,
    OptionalJson(body): OptionalJson<FavoriteNoteRequest>,
) -> AppResult<ApiResponse<FavoriteResponse>> {
    let movie = state.catalog.get_or_fetch(tmdb_id).await?;
    let notes = normalize_notes(body.notes);

    let favorite = state.favorites.create(user.id, movie.id, notes).await?;
    tracing::info!(user_id = user.id, tmdb_id, "Movie added to favorites");

    Ok(ApiResponse::created(FavoriteResponse::from(favorite))
        .with_message("Movie added to favorites"))
}

/// Handler for removing a movie from favorites by TMDb id
pub async fn remove_favorite(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(tmdb_id): AppPath<i64>,
) -> AppResult<StatusCode> {
    let movie = state
        .movies
        .find_by_tmdb_id(tmdb_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Movie not found.".to_string()))?;

    if !state.favorites.delete_by_movie(user.id, movie.id).await? {
        return Err(AppError::NotFound(
            "Movie is not in your favorites.".to_string(),
        ));
    }

    tracing::info!(user_id = user.id, tmdb_id, "Movie removed from favorites");
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for movies similar to one TMDb id
pub async fn similar(
    State(state): State<AppState>,
    AppPath(tmdb_id): AppPath<i64>,
    Query(params): Query<LimitParam>,
) -> ApiResponse<Vec<MovieSummary>> {
    let limit = params.resolve(SIMILAR_DEFAULT_LIMIT, SIMILAR_MAX_LIMIT);
    ApiResponse::ok(state.recommendations.similar_to(tmdb_id, limit).await)
}
