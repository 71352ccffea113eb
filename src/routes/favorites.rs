use axum::{
    extract::{Query, State},
    http::StatusCode,
};

use crate::{
    api::{ApiResponse, AppJson, AppPath, AppState, AuthUser, PageParams, Pagination},
    error::{AppError, AppResult},
    models::{
        favorite::normalize_notes, CreateFavoriteRequest, FavoriteResponse, UpdateFavoriteRequest,
    },
};

fn favorite_not_found() -> AppError {
    AppError::NotFound("Favorite not found.".to_string())
}

/// Handler listing the caller's favorites, newest first
pub async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<PageParams>,
) -> AppResult<ApiResponse<Vec<FavoriteResponse>>> {
    let limit = params.limit();
    let favorites = state
        .favorites
        .list_for_user(user.id, limit, params.offset())
        .await?;
    let total = state.favorites.count_for_user(user.id).await?;

    Ok(ApiResponse::paginated(
        favorites.into_iter().map(FavoriteResponse::from).collect(),
        Pagination::new(params.page(), limit, total),
    ))
}

/// Handler for favoriting a catalog movie by local id
pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(payload): AppJson<CreateFavoriteRequest>,
) -> AppResult<ApiResponse<FavoriteResponse>> {
    if state.movies.find_by_id(payload.movie_id).await?.is_none() {
        return Err(AppError::NotFound("Movie not found.".to_string()));
    }

    let favorite = state
        .favorites
        .create(user.id, payload.movie_id, normalize_notes(payload.notes))
        .await?;
    tracing::info!(user_id = user.id, movie_id = payload.movie_id, "Favorite created");

    Ok(ApiResponse::created(FavoriteResponse::from(favorite)))
}

pub async fn retrieve(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> AppResult<ApiResponse<FavoriteResponse>> {
    let favorite = state
        .favorites
        .get(user.id, id)
        .await?
        .ok_or_else(favorite_not_found)?;
    Ok(ApiResponse::ok(FavoriteResponse::from(favorite)))
}

/// Handler for PUT: the notes are replaced, a missing field clears them
pub async fn replace(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateFavoriteRequest>,
) -> AppResult<ApiResponse<FavoriteResponse>> {
    let notes = normalize_notes(payload.notes.flatten());
    let favorite = state
        .favorites
        .update_notes(user.id, id, notes)
        .await?
        .ok_or_else(favorite_not_found)?;
    Ok(ApiResponse::ok(FavoriteResponse::from(favorite)))
}

/// Handler for PATCH: fields left out of the body keep their value
pub async fn partial_update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateFavoriteRequest>,
) -> AppResult<ApiResponse<FavoriteResponse>> {
    let favorite = match payload.notes {
        Some(notes) => {
            state
                .favorites
                .update_notes(user.id, id, normalize_notes(notes))
                .await?
        }
        None => state.favorites.get(user.id, id).await?,
    }
    .ok_or_else(favorite_not_found)?;
    Ok(ApiResponse::ok(FavoriteResponse::from(favorite)))
}

pub async fn destroy(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> AppResult<StatusCode> {
    if !state.favorites.delete(user.id, id).await? {
        return Err(favorite_not_found());
    }
    tracing::info!(user_id = user.id, favorite_id = id, "Favorite deleted");
    Ok(StatusCode::NO_CONTENT)
}
