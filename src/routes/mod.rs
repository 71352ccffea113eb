use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    api::AppState,
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
};

pub mod auth;
pub mod favorites;
pub mod movies;
pub mod recommendations;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/movies/trending", get(movies::trending))
        .route("/movies/popular", get(movies::popular))
        .route("/movies/top-rated", get(movies::top_rated))
        .route("/movies/upcoming", get(movies::upcoming))
        .route("/movies/search", get(movies::search))
        .route("/movies/:tmdb_id", get(movies::retrieve))
        .route(
            "/movies/:tmdb_id/favorite",
            post(movies::add_favorite).delete(movies::remove_favorite),
        )
        .route("/movies/:tmdb_id/similar", get(movies::similar))
        .route("/favorites", get(favorites::list).post(favorites::create))
        .route(
            "/favorites/:id",
            get(favorites::retrieve)
                .put(favorites::replace)
                .patch(favorites::partial_update)
                .delete(favorites::destroy),
        )
        .route("/recommendations", get(recommendations::recommend))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
