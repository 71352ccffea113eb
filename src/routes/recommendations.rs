use axum::extract::{Query, State};

use crate::{
    api::{ApiResponse, AppState, AuthUser, LimitParam},
    models::MovieSummary,
};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

/// Handler for personalized recommendations
///
/// Always answers 200; data failures fall back to popular movies or an empty list.
pub async fn recommend(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<LimitParam>,
) -> ApiResponse<Vec<MovieSummary>> {
    let limit = params.resolve(DEFAULT_LIMIT, MAX_LIMIT);
    let movies = state.recommendations.recommend(user.id, limit).await;

    tracing::debug!(user_id = user.id, count = movies.len(), "Recommendations served");
    ApiResponse::ok(movies.into_iter().map(MovieSummary::from).collect())
}
