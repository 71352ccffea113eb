use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Path, Request,
    },
    http::{header::AUTHORIZATION, request::Parts, Uri},
    Json,
};
use serde::de::DeserializeOwned;

use crate::{
    api::AppState,
    auth::TokenType,
    db::CacheKey,
    error::{AppError, AppResult},
    models::User,
};

/// A `Json<T>` wrapper that turns body rejections into validation errors,
/// so clients always receive the error envelope.
pub struct AppJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::invalid(e.body_text()))?;
        Ok(AppJson(value))
    }
}

/// JSON body that may be left out entirely
///
/// An empty body yields `T::default()`. Anything else has to parse, so a
/// malformed body is still a validation error rather than "no body".
pub struct OptionalJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for OptionalJson<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::invalid(e.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(OptionalJson(T::default()));
        }

        serde_json::from_slice(&bytes)
            .map(OptionalJson)
            .map_err(|e| AppError::invalid(format!("Failed to parse the request body as JSON: {}", e)))
    }
}

/// `Path<T>` with enveloped rejections
pub struct AppPath<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for AppPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::invalid(e.body_text()))?;
        Ok(AppPath(value))
    }
}

/// Bearer token from the `Authorization` header, if one was sent
///
/// Other schemes are ignored, as if no credentials were given.
fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

async fn authenticate(state: &AppState, token: &str) -> AppResult<User> {
    let claims = state.tokens.verify(token, TokenType::Access)?;
    let user = state
        .users
        .find_by_id(claims.user_id()?)
        .await?
        .ok_or_else(|| AppError::TokenInvalid("user not found".to_string()))?;

    if !user.is_active {
        return Err(AppError::TokenInvalid("user is inactive".to_string()));
    }
    Ok(user)
}

/// Authenticated user, required
///
/// Rejects with 401 when the token is missing, invalid, or names an
/// unknown or inactive user.
pub struct AuthUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::TokenMissing)?;
        Ok(AuthUser(authenticate(state, &token).await?))
    }
}

/// Caller identity on public endpoints
///
/// No token means anonymous. A token that is present but invalid is still rejected.
pub struct Viewer(pub Option<User>);

impl Viewer {
    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }

    /// Response cache key for this caller and the full request path including the query
    pub fn cache_key(&self, uri: &Uri) -> CacheKey {
        let path = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| uri.path());
        CacheKey::Response {
            viewer: self.0.as_ref().map(|u| u.id),
            path: path.to_string(),
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Viewer {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            Some(token) => Ok(Viewer(Some(authenticate(state, &token).await?))),
            None => Ok(Viewer(None)),
        }
    }
}
