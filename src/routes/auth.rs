use axum::extract::State;

use crate::{
    api::{ApiResponse, AppJson, AppState, AuthUser},
    auth::{hash_password, verify_password},
    error::{AppError, AppResult},
    models::{
        user::{validate_login_request, validate_register_request},
        AuthPayload, LoginRequest, RefreshRequest, RegisterRequest, TokenPair, UserResponse,
    },
};

fn required_refresh(payload: RefreshRequest) -> AppResult<String> {
    payload
        .refresh
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::field("refresh", "This field is required."))
}

/// Handler for account registration
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<ApiResponse<AuthPayload>> {
    validate_register_request(&payload)?;
    let username = payload.username.trim();

    if state.users.find_by_username(username).await?.is_some() {
        return Err(AppError::field(
            "username",
            "A user with that username already exists.",
        ));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = state
        .users
        .create(username, payload.email.trim(), &password_hash)
        .await?;
    let tokens = state.tokens.issue_pair(&user)?;

    tracing::info!(user_id = user.id, username = %user.username, "User registered");

    Ok(ApiResponse::created(AuthPayload {
        user: UserResponse::from(&user),
        tokens,
    })
    .with_message("User registered successfully"))
}

/// Handler for username/password login
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<ApiResponse<AuthPayload>> {
    validate_login_request(&payload)?;

    let user = state
        .users
        .find_by_username(payload.username.trim())
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(&payload.password, &user.password_hash)? || !user.is_active {
        tracing::debug!(user_id = user.id, "Login rejected");
        return Err(AppError::InvalidCredentials);
    }

    let tokens = state.tokens.issue_pair(&user)?;
    tracing::info!(user_id = user.id, "User logged in");

    Ok(ApiResponse::ok(AuthPayload {
        user: UserResponse::from(&user),
        tokens,
    })
    .with_message("Login successful"))
}

/// Handler for refresh token rotation
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> AppResult<ApiResponse<TokenPair>> {
    let token = required_refresh(payload)?;
    let tokens = state.tokens.refresh(&token).await?;
    Ok(ApiResponse::ok(tokens).with_message("Token refreshed successfully"))
}

/// Handler for logout; blacklists the submitted refresh token
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(payload): AppJson<RefreshRequest>,
) -> AppResult<ApiResponse<()>> {
    let token = required_refresh(payload)?;
    state.tokens.revoke(&token, user.id).await?;
    Ok(ApiResponse::<()>::message("Logged out successfully"))
}

/// Handler for the current user's profile
pub async fn me(AuthUser(user): AuthUser) -> ApiResponse<UserResponse> {
    ApiResponse::ok(UserResponse::from(&user))
}
