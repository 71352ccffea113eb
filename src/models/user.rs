use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, FieldErrors};

const MAX_USERNAME_LEN: usize = 150;
const MIN_PASSWORD_LEN: usize = 8;

/// Stored user account
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

/// Public view of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

/// Request body for user registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for user login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Request body carrying a refresh token (refresh and logout)
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Access/refresh pair handed to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Data returned by register and login
#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub user: UserResponse,
    pub tokens: TokenPair,
}

fn push(errors: &mut FieldErrors, field: &str, message: &str) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.to_string());
}

fn valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// Validates a registration payload, collecting every field error at once
pub fn validate_register_request(payload: &RegisterRequest) -> AppResult<()> {
    let mut errors = FieldErrors::new();
    let username = payload.username.trim();

    if username.is_empty() {
        push(&mut errors, "username", "This field may not be blank.");
    } else if username.chars().count() > MAX_USERNAME_LEN {
        push(
            &mut errors,
            "username",
            "Ensure this field has no more than 150 characters.",
        );
    } else if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        push(
            &mut errors,
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }

    if payload.email.trim().is_empty() {
        push(&mut errors, "email", "This field may not be blank.");
    } else if !valid_email(payload.email.trim()) {
        push(&mut errors, "email", "Enter a valid email address.");
    }

    let password = &payload.password;
    if password.is_empty() {
        push(&mut errors, "password", "This field may not be blank.");
    } else {
        if password.chars().count() < MIN_PASSWORD_LEN {
            push(
                &mut errors,
                "password",
                "This password is too short. It must contain at least 8 characters.",
            );
        }
        if password.chars().all(|c| c.is_ascii_digit()) {
            push(&mut errors, "password", "This password is entirely numeric.");
        }
        if !username.is_empty() && password.to_lowercase().contains(&username.to_lowercase()) {
            push(
                &mut errors,
                "password",
                "The password is too similar to the username.",
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

pub fn validate_login_request(payload: &LoginRequest) -> AppResult<()> {
    let mut errors = FieldErrors::new();
    if payload.username.trim().is_empty() {
        push(&mut errors, "username", "This field may not be blank.");
    }
    if payload.password.is_empty() {
        push(&mut errors, "password", "This field may not be blank.");
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}
