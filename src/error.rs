use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Field name used for errors that do not belong to a single input field
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Validation messages keyed by the offending input field
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Invalid input data")]
    Validation(FieldErrors),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Authentication credentials were not provided")]
    TokenMissing,

    #[error("Invalid token: {0}")]
    TokenInvalid(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Validation error for a single field
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        AppError::Validation(errors)
    }

    /// Validation error not tied to any particular field
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::field(NON_FIELD_ERRORS, message)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) | AppError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AppError::TokenMissing | AppError::TokenInvalid(_) => StatusCode::UNAUTHORIZED,
            AppError::ExternalApi(_) | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Machine-readable code carried in the error envelope
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "ALREADY_EXISTS",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::InvalidCredentials => "AUTHENTICATION_ERROR",
            AppError::TokenMissing => "NOT_AUTHENTICATED",
            AppError::TokenInvalid(_) => "INVALID_TOKEN",
            AppError::ExternalApi(_) | AppError::HttpClient(_) => "UPSTREAM_ERROR",
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    /// Message shown to clients. Server-side failures are never echoed verbatim.
    fn public_message(&self) -> String {
        match self {
            AppError::NotFound(msg) | AppError::Conflict(msg) => msg.clone(),
            AppError::Validation(_) => "Invalid input data".to_string(),
            AppError::InvalidCredentials => "Invalid credentials".to_string(),
            AppError::TokenMissing => self.to_string(),
            AppError::TokenInvalid(_) => "Token is invalid or expired".to_string(),
            AppError::ExternalApi(_) | AppError::HttpClient(_) => {
                "Upstream movie provider is unavailable".to_string()
            }
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                "An internal error occurred".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "Request failed");
        } else {
            tracing::debug!(error = %self, code = self.code(), "Request rejected");
        }

        let mut error = json!({
            "code": self.code(),
            "message": self.public_message(),
        });
        match &self {
            AppError::Validation(details) => error["details"] = json!(details),
            AppError::InvalidCredentials => {
                error["details"] = json!({ NON_FIELD_ERRORS: ["Invalid username or password."] })
            }
            _ => {}
        }

        let body = Json(json!({
            "status": "error",
            "error": error,
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(error: AppError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_error_carries_field_details() {
        let (status, body) = body_json(AppError::field("email", "Enter a valid email address.")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"]["email"][0], "Enter a valid email address.");
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let (status, body) = body_json(AppError::Internal("pool exhausted".to_string())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert!(!body["error"]["message"].as_str().unwrap().contains("pool"));
    }

    #[tokio::test]
    async fn test_upstream_error_is_bad_gateway() {
        let (status, body) = body_json(AppError::ExternalApi("TMDb 503".to_string())).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "UPSTREAM_ERROR");
        assert!(body["error"].get("details").is_none());
    }

    #[test]
    fn test_conflict_and_not_found_status() {
        assert_eq!(
            AppError::Conflict("dup".to_string()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::NotFound("gone".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(AppError::TokenMissing.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_invalid_uses_non_field_key() {
        match AppError::invalid("bad body") {
            AppError::Validation(details) => {
                assert_eq!(details[NON_FIELD_ERRORS], vec!["bad body".to_string()])
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
