//! API Error Types
//!
//! Centralized error handling for all account operations. Validation
//! failures serialize as a field-keyed map, `{"field": ["message", ...]}`;
//! every other error uses the `{"error", "message"}` envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::collections::BTreeMap;

/// Validation errors keyed by input field
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct FieldErrors(pub BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// A map holding one message under one field
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Account service errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid input")]
    Validation(FieldErrors),

    #[error("Username already taken.")]
    DuplicateUsername,

    #[error("Email already registered.")]
    DuplicateEmail,

    #[error("Passwords do not match.")]
    PasswordMismatch,

    #[error("Password does not meet requirements")]
    WeakPassword(Vec<String>),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Authentication credentials were not provided.")]
    Unauthenticated,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ApiError::Validation(errors) => {
                return (StatusCode::BAD_REQUEST, Json(errors.clone())).into_response();
            }
            ApiError::DuplicateUsername => {
                return validation_response(FieldErrors::single("username", self.to_string()));
            }
            ApiError::DuplicateEmail => {
                return validation_response(FieldErrors::single("email", self.to_string()));
            }
            ApiError::PasswordMismatch => {
                return validation_response(FieldErrors::single("password2", self.to_string()));
            }
            ApiError::WeakPassword(rules) => {
                let mut errors = FieldErrors::new();
                for rule in rules {
                    errors.add("password", rule.clone());
                }
                return validation_response(errors);
            }
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                self.to_string(),
            ),
            ApiError::InvalidToken | ApiError::TokenRevoked => (
                StatusCode::UNAUTHORIZED,
                "invalid_token",
                self.to_string(),
            ),
            ApiError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                self.to_string(),
            ),
            ApiError::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "configuration_error",
                msg.clone(),
            ),
            ApiError::Database(_) | ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        };

        (
            status,
            Json(serde_json::json!({
                "error": error_code,
                "message": message
            })),
        )
            .into_response()
    }
}

fn validation_response(errors: FieldErrors) -> Response {
    (StatusCode::BAD_REQUEST, Json(errors)).into_response()
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        // A write that loses the uniqueness race surfaces the same field
        // error as the pre-check.
        if let sqlx::Error::Database(db_err) = &err {
            if matches!(db_err.kind(), sqlx::error::ErrorKind::UniqueViolation) {
                match db_err.constraint() {
                    Some("accounts_username_key") => return ApiError::DuplicateUsername,
                    Some("accounts_email_key") => return ApiError::DuplicateEmail,
                    _ => {}
                }
            }
        }

        tracing::error!("Database error: {:?}", err);
        ApiError::Database(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for ApiError {
    fn from(err: argon2::password_hash::Error) -> Self {
        tracing::error!("Password hashing error: {:?}", err);
        ApiError::Internal
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::debug!("JWT error: {:?}", err);
        ApiError::InvalidToken
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Invalid value.".to_string());
                fields.add(field, message);
            }
        }
        ApiError::Validation(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_email_is_field_keyed() {
        let response = ApiError::DuplicateEmail.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["email"][0], "Email already registered.");
    }

    #[tokio::test]
    async fn test_weak_password_lists_every_rule() {
        let response = ApiError::WeakPassword(vec![
            "This password is too short. It must contain at least 8 characters.".to_string(),
            "This password is entirely numeric.".to_string(),
        ])
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["password"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_token_errors_use_envelope() {
        let response = ApiError::TokenRevoked.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        assert_eq!(body["error"], "invalid_token");
        assert_eq!(body["message"], "Token has been revoked");
    }
}
