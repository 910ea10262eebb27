use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::validation::FieldError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Weak credential: {0}")]
    WeakCredential(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Duplicate email: {0}")]
    DuplicateEmail(String),

    #[error("Local store conflict: {0}")]
    LocalStoreConflict(String),

    #[error("Identity provider error: {0}")]
    Provider(String),

    #[error("Identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Registration incomplete: {0}")]
    RegistrationIncomplete(String),

    #[error("Media error: {0}")]
    Media(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn unauthorized() -> Self {
        AppError::Unauthorized("Authentication required".to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(vec![FieldError::new("body", rejection.body_text())])
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut details = None;
        let (status, code, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::Validation(errors) => {
                let message = errors
                    .iter()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .collect::<Vec<_>>()
                    .join(", ");
                details = Some(errors);
                (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    format!("Invalid input: {message}"),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            AppError::WeakCredential(msg) => (StatusCode::BAD_REQUEST, "WEAK_CREDENTIAL", msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            AppError::DuplicateEmail(msg) => (StatusCode::CONFLICT, "DUPLICATE_EMAIL", msg),
            AppError::LocalStoreConflict(msg) => {
                tracing::error!("Local store conflict: {msg}");
                (StatusCode::CONFLICT, "LOCAL_STORE_CONFLICT", msg)
            }
            AppError::Provider(msg) => {
                tracing::warn!("Identity provider error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "PROVIDER_ERROR",
                    "The identity provider returned an unexpected response".to_string(),
                )
            }
            AppError::ProviderUnavailable(msg) => {
                tracing::warn!("Identity provider unavailable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "PROVIDER_UNAVAILABLE",
                    "The identity provider is temporarily unavailable".to_string(),
                )
            }
            AppError::RegistrationIncomplete(msg) => {
                tracing::error!("Registration incomplete: {msg}");
                (StatusCode::BAD_GATEWAY, "REGISTRATION_INCOMPLETE", msg)
            }
            AppError::Media(msg) => {
                tracing::error!("Media error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "MEDIA_ERROR",
                    "A media storage error occurred".to_string(),
                )
            }
            AppError::Database(e) => match &e {
                sqlx::Error::RowNotFound => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    "Resource not found".to_string(),
                ),
                sqlx::Error::Database(db) if db.is_unique_violation() => (
                    StatusCode::CONFLICT,
                    "CONFLICT",
                    "Resource already exists".to_string(),
                ),
                _ => {
                    tracing::error!("Database error: {e}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal server error occurred".to_string(),
                    )
                }
            },
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = match details {
            Some(details) => json!({
                "error": { "code": code, "message": message, "details": details }
            }),
            None => json!({
                "error": { "code": code, "message": message }
            }),
        };

        (status, Json(body)).into_response()
    }
}
