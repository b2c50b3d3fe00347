use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::extraction::ExtractError;
use crate::providers::{ProviderError, ProviderKind};

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Insufficient credits: {required} required, {available} available")]
    InsufficientCredits { required: u32, available: u64 },

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Provider transient failure: {0}")]
    ProviderTransient(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Maps the failure of a named provider onto the public taxonomy.
    /// Auth failures read as "unavailable" (bad credentials), quota as "transient".
    pub fn from_provider(provider: ProviderKind, err: ProviderError) -> Self {
        match err {
            ProviderError::Unavailable(msg) | ProviderError::AuthFailure(msg) => {
                AppError::ProviderUnavailable(format!("{provider}: {msg}"))
            }
            ProviderError::Transient(msg) | ProviderError::QuotaExceeded(msg) => {
                AppError::ProviderTransient(format!("{provider}: {msg}"))
            }
            ProviderError::MalformedResponse(msg) => {
                AppError::MalformedResponse(format!("{provider}: {msg}"))
            }
        }
    }
}

impl From<ExtractError> for AppError {
    fn from(err: ExtractError) -> Self {
        AppError::MalformedResponse(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::InsufficientCredits { required, .. } => (
                StatusCode::PAYMENT_REQUIRED,
                "INSUFFICIENT_CREDITS",
                format!("You need {required} credit(s) for this action. Please purchase more credits."),
            ),
            AppError::ProviderUnavailable(msg) => {
                tracing::error!("Provider unavailable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "PROVIDER_UNAVAILABLE",
                    "The AI service is not available right now".to_string(),
                )
            }
            AppError::ProviderTransient(msg) => {
                tracing::error!("Provider transient failure: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "PROVIDER_TRANSIENT",
                    "The AI service is busy. Please try again shortly".to_string(),
                )
            }
            AppError::MalformedResponse(msg) => {
                tracing::error!("Malformed provider response: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "MALFORMED_RESPONSE",
                    "The AI service returned an unusable answer. Please try again".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Redis(e) => {
                tracing::error!("Redis error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
