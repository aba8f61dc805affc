//! Closed error taxonomy for the query path.
//!
//! `ModelError` is everything the upstream model endpoint can signal;
//! `AppError` adds request validation and owns the single mapping to an
//! HTTP status and a user-safe body. Raw detail stays in logs.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

use super::message::ErrorResponse;

/// Failure kinds surfaced by the model endpoint. The detail string is
/// for server-side logging only and never reaches a client.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("access denied by model provider: {0}")]
    AccessDenied(String),

    #[error("model not found: {0}")]
    ResourceNotFound(String),

    #[error("model endpoint throttled: {0}")]
    Throttled(String),

    #[error("unexpected model error: {0}")]
    Unknown(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Model(ModelError::AccessDenied(_)) => StatusCode::FORBIDDEN,
            AppError::Model(ModelError::ResourceNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Model(ModelError::Throttled(_)) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Model(ModelError::Unknown(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Fixed client-visible message. Validation messages describe what was
    /// wrong with the request; model failures map to generic text.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Model(ModelError::AccessDenied(_)) => "Access denied".to_string(),
            AppError::Model(ModelError::ResourceNotFound(_)) => "Model unavailable".to_string(),
            AppError::Model(ModelError::Throttled(_)) => {
                "Too many requests, please try again later".to_string()
            }
            AppError::Model(ModelError::Unknown(_)) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::new(self.public_message());
        (self.status(), Json(body)).into_response()
    }
}
