// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Login cancelled or denied, or the provider handed back a malformed identity.
    #[error("Identity provider error: {0}")]
    IdentityProvider(String),

    /// A backend call threw or rejected.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("A login is already in progress")]
    LoginInProgress,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code for this error category.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::IdentityProvider(_) => "identity_provider_error",
            AppError::BackendUnavailable(_) => "backend_unavailable",
            AppError::Validation(_) => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized => "unauthorized",
            AppError::LoginInProgress => "login_in_progress",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// Whether the person can fix this by changing their input and retrying.
    pub fn is_retryable_input_error(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, None),
            AppError::LoginInProgress => (StatusCode::CONFLICT, None),
            AppError::IdentityProvider(msg) => (StatusCode::UNAUTHORIZED, Some(msg.clone())),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, Some(msg.clone())),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, Some(msg.clone())),
            AppError::BackendUnavailable(msg) => {
                tracing::warn!(error = %msg, "Backend call failed");
                (StatusCode::BAD_GATEWAY, Some(msg.clone()))
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
        };

        let body = ErrorResponse {
            error: self.kind().to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for services and handlers
pub type Result<T> = std::result::Result<T, AppError>;
