// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent responses.
//!
//! Errors raised inside the browser-facing authorization flow render an HTML
//! failure page and never redirect anywhere. Errors raised by the machine-facing
//! endpoints render an RFC 6749 style JSON body.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::html;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unknown client: {0}")]
    UnknownClient(String),

    #[error("Redirect URI is not registered for this client")]
    RedirectMismatch,

    #[error("Authorization state failed verification")]
    StateTampered,

    #[error("Authorization state expired")]
    StateExpired,

    #[error("Upstream provider error: {0}")]
    Upstream(String),

    #[error("User upsert failed: {0}")]
    UpsertFailure(String),

    #[error("Invalid client: {0}")]
    InvalidClient(String),

    #[error("Invalid grant: {0}")]
    InvalidGrant(String),

    #[error("Unsupported grant type: {0}")]
    UnsupportedGrantType(String),

    #[error("Invalid client metadata: {0}")]
    InvalidClientMetadata(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether this error belongs to the browser-facing flow and renders a page.
    pub fn is_flow_error(&self) -> bool {
        matches!(
            self,
            AppError::UnknownClient(_)
                | AppError::RedirectMismatch
                | AppError::StateTampered
                | AppError::StateExpired
                | AppError::Upstream(_)
                | AppError::UpsertFailure(_)
        )
    }

    /// Render as an HTML failure page whatever the kind. Browser-facing
    /// handlers finish with this so storage and internal errors reach the
    /// user as a page, not a JSON body.
    pub fn into_page(self) -> Response {
        flow_error_response(&self)
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(rename = "error_description", skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_flow_error() {
            return flow_error_response(&self);
        }

        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }
            AppError::InvalidClient(msg) => {
                (StatusCode::UNAUTHORIZED, "invalid_client", Some(msg.clone()))
            }
            AppError::InvalidGrant(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_grant", Some(msg.clone()))
            }
            AppError::UnsupportedGrantType(msg) => (
                StatusCode::BAD_REQUEST,
                "unsupported_grant_type",
                Some(msg.clone()),
            ),
            AppError::InvalidClientMetadata(msg) => (
                StatusCode::BAD_REQUEST,
                "invalid_client_metadata",
                Some(msg.clone()),
            ),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None)
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Render a flow error as a terminal HTML page.
fn flow_error_response(err: &AppError) -> Response {
    let (status, title, message) = match err {
        AppError::UnknownClient(_) => (
            StatusCode::BAD_REQUEST,
            "Unknown application",
            "The application that sent you here is not registered with this service.",
        ),
        AppError::RedirectMismatch => (
            StatusCode::BAD_REQUEST,
            "Invalid redirect",
            "The application asked to be called back at an address it never registered.",
        ),
        AppError::StateTampered => (
            StatusCode::BAD_REQUEST,
            "Sign-in could not be verified",
            "The sign-in request was altered or did not start in this browser.",
        ),
        AppError::StateExpired => (
            StatusCode::BAD_REQUEST,
            "Sign-in expired",
            "The sign-in request took too long to complete.",
        ),
        AppError::Upstream(msg) => {
            tracing::warn!(error = %msg, "Upstream provider failure");
            (
                StatusCode::BAD_GATEWAY,
                "Identity provider error",
                "The identity provider could not complete the sign-in.",
            )
        }
        AppError::UpsertFailure(msg) => {
            tracing::error!(error = %msg, "User upsert failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Account error",
                "Your account could not be saved.",
            )
        }
        AppError::BadRequest(msg) => {
            tracing::debug!(error = %msg, "Malformed browser request");
            (
                StatusCode::BAD_REQUEST,
                "Invalid request",
                "The sign-in request was malformed.",
            )
        }
        AppError::Database(msg) => {
            tracing::error!(error = %msg, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unexpected error",
                "Something went wrong.",
            )
        }
        AppError::Internal(err) => {
            tracing::error!(error = %err, "Internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unexpected error",
                "Something went wrong.",
            )
        }
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Unexpected error",
            "Something went wrong.",
        ),
    };

    (status, Html(html::error_page(title, message))).into_response()
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
