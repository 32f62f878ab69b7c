//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps domain errors from vend-catalog and vend-ingest to HTTP status
//! codes. Returns JSON error response bodies with error code and message.
//! Never exposes internal error details in responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use vend_catalog::{CatalogStoreError, EntryError};
use vend_ingest::PipelineError;

/// Structured JSON error response body.
///
/// All error responses use this format for consistency across the API
/// surface.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
///
/// Maps domain errors to appropriate HTTP status codes and structured JSON
/// error bodies. Internal and upstream error details are never exposed to
/// clients.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (422). Syntactically valid HTTP
    /// with semantically invalid content is a 422, same as `Validation`;
    /// only malformed HTTP framing is a 400.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Authentication failure — missing or invalid token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authorization failure — insufficient permissions (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Conflict with current resource state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error (500). Message is logged but not returned.
    #[error("internal error: {0}")]
    Internal(String),

    /// A collaborator service failed or is unreachable (502).
    #[error("upstream service error: {0}")]
    Upstream(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal/upstream error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::Upstream(_) => "An upstream service error occurred".to_string(),
            other => other.to_string(),
        };

        // Log server-side errors for operator visibility.
        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::Upstream(_) => tracing::error!(error = %self, "upstream service error"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<EntryError> for AppError {
    fn from(err: EntryError) -> Self {
        // Every entry-level rejection is a conflict with current state.
        Self::Conflict(err.to_string())
    }
}

impl From<CatalogStoreError> for AppError {
    fn from(err: CatalogStoreError) -> Self {
        match &err {
            CatalogStoreError::NotFound(id) => Self::NotFound(format!("entry {id} not found")),
            CatalogStoreError::Conflict { .. } => Self::Conflict(err.to_string()),
            CatalogStoreError::Duplicate(_) => Self::Conflict(err.to_string()),
            CatalogStoreError::Backend(detail) => Self::Internal(detail.clone()),
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match &err {
            PipelineError::Validation(inner) => Self::Validation(inner.to_string()),
            PipelineError::Entry(inner) => Self::Conflict(inner.to_string()),
            PipelineError::NotFound(id) => Self::NotFound(format!("entry {id} not found")),
            PipelineError::NotLinked(_) => Self::Conflict(err.to_string()),
            PipelineError::PathUnresolvable(_) => Self::Internal(err.to_string()),
            PipelineError::Storage(_) | PipelineError::SourceHost(_) => {
                Self::Upstream(err.to_string())
            }
            PipelineError::Conflict(_) => Self::Conflict(err.to_string()),
            PipelineError::Catalog(detail) => Self::Internal(detail.clone()),
        }
    }
}
