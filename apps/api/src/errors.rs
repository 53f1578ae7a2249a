use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Optimistic-concurrency violation or a transition the state machine forbids.
    /// The caller re-reads and decides whether to retry.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A multi-document operation stopped part-way. `updated_ids` lists the documents
    /// already rewritten so a retry can be reasoned about.
    #[error("Partial failure after updating {updated_ids:?}: {message}")]
    PartialFailure {
        updated_ids: Vec<String>,
        message: String,
    },

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Translates store-level outcomes that carry business meaning (missing document,
    /// lost optimistic race) into the component-level taxonomy. Anything else
    /// propagates unchanged as `AppError::Store`.
    pub fn from_store(err: StoreError, what: impl std::fmt::Display) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound(format!("{what} not found")),
            StoreError::Conflict => AppError::Conflict(format!("{what} already exists")),
            StoreError::PreconditionFailed => AppError::Conflict(format!(
                "{what} was modified concurrently; re-read and retry"
            )),
            other => AppError::Store(other),
        }
    }

    /// Stable machine-readable code, also used in logs.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Conflict(_) => "CONFLICT",
            AppError::PartialFailure { .. } => "PARTIAL_FAILURE",
            AppError::Upstream(_) => "UPSTREAM_ERROR",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Store(_) => "STORE_ERROR",
            AppError::S3(_) => "S3_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Malformed or mistyped JSON bodies are caller errors, reported like any other
/// validation failure instead of axum's plain-text 422.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::PartialFailure {
                updated_ids,
                message,
            } => {
                tracing::error!("Partial failure (updated {updated_ids:?}): {message}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Operation partially applied; safe to retry: {message}"),
                )
            }
            AppError::Upstream(msg) => {
                tracing::error!("Upstream error: {msg}");
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A storage error occurred".to_string(),
                )
            }
            AppError::S3(msg) => {
                tracing::error!("S3 error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A blob storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let AppError::PartialFailure { updated_ids, .. } = &self {
            error["updatedIds"] = json!(updated_ids);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
