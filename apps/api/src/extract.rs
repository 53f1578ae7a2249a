//! Request extractors whose rejections come back as `AppError`.

use axum::extract::FromRequest;

use crate::errors::AppError;

/// Drop-in for `axum::Json` on request bodies.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
