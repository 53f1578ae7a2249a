use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::debug;

use crate::errors::AppError;

/// Set by the upstream authentication layer; this service only reads it.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// The authenticated caller. Any resolved `user_id` is authorized for its own
/// partition and nothing else.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub user_id: String,
    pub email: Option<String>,
}

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_value(parts, USER_ID_HEADER).ok_or(AppError::Unauthorized)?;
        let principal = Principal {
            user_id,
            email: header_value(parts, USER_EMAIL_HEADER),
        };
        debug!(
            "Resolved principal {} ({})",
            principal.user_id,
            principal.email.as_deref().unwrap_or("no email")
        );
        Ok(principal)
    }
}
