use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::auth::AuthError;
use crate::registry::RegistryError;

/// Unified application error type that maps to JSON HTTP responses.
///
/// Response format: `{ "error": { "code": "...", "message": "..." } }`.
pub enum AppError {
    /// 400 Bad Request
    BadRequest(String),
    /// 401 Unauthorized
    Unauthorized(String),
    /// 403 Forbidden
    Forbidden(String),
    /// 404 Not Found
    NotFound(String),
    /// 409 Conflict
    Conflict(String),
    /// 503 Service Unavailable (durable store unreachable; retryable)
    ServiceUnavailable(String),
    /// 500 Internal Server Error (wraps any error, logs details, returns generic message)
    Internal(anyhow::Error),
}

impl AppError {
    /// Map the registry taxonomy onto HTTP responses.
    ///
    /// `NotFound` is deliberately the same for "does not exist" and "exists
    /// but not yours" so callers cannot probe for foreign sessions.
    #[must_use]
    pub fn from_registry(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound => Self::NotFound("Session not found.".to_string()),
            RegistryError::AlreadyStarted => {
                Self::Conflict("Session has already started.".to_string())
            }
            RegistryError::DuplicatePlayer => {
                Self::Conflict("Player is already in the session.".to_string())
            }
            RegistryError::InvalidTransition { from, to } => Self::Conflict(format!(
                "Illegal lifecycle transition from {} to {}.",
                from.as_str(),
                to.as_str()
            )),
            RegistryError::NotFinished => {
                Self::Conflict("Only finished sessions can be removed.".to_string())
            }
            RegistryError::CodeSpaceExhausted(_) => {
                Self::Conflict("No join codes available; retry later.".to_string())
            }
            RegistryError::InvalidAnswer(msg) => Self::BadRequest(msg),
            RegistryError::Unavailable(err) => {
                tracing::warn!("durable store unavailable: {err:#}");
                Self::ServiceUnavailable("Storage temporarily unavailable; retry.".to_string())
            }
        }
    }

    /// Map identity-resolution failures onto HTTP responses.
    #[must_use]
    pub fn from_auth(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated => {
                Self::Unauthorized("Invalid or expired session token.".to_string())
            }
            AuthError::Unavailable(err) => {
                tracing::warn!("identity store unavailable: {err:#}");
                Self::ServiceUnavailable("Identity temporarily unavailable; retry.".to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            Self::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", msg),
            Self::Internal(err) => {
                tracing::error!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        (
            status,
            Json(json!({
                "error": {
                    "code": code,
                    "message": message,
                }
            })),
        )
            .into_response()
    }
}

/// Allow `?` to automatically convert any `anyhow::Error` into `AppError::Internal`.
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Internal(err.into())
    }
}
