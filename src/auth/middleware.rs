use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, header};

use crate::auth::Principal;
use crate::error::AppError;
use crate::state::AppState;

/// Resolved principal (registered user or locally issued guest) extracted
/// from `Authorization: Bearer <token>` or the `session` cookie.
///
/// Use as an extractor in handler parameters to require authentication:
/// ```ignore
/// async fn handler(AuthPrincipal(principal): AuthPrincipal) -> impl IntoResponse { ... }
/// ```
#[derive(Debug, Clone)]
pub struct AuthPrincipal(pub Principal);

impl FromRequestParts<AppState> for AuthPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts)
            .ok_or_else(|| AppError::Unauthorized("Missing session token.".to_string()))?;

        let principal = state
            .identity
            .resolve(&token)
            .await
            .map_err(AppError::from_auth)?;

        Ok(Self(principal))
    }
}

/// Registered (non-guest) principal. Hosting a session requires one.
#[derive(Debug, Clone)]
pub struct RegisteredPrincipal(pub Principal);

impl FromRequestParts<AppState> for RegisteredPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthPrincipal(principal) = AuthPrincipal::from_request_parts(parts, state).await?;
        if principal.is_guest {
            return Err(AppError::Forbidden(
                "A registered account is required.".to_string(),
            ));
        }
        Ok(Self(principal))
    }
}

/// Pull a session token from the authorization header or the `session` cookie.
#[must_use]
pub fn token_from_parts(parts: &Parts) -> Option<String> {
    bearer_token(parts).or_else(|| cookie_value(parts, "session"))
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(std::string::ToString::to_string)
}

/// Find a named cookie in the `Cookie` header.
#[must_use]
pub fn cookie_value(parts: &Parts, name: &str) -> Option<String> {
    cookie_from_headers(&parts.headers, name)
}

/// Find a named cookie given the raw header map. Shared with the `WebSocket`
/// upgrade path, which authenticates before a request ever has `Parts`.
#[must_use]
pub fn cookie_from_headers(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| {
            raw.split(';')
                .filter_map(|pair| pair.trim().split_once('='))
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        })
}
