use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Duration, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::AuthPrincipal;
use crate::auth::{Principal, password, resolver};
use crate::entities::user;
use crate::error::AppError;
use crate::state::AppState;

/// Build the auth route group: `/auth/...`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/guest", post(issue_guest))
        .route("/me", get(me))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    token: String,
    principal: Principal,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GuestRequest {
    display_name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GuestResponse {
    guest_token: String,
    principal: Principal,
}

fn cookie(name: &str, value: &str, max_age_secs: u64) -> String {
    format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}")
}

/// `POST /api/v1/auth/login` — verify credentials and mint an opaque session
/// token with the configured expiry. The token is returned as JSON and as a
/// `session` cookie for the web layer.
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let found = user::Entity::find()
        .filter(user::Column::Username.eq(body.username.trim()))
        .one(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    // Same rejection whether the user is unknown or the password is wrong.
    let invalid = || AppError::Unauthorized("Invalid username or password.".to_string());
    let account = found.ok_or_else(invalid)?;
    if !password::verify_password(&body.password, &account.password_hash).unwrap_or(false) {
        return Err(invalid());
    }

    let token = resolver::generate_token();
    let ttl = state.config.session_token_ttl_secs;
    let expires_at = Utc::now() + Duration::seconds(i64::try_from(ttl).unwrap_or(86_400));
    state
        .tokens
        .insert(&token, account.id, expires_at)
        .await
        .map_err(|e| {
            tracing::warn!("token store unavailable: {:#}", e.0);
            AppError::ServiceUnavailable("Could not mint a session token; retry.".to_string())
        })?;

    let principal = state
        .identity
        .resolve(&token)
        .await
        .map_err(AppError::from_auth)?;

    tracing::info!(user_id = %account.id, "user logged in");

    let headers = [(header::SET_COOKIE, cookie("session", &token, ttl))];
    Ok((StatusCode::OK, headers, Json(TokenResponse { token, principal })).into_response())
}

/// `POST /api/v1/auth/guest` — issue a fresh anonymous guest identity.
///
/// The guest token is only meaningful to this process; it never enters the
/// user-backed token store.
async fn issue_guest(
    State(state): State<AppState>,
    body: Option<Json<GuestRequest>>,
) -> Response {
    let display_name = body
        .and_then(|Json(b)| b.display_name)
        .unwrap_or_default();
    let (guest_token, principal) = state.identity.issue_guest(&display_name);

    tracing::debug!(principal_id = %principal.id, "guest issued");

    let ttl = state.config.session_token_ttl_secs;
    let headers = [(header::SET_COOKIE, cookie("session", &guest_token, ttl))];
    (
        StatusCode::CREATED,
        headers,
        Json(GuestResponse {
            guest_token,
            principal,
        }),
    )
        .into_response()
}

/// `GET /api/v1/auth/me` — resolve the caller's token to its principal.
async fn me(AuthPrincipal(principal): AuthPrincipal) -> Json<Principal> {
    Json(principal)
}
