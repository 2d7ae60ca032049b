mod auth;
mod health;
mod live;
mod sessions;
mod templates;

pub use live::handle_client_message;

use axum::Router;

use crate::state::AppState;

/// Build the complete application router.
///
/// Structure:
/// - `GET /health` — lightweight health check
/// - `/api/v1/auth/...` — token minting and identity resolution
/// - `/api/v1/templates` — read-only template listing
/// - `/api/v1/sessions/...` — session creation and lifecycle (host-facing)
/// - `GET /api/v1/live` — the WebSocket channel for hosts and players
pub fn router() -> Router<AppState> {
    let api_v1 = Router::new()
        .merge(health::api_router())
        .nest("/auth", auth::router())
        .merge(templates::router())
        .nest("/sessions", sessions::router())
        .merge(live::router());

    Router::new()
        .merge(health::root_router())
        .nest("/api/v1", api_v1)
}
