use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    database: &'static str,
    active_sessions: usize,
}

/// `GET /health` — lightweight liveness probe.
async fn root_health() -> &'static str {
    "ok"
}

/// `GET /api/v1/health` — database connectivity plus registry stats.
async fn api_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.db.ping().await {
        Ok(()) => "connected",
        Err(_) => "disconnected",
    };

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        database,
        active_sessions: state.registry.active_count(),
    })
}

/// Root-level health route (no `/api/v1` prefix).
pub fn root_router() -> Router<AppState> {
    Router::new().route("/health", get(root_health))
}

/// Detailed health route under `/api/v1`.
pub fn api_router() -> Router<AppState> {
    Router::new().route("/health", get(api_health))
}
