use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::middleware::RegisteredPrincipal;
use crate::error::AppError;
use crate::live::ServerMessage;
use crate::registry::{ActiveSession, LifecycleState, Player};
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Build the session route group: `/sessions/...`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_session))
        .route("/{join_code}", get(get_session))
        .route("/{session_id}/start", post(start_session))
        .route("/{session_id}/finish", post(finish_session))
}

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionRequest {
    template_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    id: Uuid,
    code: u32,
    host_id: Uuid,
    state: LifecycleState,
    template_id: Uuid,
    template_name: String,
    slide_count: usize,
    players: Vec<Player>,
}

fn build_session_response(session: ActiveSession) -> SessionResponse {
    SessionResponse {
        id: session.id,
        code: session.code,
        host_id: session.host,
        state: session.state,
        template_id: session.template.id,
        template_name: session.template.name.clone(),
        slide_count: session.template.slide_count(),
        players: session.players,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `POST /api/v1/sessions` — create a live session from a stored template.
///
/// Freezes the template into the session, allocates a unique join code,
/// writes the durable record and registers the session, all before replying.
async fn create_session(
    State(state): State<AppState>,
    RegisteredPrincipal(host): RegisteredPrincipal,
    Json(body): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let snapshot = state
        .templates
        .get_template_by_id(body.template_id)
        .await
        .map_err(|e| {
            tracing::warn!("template store unavailable: {:#}", e.0);
            AppError::ServiceUnavailable("Template store unavailable; retry.".to_string())
        })?
        .ok_or_else(|| AppError::NotFound("Template not found.".to_string()))?;

    if snapshot.slides.is_empty() {
        return Err(AppError::BadRequest(
            "Template has no slides.".to_string(),
        ));
    }

    let session = state
        .registry
        .create_and_register(host.id, snapshot)
        .await
        .map_err(AppError::from_registry)?;

    Ok((StatusCode::CREATED, Json(build_session_response(session))))
}

/// `GET /api/v1/sessions/{joinCode}` — look up an active session by code.
async fn get_session(
    State(state): State<AppState>,
    Path(join_code): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let code = join_code
        .trim()
        .parse::<u32>()
        .map_err(|_| AppError::NotFound("Session not found.".to_string()))?;

    let session = state
        .registry
        .find_by_code(code)
        .await
        .map_err(AppError::from_registry)?;

    Ok(Json(build_session_response(session)))
}

/// `POST /api/v1/sessions/{sessionId}/start` — close joining and begin play.
async fn start_session(
    State(state): State<AppState>,
    RegisteredPrincipal(host): RegisteredPrincipal,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    transition_as_host(&state, &host.id, session_id, LifecycleState::Started).await?;
    let session = state
        .registry
        .find_by_id(session_id)
        .await
        .map_err(AppError::from_registry)?;
    Ok(Json(build_session_response(session)))
}

/// `POST /api/v1/sessions/{sessionId}/finish` — end the session and evict it
/// from the live table. The durable record remains; the code is reusable.
async fn finish_session(
    State(state): State<AppState>,
    RegisteredPrincipal(host): RegisteredPrincipal,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    transition_as_host(&state, &host.id, session_id, LifecycleState::Finished).await?;

    state
        .registry
        .remove(session_id)
        .await
        .map_err(AppError::from_registry)?;
    state.rooms.remove_room(session_id);

    Ok(StatusCode::NO_CONTENT)
}

/// Host-gated lifecycle transition with a status broadcast to the room.
///
/// A non-host caller gets `NotFound`, indistinguishable from a session that
/// does not exist.
async fn transition_as_host(
    state: &AppState,
    caller: &Uuid,
    session_id: Uuid,
    target: LifecycleState,
) -> Result<(), AppError> {
    let session = state
        .registry
        .find_by_id(session_id)
        .await
        .map_err(AppError::from_registry)?;
    if session.host != *caller {
        return Err(AppError::NotFound("Session not found.".to_string()));
    }

    let previous = session.state;
    let rooms = state.rooms.clone();
    state
        .registry
        .transition(session_id, target, |committed| {
            rooms.broadcast(
                session_id,
                &ServerMessage::SessionStatusChange {
                    status: committed.state,
                    previous,
                },
            );
        })
        .await
        .map_err(AppError::from_registry)
}
