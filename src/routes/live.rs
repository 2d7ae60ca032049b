use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{Principal, middleware};
use crate::error::AppError;
use crate::live::rooms::{ClientRole, WsTx};
use crate::live::{ClientMessage, ServerMessage};
use crate::registry::{Player, PlayerAnswer};
use crate::state::AppState;

/// Build the live-channel route group.
pub fn router() -> Router<AppState> {
    Router::new().route("/live", get(ws_upgrade))
}

#[derive(Deserialize)]
struct LiveQueryParams {
    token: Option<String>,
}

/// `GET /api/v1/live` — upgrade to the live `WebSocket` channel.
///
/// The connection's principal is fixed here, before any message flows: a
/// presented token must resolve, and an absent token triggers guest
/// issuance. The guest token travels back in the `connected` message so the
/// client can keep its identity across the session.
async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<LiveQueryParams>,
    headers: axum::http::HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let token = params
        .token
        .or_else(|| middleware::cookie_from_headers(&headers, "session"));

    let (principal, guest_token) = match token {
        Some(token) => {
            let principal = state
                .identity
                .resolve(&token)
                .await
                .map_err(AppError::from_auth)?;
            (principal, None)
        }
        None => {
            let (guest_token, principal) = state.identity.issue_guest("");
            (principal, Some(guest_token))
        }
    };

    Ok(ws.on_upgrade(move |socket| handle_connection(state, principal, guest_token, socket)))
}

/// Drive one live connection: fan outbound messages from the room channel to
/// the socket, feed inbound frames through the protocol handler, and detach
/// from rooms on disconnect. Dropping the connection never touches the
/// roster; presence is governed by explicit game-flow messages.
async fn handle_connection(
    state: AppState,
    principal: Principal,
    guest_token: Option<String>,
    socket: WebSocket,
) {
    let (mut ws_sink, mut ws_stream) = socket.split();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();

    let connected = ServerMessage::Connected {
        principal: principal.clone(),
        guest_token,
    };
    if let Ok(text) = serde_json::to_string(&connected) {
        let _ = ws_sink.send(Message::Text(text.into())).await;
    }

    // Forward outbound messages (replies and room broadcasts) to the socket.
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sink.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    // Rooms this connection has joined, for cleanup on disconnect.
    let mut joined: HashMap<Uuid, ClientRole> = HashMap::new();

    while let Some(Ok(msg)) = ws_stream.next().await {
        match msg {
            Message::Text(text) => {
                handle_client_message(&state, &principal, &mut joined, &text, &tx).await;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    send_task.abort();
    for (session_id, role) in joined {
        state.rooms.leave(session_id, &role);
    }
    tracing::debug!(principal_id = %principal.id, "live connection closed");
}

/// Message-level entry point of the live protocol, factored out of the
/// socket loop so the contract is testable without a network.
///
/// Replies go to `tx` only; broadcasts go through the room manager inside
/// the registry's per-session critical section, which is what gives every
/// room member the same observation order.
pub async fn handle_client_message(
    state: &AppState,
    principal: &Principal,
    joined: &mut HashMap<Uuid, ClientRole>,
    text: &str,
    tx: &WsTx,
) {
    let Ok(msg) = serde_json::from_str::<ClientMessage>(text) else {
        reply(tx, &ServerMessage::malformed());
        return;
    };

    match msg {
        ClientMessage::CreateSession {
            host_id,
            session_id,
        } => {
            // Silent drop on any mismatch: replying would leak the
            // existence of foreign sessions.
            if host_id != principal.id {
                return;
            }
            let Ok(session) = state.registry.find_by_id(session_id).await else {
                return;
            };
            if session.host != principal.id {
                return;
            }

            state
                .rooms
                .join(session_id, ClientRole::Host, tx.clone());
            joined.insert(session_id, ClientRole::Host);
            reply(
                tx,
                &ServerMessage::SessionReady {
                    session_id,
                    code: session.code,
                },
            );
        }

        ClientMessage::JoinSession {
            session_id,
            display_name,
        } => {
            let name = display_name.trim();
            let player = Player {
                principal_id: principal.id,
                display_name: if name.is_empty() {
                    principal.display_name.clone()
                } else {
                    name.to_string()
                },
                is_registered: !principal.is_guest,
            };

            let role = ClientRole::Player(principal.id);
            let rooms = state.rooms.clone();
            let reply_tx = tx.clone();
            let member_role = role.clone();

            let result = state
                .registry
                .add_player(session_id, player, |session| {
                    // Join the room before broadcasting so the new player
                    // observes the roster change that admitted them.
                    rooms.join(session_id, member_role.clone(), reply_tx.clone());
                    rooms.send_to(
                        session_id,
                        &member_role,
                        &ServerMessage::PlayerAccepted { session_id },
                    );
                    rooms.broadcast(
                        session_id,
                        &ServerMessage::RosterChanged {
                            players: session.players.clone(),
                        },
                    );
                })
                .await;

            match result {
                Ok(()) => {
                    joined.insert(session_id, role);
                }
                Err(err) => reply(tx, &ServerMessage::rejected(&err)),
            }
        }

        ClientMessage::SubmitAnswer {
            session_id,
            slide_index,
            selected,
            answered_at_offset_ms,
        } => {
            let answer = PlayerAnswer {
                principal_id: principal.id,
                slide_index,
                selected,
                answered_at_offset_ms,
            };
            match state.registry.record_answer(session_id, answer).await {
                Ok(()) => reply(tx, &ServerMessage::AnswerRecorded { slide_index }),
                Err(err) => reply(tx, &ServerMessage::rejected(&err)),
            }
        }
    }
}

fn reply(tx: &WsTx, msg: &ServerMessage) {
    if let Ok(text) = serde_json::to_string(msg) {
        let _ = tx.send(text);
    }
}
