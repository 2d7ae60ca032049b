//! Wire protocol for the live WebSocket channel.
//!
//! Every message is a tagged variant with a fixed schema: `{"type": ...,
//! "payload": ...}`. Unrecognized tags and malformed payloads are rejected
//! at the boundary instead of trusting caller-supplied shapes. Rejections
//! are always scoped to the offending connection and never broadcast.

pub mod rooms;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Principal;
use crate::registry::{LifecycleState, Player, RegistryError};

/// Messages a client may send over the live channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "snake_case",
    rename_all_fields = "camelCase",
    deny_unknown_fields
)]
pub enum ClientMessage {
    /// Host attaches to the room of a session it created.
    CreateSession { host_id: Uuid, session_id: Uuid },
    /// Player asks to join a session's roster and room.
    JoinSession {
        session_id: Uuid,
        display_name: String,
    },
    /// Player submits an answer for a slide. Recorded, never graded here.
    SubmitAnswer {
        session_id: Uuid,
        slide_index: usize,
        selected: Vec<usize>,
        answered_at_offset_ms: i64,
    },
}

/// Messages the server sends over the live channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// First message on every connection: the resolved principal, plus the
    /// freshly issued guest token when the connection came in anonymous.
    Connected {
        principal: Principal,
        #[serde(skip_serializing_if = "Option::is_none")]
        guest_token: Option<String>,
    },
    /// Reply to a successful `create_session`.
    SessionReady { session_id: Uuid, code: u32 },
    /// Reply to the joining connection on a successful `join_session`.
    PlayerAccepted { session_id: Uuid },
    /// Broadcast to every room member after a roster mutation.
    RosterChanged { players: Vec<Player> },
    /// Reply to a successful `submit_answer`.
    AnswerRecorded { slide_index: usize },
    /// Broadcast on lifecycle transitions.
    SessionStatusChange {
        status: LifecycleState,
        previous: LifecycleState,
    },
    /// Reply to the single offending connection; never broadcast.
    Rejected {
        reason: RejectReason,
        message: String,
    },
}

/// Machine-readable rejection cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    NotFound,
    AlreadyStarted,
    DuplicatePlayer,
    Invalid,
    Unavailable,
}

impl ServerMessage {
    /// Translate a registry failure into a rejection reply.
    #[must_use]
    pub fn rejected(err: &RegistryError) -> Self {
        let reason = match err {
            RegistryError::NotFound => RejectReason::NotFound,
            RegistryError::AlreadyStarted => RejectReason::AlreadyStarted,
            RegistryError::DuplicatePlayer => RejectReason::DuplicatePlayer,
            RegistryError::Unavailable(_) => RejectReason::Unavailable,
            RegistryError::InvalidTransition { .. }
            | RegistryError::NotFinished
            | RegistryError::CodeSpaceExhausted(_)
            | RegistryError::InvalidAnswer(_) => RejectReason::Invalid,
        };
        Self::Rejected {
            reason,
            message: err.to_string(),
        }
    }

    /// Malformed or unrecognized inbound frame.
    #[must_use]
    pub fn malformed() -> Self {
        Self::Rejected {
            reason: RejectReason::Invalid,
            message: "Unrecognized or malformed message.".to_string(),
        }
    }
}
