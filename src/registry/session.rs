//! The authoritative in-memory record of one live game.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::template::TemplateSnapshot;

/// Lifecycle of an active session.
///
/// Legal edges: `Created -> Started`, `Started -> Finished`,
/// `Created -> Finished` (host aborts before start). `Finished` is terminal
/// and makes the registry entry eligible for eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Host has registered the session; accepting players.
    Created,
    /// Host has closed joining and begun presenting slides.
    Started,
    /// Terminal.
    Finished,
}

impl LifecycleState {
    /// Whether moving to `target` is a legal lifecycle edge.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Created, Self::Started)
                | (Self::Created, Self::Finished)
                | (Self::Started, Self::Finished)
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Started => "started",
            Self::Finished => "finished",
        }
    }
}

/// One member of a session's player roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub principal_id: Uuid,
    pub display_name: String,
    pub is_registered: bool,
}

/// One entry of the append-only answer log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerAnswer {
    pub principal_id: Uuid,
    pub slide_index: usize,
    pub selected: Vec<usize>,
    /// Milliseconds since the slide was presented.
    pub answered_at_offset_ms: i64,
}

/// The live-play record held by the registry while a session is active.
///
/// `id`, `host` and `template` are assigned at creation and immutable
/// afterwards; players only ever mutate `players`, `answers` and
/// `current_question` through the registry's operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub id: Uuid,
    pub code: u32,
    pub host: Uuid,
    pub state: LifecycleState,
    pub players: Vec<Player>,
    pub template: TemplateSnapshot,
    /// Per-player slide index they are currently answering. Absent means the
    /// game has not started for that player.
    pub current_question: HashMap<Uuid, usize>,
    pub answers: Vec<PlayerAnswer>,
}

impl ActiveSession {
    #[must_use]
    pub fn new(id: Uuid, code: u32, host: Uuid, template: TemplateSnapshot) -> Self {
        Self {
            id,
            code,
            host,
            state: LifecycleState::Created,
            players: Vec::new(),
            template,
            current_question: HashMap::new(),
            answers: Vec::new(),
        }
    }

    /// Whether a player with this principal id is already on the roster.
    #[must_use]
    pub fn has_player(&self, principal_id: Uuid) -> bool {
        self.players.iter().any(|p| p.principal_id == principal_id)
    }
}
