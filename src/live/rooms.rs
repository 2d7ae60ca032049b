//! Connection grouping for broadcast scoping.
//!
//! One room per session id. Tracks the host connection (one per room) and
//! player connections (many per room) and delivers typed [`ServerMessage`]s
//! to one member or the whole room. Dropping a connection only removes it
//! from its room; roster membership is governed by explicit game-flow
//! messages, so a transient network blip never removes a player.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::live::ServerMessage;

/// A message destined for a specific `WebSocket` client.
pub type WsTx = mpsc::UnboundedSender<String>;

/// Identifies a connected client within a room.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientRole {
    Host,
    Player(Uuid),
}

/// Tracks all live `WebSocket` connections across all rooms.
#[derive(Debug, Clone, Default)]
pub struct RoomManager {
    /// session id → map of `ClientRole` → sender channel
    rooms: Arc<DashMap<Uuid, DashMap<ClientRole, WsTx>>>,
}

impl RoomManager {
    /// Create a new empty room manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
        }
    }

    /// Join a connection to a session's room.
    pub fn join(&self, session_id: Uuid, role: ClientRole, tx: WsTx) {
        self.rooms.entry(session_id).or_default().insert(role, tx);
    }

    /// Remove a connection from a session's room.
    pub fn leave(&self, session_id: Uuid, role: &ClientRole) {
        if let Some(members) = self.rooms.get(&session_id) {
            members.remove(role);
            if members.is_empty() {
                drop(members);
                self.rooms.remove(&session_id);
            }
        }
    }

    /// Send a message to one member of a room.
    pub fn send_to(&self, session_id: Uuid, role: &ClientRole, message: &ServerMessage) {
        if let Some(members) = self.rooms.get(&session_id)
            && let Some(tx) = members.get(role)
            && let Ok(text) = serde_json::to_string(message)
        {
            let _ = tx.send(text);
        }
    }

    /// Broadcast a message to every connection in a room.
    pub fn broadcast(&self, session_id: Uuid, message: &ServerMessage) {
        if let Some(members) = self.rooms.get(&session_id)
            && let Ok(text) = serde_json::to_string(message)
        {
            for entry in members.iter() {
                let _ = entry.value().send(text.clone());
            }
        }
    }

    /// Drop a whole room (used when a session finishes).
    pub fn remove_room(&self, session_id: Uuid) {
        self.rooms.remove(&session_id);
    }

    /// Check whether a specific client is in a room.
    #[must_use]
    pub fn is_member(&self, session_id: Uuid, role: &ClientRole) -> bool {
        self.rooms
            .get(&session_id)
            .is_some_and(|members| members.contains_key(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Player;

    fn roster_of(name: &str) -> ServerMessage {
        ServerMessage::RosterChanged {
            players: vec![Player {
                principal_id: Uuid::new_v4(),
                display_name: name.to_string(),
                is_registered: false,
            }],
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_every_member_in_send_order() {
        let rooms = RoomManager::new();
        let room = Uuid::new_v4();

        let (host_tx, mut host_rx) = mpsc::unbounded_channel();
        let (player_tx, mut player_rx) = mpsc::unbounded_channel();
        rooms.join(room, ClientRole::Host, host_tx);
        rooms.join(room, ClientRole::Player(Uuid::new_v4()), player_tx);

        let first = roster_of("one");
        let second = roster_of("two");
        rooms.broadcast(room, &first);
        rooms.broadcast(room, &second);

        for rx in [&mut host_rx, &mut player_rx] {
            let a = rx.recv().await.unwrap_or_default();
            let b = rx.recv().await.unwrap_or_default();
            assert!(a.contains("one"));
            assert!(b.contains("two"));
        }
    }

    #[tokio::test]
    async fn send_to_targets_a_single_member() {
        let rooms = RoomManager::new();
        let room = Uuid::new_v4();
        let player = Uuid::new_v4();

        let (host_tx, mut host_rx) = mpsc::unbounded_channel();
        let (player_tx, mut player_rx) = mpsc::unbounded_channel();
        rooms.join(room, ClientRole::Host, host_tx);
        rooms.join(room, ClientRole::Player(player), player_tx);

        rooms.send_to(
            room,
            &ClientRole::Player(player),
            &ServerMessage::PlayerAccepted { session_id: room },
        );

        assert!(player_rx.recv().await.unwrap_or_default().contains("player_accepted"));
        assert!(host_rx.try_recv().is_err(), "host must not see the reply");
    }

    #[tokio::test]
    async fn leaving_empties_and_drops_the_room() {
        let rooms = RoomManager::new();
        let room = Uuid::new_v4();
        let player = Uuid::new_v4();

        let (tx, _rx) = mpsc::unbounded_channel();
        rooms.join(room, ClientRole::Player(player), tx);
        assert!(rooms.is_member(room, &ClientRole::Player(player)));

        rooms.leave(room, &ClientRole::Player(player));
        assert!(!rooms.is_member(room, &ClientRole::Player(player)));
    }
}
