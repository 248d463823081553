//! Shared relay state.
//!
//! DESIGN
//! ======
//! `RelayState` is injected into Axum handlers via the `State` extractor.
//! It holds a map of live board rooms; each room tracks its connected
//! clients (`participant -> sender`) and the authoritative presence roster.
//! The relay stores no document state at all — every board element lives in
//! the participants' replicas, and a client that joins mid-session catches
//! up from peer traffic, not from the relay.

#[cfg(test)]
#[path = "state_test.rs"]
mod state_test;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info};
use uuid::Uuid;

use wire::{ChannelMessage, Envelope, ParticipantId, PresenceRecord};

/// Per-board live state.
#[derive(Default)]
struct Room {
    /// Connected clients: participant id -> sender for outgoing messages.
    clients: HashMap<ParticipantId, mpsc::Sender<ChannelMessage>>,
    /// Authoritative presence roster for this board.
    presence: HashMap<ParticipantId, PresenceRecord>,
}

impl Room {
    fn roster(&self) -> Vec<PresenceRecord> {
        let mut roster: Vec<PresenceRecord> = self.presence.values().cloned().collect();
        roster.sort_by_key(|r| (r.joined_at, r.participant.id));
        roster
    }

    /// Deliver the full roster to every connected client, the joiner and
    /// leaver's peers alike. Replicas replace, never merge.
    fn sync_presence(&self) {
        let roster = self.roster();
        for tx in self.clients.values() {
            let _ = tx.try_send(ChannelMessage::PresenceSync { roster: roster.clone() });
        }
    }
}

/// Shared relay state, injected into Axum handlers via the State extractor.
#[derive(Clone, Default)]
pub struct RelayState {
    boards: Arc<RwLock<HashMap<Uuid, Room>>>,
}

impl RelayState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connected client in its board room.
    pub async fn join(
        &self,
        board_id: Uuid,
        participant: ParticipantId,
        tx: mpsc::Sender<ChannelMessage>,
    ) {
        let mut boards = self.boards.write().await;
        let room = boards.entry(board_id).or_default();
        room.clients.insert(participant, tx);
        info!(%board_id, %participant, clients = room.clients.len(), "relay: client joined");
    }

    /// Remove a client, drop its presence entry, resync the remaining peers.
    /// An emptied room is evicted entirely.
    pub async fn part(&self, board_id: Uuid, participant: ParticipantId) {
        let mut boards = self.boards.write().await;
        let Some(room) = boards.get_mut(&board_id) else {
            return;
        };
        room.clients.remove(&participant);
        room.presence.remove(&participant);
        info!(%board_id, %participant, remaining = room.clients.len(), "relay: client parted");
        if room.clients.is_empty() {
            boards.remove(&board_id);
        } else {
            room.sync_presence();
        }
    }

    /// Forward an envelope to every client in the room except its sender.
    /// Best-effort per client: a full queue drops the frame for that client.
    pub async fn broadcast(&self, board_id: Uuid, envelope: Envelope) {
        let boards = self.boards.read().await;
        let Some(room) = boards.get(&board_id) else {
            return;
        };
        for (id, tx) in &room.clients {
            if *id == envelope.from {
                continue;
            }
            if tx
                .try_send(ChannelMessage::Event { envelope: envelope.clone() })
                .is_err()
            {
                debug!(%board_id, client = %id, "relay: slow client dropped a frame");
            }
        }
    }

    /// Upsert a presence record and sync the full roster to everyone.
    pub async fn track(&self, board_id: Uuid, record: PresenceRecord) {
        let mut boards = self.boards.write().await;
        let Some(room) = boards.get_mut(&board_id) else {
            return;
        };
        room.presence.insert(record.participant.id, record);
        room.sync_presence();
    }

    /// Current roster of a board, for inspection.
    pub async fn roster(&self, board_id: Uuid) -> Vec<PresenceRecord> {
        let boards = self.boards.read().await;
        boards.get(&board_id).map(Room::roster).unwrap_or_default()
    }
}
