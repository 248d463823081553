//! In-process channel hub.
//!
//! DESIGN
//! ======
//! One hub hosts any number of board rooms. Each room tracks its subscribed
//! clients (`participant -> signal sender`) and the authoritative presence
//! roster. Fan-out is best-effort `try_send`: a subscriber whose queue is
//! full misses that frame (convergence self-heals through later traffic).
//! The sender of an envelope never receives its own copy.
//!
//! Presence syncs carry the *full* roster and are delivered to every
//! subscriber including the one whose join/leave triggered the sync, so
//! replicas replace their roster rather than merging deltas.
//!
//! `interrupt`/`restore` simulate a transport outage for a single client:
//! while detached, the client's sends fail with `Disconnected` and it
//! receives nothing.

#[cfg(test)]
#[path = "hub_test.rs"]
mod hub_test;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::transport::{ChannelSignal, Transport, TransportError};
use wire::{ChannelMessage, Envelope, ParticipantId, PresenceRecord};

struct Client {
    tx: mpsc::Sender<ChannelSignal>,
    attached: bool,
}

#[derive(Default)]
struct Room {
    clients: HashMap<ParticipantId, Client>,
    presence: HashMap<ParticipantId, PresenceRecord>,
}

impl Room {
    fn roster(&self) -> Vec<PresenceRecord> {
        let mut roster: Vec<PresenceRecord> = self.presence.values().cloned().collect();
        roster.sort_by_key(|r| (r.joined_at, r.participant.id));
        roster
    }

    fn sync_presence(&self) {
        let roster = self.roster();
        for client in self.clients.values().filter(|c| c.attached) {
            let _ = client
                .tx
                .try_send(ChannelSignal::Message(ChannelMessage::PresenceSync { roster: roster.clone() }));
        }
    }
}

#[derive(Default)]
struct HubInner {
    rooms: HashMap<Uuid, Room>,
}

/// An in-process broadcast hub hosting per-board rooms.
#[derive(Clone, Default)]
pub struct LocalHub {
    inner: Arc<Mutex<HubInner>>,
}

impl LocalHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a participant to a board. Returns the outbound transport
    /// half and the receiver inbound signals arrive on.
    #[must_use]
    pub fn subscribe(
        &self,
        board_id: Uuid,
        participant: ParticipantId,
        capacity: usize,
    ) -> (HubChannel, mpsc::Receiver<ChannelSignal>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let mut inner = lock(&self.inner);
        let room = inner.rooms.entry(board_id).or_default();
        room.clients.insert(participant, Client { tx, attached: true });
        info!(%board_id, %participant, clients = room.clients.len(), "hub: client subscribed");

        (HubChannel { inner: Arc::clone(&self.inner), board_id, participant }, rx)
    }

    /// Simulate a transport outage for one client: it stops receiving and
    /// its sends fail until [`LocalHub::restore`].
    pub fn interrupt(&self, board_id: Uuid, participant: ParticipantId) {
        let mut inner = lock(&self.inner);
        let Some(room) = inner.rooms.get_mut(&board_id) else {
            return;
        };
        if let Some(client) = room.clients.get_mut(&participant) {
            client.attached = false;
            let _ = client.tx.try_send(ChannelSignal::Disconnected);
            debug!(%board_id, %participant, "hub: client interrupted");
        }
    }

    /// End a simulated outage. The client is told to resubscribe, after
    /// which it re-tracks presence and flushes its queued mutations.
    pub fn restore(&self, board_id: Uuid, participant: ParticipantId) {
        let mut inner = lock(&self.inner);
        let Some(room) = inner.rooms.get_mut(&board_id) else {
            return;
        };
        if let Some(client) = room.clients.get_mut(&participant) {
            client.attached = true;
            let _ = client.tx.try_send(ChannelSignal::Resubscribed);
            debug!(%board_id, %participant, "hub: client restored");
        }
    }

    /// Current roster of a board, for inspection.
    #[must_use]
    pub fn roster(&self, board_id: Uuid) -> Vec<PresenceRecord> {
        let inner = lock(&self.inner);
        inner.rooms.get(&board_id).map(Room::roster).unwrap_or_default()
    }
}

/// Outbound half of one hub subscription.
pub struct HubChannel {
    inner: Arc<Mutex<HubInner>>,
    board_id: Uuid,
    participant: ParticipantId,
}

impl Transport for HubChannel {
    fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        let inner = lock(&self.inner);
        let room = inner
            .rooms
            .get(&self.board_id)
            .ok_or(TransportError::Disconnected)?;
        let me = room
            .clients
            .get(&self.participant)
            .ok_or(TransportError::Disconnected)?;
        if !me.attached {
            return Err(TransportError::Disconnected);
        }

        for (id, client) in &room.clients {
            if *id == self.participant || !client.attached {
                continue;
            }
            // Best-effort: a full queue drops the frame for that client.
            let _ = client
                .tx
                .try_send(ChannelSignal::Message(ChannelMessage::Event { envelope: envelope.clone() }));
        }
        Ok(())
    }

    fn track(&self, record: PresenceRecord) -> Result<(), TransportError> {
        let mut inner = lock(&self.inner);
        let room = inner
            .rooms
            .get_mut(&self.board_id)
            .ok_or(TransportError::Disconnected)?;
        if !room.clients.get(&self.participant).is_some_and(|c| c.attached) {
            return Err(TransportError::Disconnected);
        }
        room.presence.insert(self.participant, record);
        room.sync_presence();
        Ok(())
    }

    fn unsubscribe(&self) {
        let mut inner = lock(&self.inner);
        let room_emptied = {
            let Some(room) = inner.rooms.get_mut(&self.board_id) else {
                return;
            };
            room.clients.remove(&self.participant);
            room.presence.remove(&self.participant);
            info!(board_id = %self.board_id, participant = %self.participant, remaining = room.clients.len(), "hub: client unsubscribed");
            if room.clients.is_empty() {
                true
            } else {
                room.sync_presence();
                false
            }
        };
        if room_emptied {
            inner.rooms.remove(&self.board_id);
        }
    }
}

fn lock(inner: &Arc<Mutex<HubInner>>) -> std::sync::MutexGuard<'_, HubInner> {
    // A poisoned hub lock means a panic mid-broadcast; propagating the data
    // is still safe since every room operation leaves consistent state.
    inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
