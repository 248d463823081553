//! Host-facing effects.
//!
//! The session never touches the screen or the speakers directly. Handlers
//! return [`Effect`] values describing what the host (a UI shell, a test
//! harness) should do, which keeps every state machine synchronous and
//! assertable without a rendering stack.

use wire::ParticipantId;

/// Something the host should act on after a session handler ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// The visible board content changed; redraw from the store and live
    /// strokes.
    RenderNeeded,
    /// The presence roster changed; refresh any participant list.
    RosterChanged,
    /// A remote screen-share stream became available (`Some`) or went away
    /// (`None`). At most one share is active at a time.
    RemoteVideo { from: Option<ParticipantId> },
    /// A remote voice stream was attached or detached for a peer.
    RemoteAudio { from: ParticipantId, attached: bool },
    /// A human-readable status line worth surfacing (share ended, peer
    /// negotiation timed out).
    Notice(String),
}

/// Events to broadcast plus effects for the host, as returned by the share
/// and voice machines.
#[derive(Debug, Default)]
pub struct Emitted {
    pub events: Vec<wire::Event>,
    pub effects: Vec<Effect>,
}

impl Emitted {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    pub fn push_event(&mut self, event: wire::Event) {
        self.events.push(event);
    }

    pub fn push_effect(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub fn merge(&mut self, other: Emitted) {
        self.events.extend(other.events);
        self.effects.extend(other.effects);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.effects.is_empty()
    }
}
