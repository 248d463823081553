//! Event kinds carried by broadcast envelopes.
//!
//! Three families share the channel:
//! - document events that mutate the shared element set,
//! - screen-share signaling between one sharer and each viewer,
//! - voice-mesh signaling between every pair of call participants.
//!
//! Signaling events are *targeted*: they carry a `to` participant and every
//! other receiver ignores them. Document events apply to all replicas.

#[cfg(test)]
#[path = "event_test.rs"]
mod event_test;

use board::Point;
use board::element::{BoardElement, ElementId, ElementPatch};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ParticipantId;

/// One point of an in-progress stroke, for live low-latency feedback while a
/// path is being drawn. The full path is committed via [`Event::AddElement`]
/// on pointer release; segments are ephemeral and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawSegment {
    /// Identity of the stroke being drawn. Becomes the committed path's
    /// element id, letting replicas supersede the live stroke on commit.
    pub stroke_id: ElementId,
    pub point: Point,
    /// Stroke color as `#rrggbb`.
    pub color: String,
    pub stroke_width: f64,
}

/// A targeted session description (offer or answer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalPayload {
    pub to: ParticipantId,
    pub sdp: String,
}

/// A targeted ICE candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePayload {
    pub to: ParticipantId,
    pub candidate: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
}

/// Every message kind a participant can broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "kebab-case")]
pub enum Event {
    // --- Document ---
    /// Live stroke feedback while a path is in progress.
    DrawSegment(DrawSegment),
    /// Commit a full element. Duplicate ids are ignored by replicas, which
    /// makes replay idempotent.
    AddElement { element: BoardElement },
    /// Merge a sparse patch into an element. Unknown ids are ignored.
    UpdateElement { id: ElementId, patch: ElementPatch },
    /// Remove an element. Unknown ids are ignored.
    DeleteElement { id: ElementId },
    /// The sender undid their own creation; replicas delete the id without
    /// touching their own history stacks.
    Undo { id: ElementId },
    /// Reset the entire element set on every replica. The strongest
    /// consistency operation available — partial clears have no well-defined
    /// reconciliation.
    ClearBoard,

    // --- Screen share ---
    /// The sender began sharing their screen.
    ShareStarted,
    /// The sender stopped sharing (or their capture track ended).
    ShareStopped,
    ShareOffer(SignalPayload),
    ShareAnswer(SignalPayload),
    ShareCandidate(CandidatePayload),

    // --- Voice mesh ---
    /// The sender joined the voice call.
    VoiceJoin,
    /// The sender left the voice call. Peers tear down their link to the
    /// sender immediately instead of waiting on connection-state callbacks.
    VoiceLeave,
    VoiceOffer(SignalPayload),
    VoiceAnswer(SignalPayload),
    VoiceCandidate(CandidatePayload),
}

impl Event {
    /// Stable kind name, for logging and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DrawSegment(_) => "draw-segment",
            Self::AddElement { .. } => "add-element",
            Self::UpdateElement { .. } => "update-element",
            Self::DeleteElement { .. } => "delete-element",
            Self::Undo { .. } => "undo",
            Self::ClearBoard => "clear-board",
            Self::ShareStarted => "share-started",
            Self::ShareStopped => "share-stopped",
            Self::ShareOffer(_) => "share-offer",
            Self::ShareAnswer(_) => "share-answer",
            Self::ShareCandidate(_) => "share-candidate",
            Self::VoiceJoin => "voice-join",
            Self::VoiceLeave => "voice-leave",
            Self::VoiceOffer(_) => "voice-offer",
            Self::VoiceAnswer(_) => "voice-answer",
            Self::VoiceCandidate(_) => "voice-candidate",
        }
    }

    /// The participant a targeted signaling event is addressed to, if any.
    /// Document and broadcast events return `None`.
    #[must_use]
    pub fn target(&self) -> Option<ParticipantId> {
        match self {
            Self::ShareOffer(p) | Self::ShareAnswer(p) | Self::VoiceOffer(p) | Self::VoiceAnswer(p) => {
                Some(p.to)
            }
            Self::ShareCandidate(p) | Self::VoiceCandidate(p) => Some(p.to),
            _ => None,
        }
    }

    /// Whether this event mutates the shared document. Used to decide what
    /// gets queued while the channel is disconnected.
    #[must_use]
    pub fn is_document_mutation(&self) -> bool {
        matches!(
            self,
            Self::AddElement { .. }
                | Self::UpdateElement { .. }
                | Self::DeleteElement { .. }
                | Self::Undo { .. }
                | Self::ClearBoard
        )
    }

    /// Convenience constructor for a draw segment.
    #[must_use]
    pub fn draw_segment(stroke_id: Uuid, point: Point, color: &str, stroke_width: f64) -> Self {
        Self::DrawSegment(DrawSegment { stroke_id, point, color: color.to_string(), stroke_width })
    }
}
