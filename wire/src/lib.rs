//! Shared wire model for the realtime broadcast channel.
//!
//! This crate owns the representation used by every participant and by the
//! relay. The original transport carried ad hoc JSON blobs per message kind;
//! here the payload schema is explicit and versioned: every [`Envelope`]
//! stamps [`PROTOCOL_VERSION`], and decoding rejects versions it does not
//! understand rather than guessing.
//!
//! Delivery semantics the schema is designed around: at-most-once, FIFO per
//! sender, no global order across senders. Every event is therefore either
//! idempotent or convergent when applied to a replica.

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;

pub mod event;

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub use event::{CandidatePayload, DrawSegment, Event, SignalPayload};

/// Version stamped into every envelope. Bump on any incompatible change to
/// [`Event`] or its payloads.
pub const PROTOCOL_VERSION: u16 = 1;

/// Identifier of a session participant, supplied by the identity layer.
pub type ParticipantId = Uuid;

/// Error returned by [`decode`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The text could not be parsed as an envelope.
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The envelope carries a protocol version this build does not speak.
    #[error("unsupported protocol version: {0} (expected {PROTOCOL_VERSION})")]
    UnsupportedVersion(u16),
}

impl CodecError {
    /// Stable grepable code for logs and metrics.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed-envelope",
            Self::UnsupportedVersion(_) => "unsupported-version",
        }
    }
}

/// The identity object for one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// One entry in a board's presence roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub participant: Participant,
    /// Milliseconds since the Unix epoch when the participant subscribed.
    pub joined_at: i64,
}

/// A single broadcast message on a board channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Unique identifier for this message.
    pub id: Uuid,
    /// Protocol version, always [`PROTOCOL_VERSION`] for outbound frames.
    pub version: u16,
    /// Milliseconds since the Unix epoch when the message was created.
    pub ts: i64,
    /// The board channel this message belongs to.
    pub board_id: Uuid,
    /// Sending participant.
    pub from: ParticipantId,
    /// The event payload.
    #[serde(flatten)]
    pub event: Event,
}

impl Envelope {
    /// Build an envelope for the current protocol version, stamped with the
    /// current time.
    #[must_use]
    pub fn new(board_id: Uuid, from: ParticipantId, event: Event) -> Self {
        Self { id: Uuid::new_v4(), version: PROTOCOL_VERSION, ts: now_ms(), board_id, from, event }
    }
}

/// What the channel delivers to a subscribed client. Presence syncs replace
/// the whole roster; they are never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChannelMessage {
    /// A peer's broadcast envelope.
    Event { envelope: Envelope },
    /// The channel's authoritative participant list.
    PresenceSync { roster: Vec<PresenceRecord> },
}

/// What a client sends up to the channel. The mirror of [`ChannelMessage`]:
/// envelopes to relay, plus the client's own presence announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientFrame {
    /// Broadcast this envelope to the board's other subscribers.
    Event { envelope: Envelope },
    /// Announce or refresh this client's presence entry.
    Track { record: PresenceRecord },
}

/// Encode an envelope as JSON text for the channel.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] if serialization fails (only possible
/// with non-string map keys, which this schema never produces).
pub fn encode(envelope: &Envelope) -> Result<String, CodecError> {
    Ok(serde_json::to_string(envelope)?)
}

/// Decode JSON text into an envelope, rejecting unknown protocol versions.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] for unparseable text and
/// [`CodecError::UnsupportedVersion`] for a version mismatch.
pub fn decode(text: &str) -> Result<Envelope, CodecError> {
    let envelope: Envelope = serde_json::from_str(text)?;
    if envelope.version != PROTOCOL_VERSION {
        return Err(CodecError::UnsupportedVersion(envelope.version));
    }
    Ok(envelope)
}

/// Current time as milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}
