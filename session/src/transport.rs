//! The broadcast channel boundary.
//!
//! The session is agnostic to the transport behind this trait — an
//! in-process hub ([`crate::hub::LocalHub`]) or a WebSocket relay — as long
//! as delivery is at-most-once and FIFO per sender. Inbound traffic arrives
//! as [`ChannelSignal`] values on an mpsc receiver handed out at subscribe
//! time; outbound traffic goes through [`Transport`].

use wire::{ChannelMessage, Envelope, PresenceRecord};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The channel is currently down. The session queues document mutations
    /// until resubscription instead of losing them silently.
    #[error("channel disconnected")]
    Disconnected,
    /// A peer's delivery queue was full; the frame was dropped for them.
    #[error("channel backlog full")]
    Backlog,
}

/// What the channel delivers to a subscribed session.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelSignal {
    /// A broadcast envelope or presence sync from the channel.
    Message(ChannelMessage),
    /// The transport dropped. Outbound mutations are queued from here on.
    Disconnected,
    /// The transport came back. Presence is re-tracked and the queue flushed.
    Resubscribed,
}

/// Outbound half of a board channel subscription.
pub trait Transport: Send {
    /// Broadcast an envelope to every other subscriber on the board.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Disconnected`] if the channel is down.
    fn send(&self, envelope: Envelope) -> Result<(), TransportError>;

    /// Publish this participant's presence. The channel responds with an
    /// authoritative [`ChannelMessage::PresenceSync`] to all subscribers.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Disconnected`] if the channel is down.
    fn track(&self, record: PresenceRecord) -> Result<(), TransportError>;

    /// Leave the channel. Synchronous and idempotent; the channel emits a
    /// presence sync to the remaining subscribers.
    fn unsubscribe(&self);
}
