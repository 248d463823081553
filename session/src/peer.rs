//! Peer-connection boundary.
//!
//! Signaling lives in this crate; the actual RTC stack lives behind
//! [`PeerConnector`]. The state machines drive links through the trait and
//! never see an SDP's contents, so tests substitute a mock connector and the
//! production build plugs in whatever engine the platform provides.

use crate::config::IceServerConfig;
use wire::CandidatePayload;

#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// The underlying connection failed or was closed mid-negotiation.
    #[error("peer connection failed: {0}")]
    ConnectionFailed(String),
    /// A description or candidate could not be applied in the current state.
    #[error("bad signaling state: {0}")]
    BadState(String),
}

/// Which side of the offer/answer exchange this link plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerRole {
    /// Creates the offer.
    Initiator,
    /// Receives the offer and answers.
    Responder,
}

/// One point-to-point connection under negotiation or established.
pub trait PeerLink: Send {
    /// Produce the local offer SDP. Valid only for [`PeerRole::Initiator`].
    ///
    /// # Errors
    ///
    /// Returns [`PeerError::BadState`] when called on a responder.
    fn create_offer(&mut self) -> Result<String, PeerError>;

    /// Apply a remote offer and produce the answer SDP. Valid only for
    /// [`PeerRole::Responder`].
    ///
    /// # Errors
    ///
    /// Returns [`PeerError::BadState`] when called on an initiator.
    fn accept_offer(&mut self, sdp: &str) -> Result<String, PeerError>;

    /// Apply the remote answer to a previously created offer.
    ///
    /// # Errors
    ///
    /// Returns [`PeerError::BadState`] if no offer is outstanding.
    fn accept_answer(&mut self, sdp: &str) -> Result<(), PeerError>;

    /// Apply a remote ICE candidate. Candidates arriving before the remote
    /// description must be buffered by the implementation, not rejected.
    ///
    /// # Errors
    ///
    /// Returns [`PeerError::ConnectionFailed`] if the link is closed.
    fn add_candidate(&mut self, candidate: &CandidatePayload) -> Result<(), PeerError>;

    /// Drain locally gathered ICE candidates to signal to the remote side.
    fn local_candidates(&mut self) -> Vec<CandidatePayload>;

    /// Tear the connection down. Idempotent.
    fn close(&mut self);
}

/// Factory for peer links.
pub trait PeerConnector: Send {
    /// Open a new link in the given role, configured with the session's ICE
    /// servers.
    ///
    /// # Errors
    ///
    /// Returns [`PeerError::ConnectionFailed`] if the RTC stack cannot
    /// allocate a connection.
    fn connect(
        &mut self,
        role: PeerRole,
        ice_servers: &[IceServerConfig],
    ) -> Result<Box<dyn PeerLink>, PeerError>;
}
