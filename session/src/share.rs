//! Screen-share signaling.
//!
//! DESIGN
//! ======
//! At most one participant shares at a time; everyone else is a viewer. The
//! sharer fans out one point-to-point link per viewer (offer per viewer, one
//! answer back), so the machine is a star, not a mesh. Viewers hold exactly
//! one responder link toward the sharer.
//!
//! The machine is synchronous: every handler takes an inbound event or a
//! local command and returns the events to broadcast plus effects for the
//! host. Media and RTC live behind [`MediaTrack`] and [`PeerLink`].
//!
//! Stop paths all converge on the same teardown: an explicit local stop, the
//! capture track ending natively (observed on tick), or the remote sharer's
//! `share-stopped` arriving.

#[cfg(test)]
#[path = "share_test.rs"]
mod share_test;

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::config::IceServerConfig;
use crate::effect::{Effect, Emitted};
use crate::media::{MediaError, MediaSource, MediaTrack};
use crate::peer::{PeerConnector, PeerLink, PeerRole};
use wire::{CandidatePayload, Event, ParticipantId, SignalPayload};

enum ShareState {
    Idle,
    Sharing {
        track: Box<dyn MediaTrack>,
        viewers: HashMap<ParticipantId, Box<dyn PeerLink>>,
    },
    Viewing {
        from: ParticipantId,
        link: Option<Box<dyn PeerLink>>,
    },
}

/// Screen-share state for one participant in one board session.
pub struct ShareMachine {
    me: ParticipantId,
    ice_servers: Vec<IceServerConfig>,
    state: ShareState,
}

impl ShareMachine {
    #[must_use]
    pub fn new(me: ParticipantId, ice_servers: Vec<IceServerConfig>) -> Self {
        Self { me, ice_servers, state: ShareState::Idle }
    }

    #[must_use]
    pub fn is_sharing(&self) -> bool {
        matches!(self.state, ShareState::Sharing { .. })
    }

    /// The participant currently sharing toward us, if any.
    #[must_use]
    pub fn viewing_from(&self) -> Option<ParticipantId> {
        match &self.state {
            ShareState::Viewing { from, .. } => Some(*from),
            _ => None,
        }
    }

    /// Begin sharing this participant's screen to every current peer.
    ///
    /// A declined capture prompt abandons the operation without announcing
    /// anything on the channel.
    pub fn start(
        &mut self,
        media: &mut dyn MediaSource,
        connector: &mut dyn PeerConnector,
        peers: &[ParticipantId],
    ) -> Emitted {
        let mut out = Emitted::none();
        if !matches!(self.state, ShareState::Idle) {
            debug!("share: start ignored, not idle");
            return out;
        }

        let track = match media.capture_display() {
            Ok(track) => track,
            Err(MediaError::AccessDenied) => {
                info!("share: capture prompt declined");
                return out;
            }
            Err(err) => {
                warn!(%err, "share: display capture failed");
                out.push_effect(Effect::Notice(format!("screen share failed: {err}")));
                return out;
            }
        };

        out.push_event(Event::ShareStarted);
        let mut viewers = HashMap::new();
        for &peer in peers.iter().filter(|&&p| p != self.me) {
            match Self::offer_to(connector, &self.ice_servers, peer, &mut out) {
                Ok(link) => {
                    viewers.insert(peer, link);
                }
                Err(err) => warn!(%peer, %err, "share: offer failed, skipping viewer"),
            }
        }
        info!(viewers = viewers.len(), "share: started");
        self.state = ShareState::Sharing { track, viewers };
        out
    }

    /// Stop sharing. No-op unless currently sharing.
    pub fn stop(&mut self) -> Emitted {
        let mut out = Emitted::none();
        if let ShareState::Sharing { mut track, mut viewers } =
            std::mem::replace(&mut self.state, ShareState::Idle)
        {
            track.stop();
            for link in viewers.values_mut() {
                link.close();
            }
            out.push_event(Event::ShareStopped);
            info!("share: stopped");
        }
        out
    }

    /// A peer joined the board while we are sharing: extend the star.
    pub fn peer_joined(
        &mut self,
        connector: &mut dyn PeerConnector,
        peer: ParticipantId,
    ) -> Emitted {
        let mut out = Emitted::none();
        if peer == self.me {
            return out;
        }
        let ShareState::Sharing { viewers, .. } = &mut self.state else {
            return out;
        };
        if viewers.contains_key(&peer) {
            return out;
        }
        match Self::offer_to(connector, &self.ice_servers, peer, &mut out) {
            Ok(link) => {
                viewers.insert(peer, link);
                debug!(%peer, "share: offered to late joiner");
            }
            Err(err) => warn!(%peer, %err, "share: offer to late joiner failed"),
        }
        out
    }

    /// A peer left the board (presence removal).
    pub fn peer_left(&mut self, peer: ParticipantId) -> Emitted {
        let mut out = Emitted::none();
        match &mut self.state {
            ShareState::Sharing { viewers, .. } => {
                if let Some(mut link) = viewers.remove(&peer) {
                    link.close();
                }
            }
            ShareState::Viewing { from, .. } if *from == peer => {
                out.merge(self.end_viewing("sharer left"));
            }
            _ => {}
        }
        out
    }

    /// Apply an inbound share event from `from`. Targeted payloads have
    /// already been filtered to this participant by the session.
    pub fn handle(
        &mut self,
        connector: &mut dyn PeerConnector,
        from: ParticipantId,
        event: &Event,
    ) -> Emitted {
        match event {
            Event::ShareStarted => self.on_started(from),
            Event::ShareStopped => self.on_stopped(from),
            Event::ShareOffer(payload) => self.on_offer(connector, from, payload),
            Event::ShareAnswer(payload) => self.on_answer(from, payload),
            Event::ShareCandidate(payload) => self.on_candidate(from, payload),
            _ => Emitted::none(),
        }
    }

    /// Periodic maintenance: notice a capture track that ended outside our
    /// control (the native "stop sharing" button) and tear down.
    pub fn tick(&mut self) -> Emitted {
        let ended = matches!(&self.state, ShareState::Sharing { track, .. } if track.ended());
        if ended {
            let mut out = self.stop();
            out.push_effect(Effect::Notice("screen share ended".into()));
            out
        } else {
            Emitted::none()
        }
    }

    /// Release all media and connections without announcing anything.
    pub fn dispose(&mut self) {
        match std::mem::replace(&mut self.state, ShareState::Idle) {
            ShareState::Sharing { mut track, mut viewers } => {
                track.stop();
                for link in viewers.values_mut() {
                    link.close();
                }
            }
            ShareState::Viewing { link: Some(mut link), .. } => link.close(),
            _ => {}
        }
    }

    // ===== INBOUND =====

    fn on_started(&mut self, from: ParticipantId) -> Emitted {
        let mut out = Emitted::none();
        match &self.state {
            ShareState::Idle => {
                // The offer follows; remember who to expect it from.
                self.state = ShareState::Viewing { from, link: None };
                debug!(%from, "share: peer started sharing");
            }
            ShareState::Sharing { .. } => {
                // Two simultaneous sharers; lower id yields. Deterministic on
                // both sides, so exactly one share survives.
                if self.me < from {
                    info!(%from, "share: yielding to concurrent sharer");
                    out.merge(self.stop());
                    self.state = ShareState::Viewing { from, link: None };
                }
            }
            ShareState::Viewing { link, .. } => {
                // A new sharer took over (or the current one restarted).
                // An open link must be closed, never silently dropped.
                if link.is_some() {
                    out.merge(self.end_viewing("screen share ended"));
                }
                self.state = ShareState::Viewing { from, link: None };
            }
        }
        out
    }

    fn on_stopped(&mut self, from: ParticipantId) -> Emitted {
        match &self.state {
            ShareState::Viewing { from: sharer, .. } if *sharer == from => {
                self.end_viewing("screen share ended")
            }
            _ => Emitted::none(),
        }
    }

    fn on_offer(
        &mut self,
        connector: &mut dyn PeerConnector,
        from: ParticipantId,
        payload: &SignalPayload,
    ) -> Emitted {
        let mut out = Emitted::none();
        if matches!(self.state, ShareState::Sharing { .. }) {
            debug!(%from, "share: offer ignored while sharing");
            return out;
        }
        // Accept the offer whether or not share-started has been seen; the
        // channel is FIFO per sender but a late subscriber may miss it. Any
        // previous link (renegotiation, sharer switch) is closed first.
        if let ShareState::Viewing { link, .. } = &mut self.state {
            if let Some(mut old) = link.take() {
                old.close();
            }
        }
        self.state = ShareState::Viewing { from, link: None };

        let mut link = match connector.connect(PeerRole::Responder, &self.ice_servers) {
            Ok(link) => link,
            Err(err) => {
                warn!(%from, %err, "share: responder connect failed");
                return out;
            }
        };
        match link.accept_offer(&payload.sdp) {
            Ok(answer) => {
                out.push_event(Event::ShareAnswer(SignalPayload { to: from, sdp: answer }));
                for candidate in link.local_candidates() {
                    out.push_event(Event::ShareCandidate(CandidatePayload { to: from, ..candidate }));
                }
                out.push_effect(Effect::RemoteVideo { from: Some(from) });
                self.state = ShareState::Viewing { from, link: Some(link) };
            }
            Err(err) => warn!(%from, %err, "share: offer rejected"),
        }
        out
    }

    fn on_answer(&mut self, from: ParticipantId, payload: &SignalPayload) -> Emitted {
        let ShareState::Sharing { viewers, .. } = &mut self.state else {
            // An answer for a share we already stopped. Harmless.
            debug!(%from, "share: orphan answer dropped");
            return Emitted::none();
        };
        match viewers.get_mut(&from) {
            Some(link) => {
                if let Err(err) = link.accept_answer(&payload.sdp) {
                    warn!(%from, %err, "share: answer rejected");
                }
            }
            None => debug!(%from, "share: answer from unknown viewer dropped"),
        }
        Emitted::none()
    }

    fn on_candidate(&mut self, from: ParticipantId, payload: &CandidatePayload) -> Emitted {
        let link = match &mut self.state {
            ShareState::Sharing { viewers, .. } => viewers.get_mut(&from),
            ShareState::Viewing { from: sharer, link } if *sharer == from => link.as_mut(),
            _ => None,
        };
        match link {
            Some(link) => {
                if let Err(err) = link.add_candidate(payload) {
                    warn!(%from, %err, "share: candidate rejected");
                }
            }
            // Candidates race teardown routinely; swallow them.
            None => debug!(%from, "share: candidate without link dropped"),
        }
        Emitted::none()
    }

    // ===== HELPERS =====

    fn offer_to(
        connector: &mut dyn PeerConnector,
        ice_servers: &[IceServerConfig],
        peer: ParticipantId,
        out: &mut Emitted,
    ) -> Result<Box<dyn PeerLink>, crate::peer::PeerError> {
        let mut link = connector.connect(PeerRole::Initiator, ice_servers)?;
        let sdp = link.create_offer()?;
        out.push_event(Event::ShareOffer(SignalPayload { to: peer, sdp }));
        for candidate in link.local_candidates() {
            out.push_event(Event::ShareCandidate(CandidatePayload { to: peer, ..candidate }));
        }
        Ok(link)
    }

    fn end_viewing(&mut self, notice: &str) -> Emitted {
        let mut out = Emitted::none();
        if let ShareState::Viewing { link, .. } = &mut self.state {
            if let Some(link) = link.as_mut() {
                link.close();
            }
            self.state = ShareState::Idle;
            out.push_effect(Effect::RemoteVideo { from: None });
            out.push_effect(Effect::Notice(notice.into()));
        }
        out
    }
}
