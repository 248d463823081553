//! Voice-call signaling.
//!
//! DESIGN
//! ======
//! The call is a full mesh: every pair of call members holds one
//! point-to-point link. Glare (both sides offering at once) is avoided by a
//! single rule: the *existing* member initiates toward the newcomer. A
//! `voice-join` broadcast therefore triggers one offer from each current
//! member, and the joiner only ever answers. Two participants joining
//! simultaneously each see the other as existing and both initiate; that
//! residual glare resolves deterministically — the lower id closes its own
//! offer and answers the higher id's.
//!
//! Leaving is explicit: `voice-leave` tears the sender's links down on every
//! peer immediately, rather than waiting for connection-state callbacks to
//! notice the silence.
//!
//! A negotiation that never completes (offer or answer lost, peer wedged) is
//! garbage-collected on tick after [`crate::config::SessionConfig`]'s
//! negotiation timeout.

#[cfg(test)]
#[path = "voice_test.rs"]
mod voice_test;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::IceServerConfig;
use crate::effect::{Effect, Emitted};
use crate::media::{MediaError, MediaSource, MediaTrack};
use crate::peer::{PeerConnector, PeerLink, PeerRole};
use wire::{CandidatePayload, Event, ParticipantId, SignalPayload};

enum PeerPhase {
    Negotiating { since: Instant },
    Connected,
}

struct VoicePeer {
    link: Box<dyn PeerLink>,
    phase: PeerPhase,
}

/// Voice-mesh state for one participant in one board session.
pub struct VoiceMesh {
    me: ParticipantId,
    ice_servers: Vec<IceServerConfig>,
    negotiation_timeout: Duration,
    mic: Option<Box<dyn MediaTrack>>,
    peers: HashMap<ParticipantId, VoicePeer>,
}

impl VoiceMesh {
    #[must_use]
    pub fn new(
        me: ParticipantId,
        ice_servers: Vec<IceServerConfig>,
        negotiation_timeout: Duration,
    ) -> Self {
        Self { me, ice_servers, negotiation_timeout, mic: None, peers: HashMap::new() }
    }

    #[must_use]
    pub fn in_call(&self) -> bool {
        self.mic.is_some()
    }

    #[must_use]
    pub fn mic_enabled(&self) -> bool {
        self.mic.as_ref().is_some_and(|m| m.enabled())
    }

    /// Peers with an established link.
    #[must_use]
    pub fn connected_peers(&self) -> Vec<ParticipantId> {
        let mut ids: Vec<ParticipantId> = self
            .peers
            .iter()
            .filter(|(_, p)| matches!(p.phase, PeerPhase::Connected))
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Join the board's voice call. Announces `voice-join` and waits for
    /// offers from the members already in the call.
    pub fn join(&mut self, media: &mut dyn MediaSource) -> Emitted {
        let mut out = Emitted::none();
        if self.in_call() {
            debug!("voice: join ignored, already in call");
            return out;
        }
        match media.capture_microphone() {
            Ok(mic) => {
                self.mic = Some(mic);
                out.push_event(Event::VoiceJoin);
                info!("voice: joined call");
            }
            Err(MediaError::AccessDenied) => info!("voice: mic prompt declined"),
            Err(err) => {
                warn!(%err, "voice: mic capture failed");
                out.push_effect(Effect::Notice(format!("voice join failed: {err}")));
            }
        }
        out
    }

    /// Leave the call, announcing `voice-leave` so peers tear down now.
    pub fn leave(&mut self) -> Emitted {
        let mut out = Emitted::none();
        let Some(mut mic) = self.mic.take() else {
            return out;
        };
        mic.stop();
        for (peer, mut entry) in self.peers.drain() {
            entry.link.close();
            if matches!(entry.phase, PeerPhase::Connected) {
                out.push_effect(Effect::RemoteAudio { from: peer, attached: false });
            }
        }
        out.push_event(Event::VoiceLeave);
        info!("voice: left call");
        out
    }

    /// Mute or unmute the microphone without leaving the call.
    pub fn toggle_mic(&mut self) {
        if let Some(mic) = self.mic.as_mut() {
            let enabled = mic.enabled();
            mic.set_enabled(!enabled);
            debug!(enabled = !enabled, "voice: mic toggled");
        }
    }

    /// Apply an inbound voice event from `from`. Targeted payloads have
    /// already been filtered to this participant by the session.
    pub fn handle(
        &mut self,
        connector: &mut dyn PeerConnector,
        from: ParticipantId,
        event: &Event,
        now: Instant,
    ) -> Emitted {
        if !self.in_call() {
            return Emitted::none();
        }
        match event {
            Event::VoiceJoin => self.on_join(connector, from, now),
            Event::VoiceLeave => self.on_leave(from),
            Event::VoiceOffer(payload) => self.on_offer(connector, from, payload),
            Event::VoiceAnswer(payload) => self.on_answer(from, payload),
            Event::VoiceCandidate(payload) => self.on_candidate(from, payload),
            _ => Emitted::none(),
        }
    }

    /// A peer disappeared from presence without an explicit leave.
    pub fn peer_left(&mut self, peer: ParticipantId) -> Emitted {
        self.on_leave(peer)
    }

    /// Periodic maintenance: collect negotiations that never completed, and
    /// leave the call if the microphone ended outside our control.
    pub fn tick(&mut self, now: Instant) -> Emitted {
        let mut out = Emitted::none();
        if self.mic.as_ref().is_some_and(|m| m.ended()) {
            out.merge(self.leave());
            out.push_effect(Effect::Notice("microphone ended, left voice call".into()));
            return out;
        }

        let timeout = self.negotiation_timeout;
        let stale: Vec<ParticipantId> = self
            .peers
            .iter()
            .filter(|(_, p)| {
                matches!(p.phase, PeerPhase::Negotiating { since } if now.duration_since(since) >= timeout)
            })
            .map(|(id, _)| *id)
            .collect();
        for peer in stale {
            if let Some(mut entry) = self.peers.remove(&peer) {
                entry.link.close();
            }
            warn!(%peer, "voice: negotiation timed out");
            out.push_effect(Effect::Notice("voice connection timed out".into()));
        }
        out
    }

    /// Release all media and connections without announcing anything.
    pub fn dispose(&mut self) {
        if let Some(mut mic) = self.mic.take() {
            mic.stop();
        }
        for (_, mut entry) in self.peers.drain() {
            entry.link.close();
        }
    }

    // ===== INBOUND =====

    fn on_join(
        &mut self,
        connector: &mut dyn PeerConnector,
        from: ParticipantId,
        now: Instant,
    ) -> Emitted {
        let mut out = Emitted::none();
        if from == self.me || self.peers.contains_key(&from) {
            return out;
        }
        // Existing member initiates toward the newcomer.
        let mut link = match connector.connect(PeerRole::Initiator, &self.ice_servers) {
            Ok(link) => link,
            Err(err) => {
                warn!(%from, %err, "voice: initiator connect failed");
                return out;
            }
        };
        match link.create_offer() {
            Ok(sdp) => {
                out.push_event(Event::VoiceOffer(SignalPayload { to: from, sdp }));
                for candidate in link.local_candidates() {
                    out.push_event(Event::VoiceCandidate(CandidatePayload { to: from, ..candidate }));
                }
                self.peers
                    .insert(from, VoicePeer { link, phase: PeerPhase::Negotiating { since: now } });
                debug!(%from, "voice: offered to joiner");
            }
            Err(err) => warn!(%from, %err, "voice: offer failed"),
        }
        out
    }

    fn on_leave(&mut self, from: ParticipantId) -> Emitted {
        let mut out = Emitted::none();
        if let Some(mut entry) = self.peers.remove(&from) {
            entry.link.close();
            if matches!(entry.phase, PeerPhase::Connected) {
                out.push_effect(Effect::RemoteAudio { from, attached: false });
            }
            debug!(%from, "voice: peer left");
        }
        out
    }

    fn on_offer(
        &mut self,
        connector: &mut dyn PeerConnector,
        from: ParticipantId,
        payload: &SignalPayload,
    ) -> Emitted {
        let mut out = Emitted::none();
        match self.peers.get(&from) {
            Some(entry) if matches!(entry.phase, PeerPhase::Connected) => {
                debug!(%from, "voice: duplicate offer dropped");
                return out;
            }
            Some(_) if self.me > from => {
                // Offer glare: both sides joined at once and both initiated.
                // The higher id keeps its offer; the peer answers ours.
                debug!(%from, "voice: glare, keeping our offer");
                return out;
            }
            Some(_) => {
                // Yielding side of the glare: close our initiator link and
                // answer theirs instead.
                if let Some(mut entry) = self.peers.remove(&from) {
                    entry.link.close();
                }
                debug!(%from, "voice: glare, yielding to the peer's offer");
            }
            None => {}
        }
        let mut link = match connector.connect(PeerRole::Responder, &self.ice_servers) {
            Ok(link) => link,
            Err(err) => {
                warn!(%from, %err, "voice: responder connect failed");
                return out;
            }
        };
        match link.accept_offer(&payload.sdp) {
            Ok(answer) => {
                out.push_event(Event::VoiceAnswer(SignalPayload { to: from, sdp: answer }));
                for candidate in link.local_candidates() {
                    out.push_event(Event::VoiceCandidate(CandidatePayload { to: from, ..candidate }));
                }
                // The responder's link is live once its answer is out.
                self.peers.insert(from, VoicePeer { link, phase: PeerPhase::Connected });
                out.push_effect(Effect::RemoteAudio { from, attached: true });
                debug!(%from, "voice: answered offer");
            }
            Err(err) => warn!(%from, %err, "voice: offer rejected"),
        }
        out
    }

    fn on_answer(&mut self, from: ParticipantId, payload: &SignalPayload) -> Emitted {
        let mut out = Emitted::none();
        match self.peers.get_mut(&from) {
            Some(entry) => match entry.link.accept_answer(&payload.sdp) {
                Ok(()) => {
                    entry.phase = PeerPhase::Connected;
                    out.push_effect(Effect::RemoteAudio { from, attached: true });
                    debug!(%from, "voice: peer connected");
                }
                Err(err) => warn!(%from, %err, "voice: answer rejected"),
            },
            None => debug!(%from, "voice: orphan answer dropped"),
        }
        out
    }

    fn on_candidate(&mut self, from: ParticipantId, payload: &CandidatePayload) -> Emitted {
        match self.peers.get_mut(&from) {
            Some(entry) => {
                if let Err(err) = entry.link.add_candidate(payload) {
                    warn!(%from, %err, "voice: candidate rejected");
                }
            }
            // Candidates race join/leave routinely; swallow them.
            None => debug!(%from, "voice: candidate without link dropped"),
        }
        Emitted::none()
    }
}
