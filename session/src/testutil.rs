//! Shared mocks for session tests: an in-memory RTC stack, scripted media
//! capture, and helpers that wire sessions onto a [`LocalHub`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::{IceServerConfig, SessionConfig};
use crate::effect::Effect;
use crate::hub::LocalHub;
use crate::media::{MediaError, MediaSource, MediaTrack};
use crate::peer::{PeerConnector, PeerError, PeerLink, PeerRole};
use crate::session::BoardSession;
use crate::transport::ChannelSignal;
use wire::{CandidatePayload, Participant, ParticipantId};

// ===== PEER MOCKS =====

/// Observable state of one mock link, shared with the test.
#[derive(Default)]
pub struct LinkProbe {
    pub closed: AtomicBool,
    pub answer_applied: AtomicBool,
    pub candidates_added: AtomicUsize,
}

pub struct LinkRecord {
    pub role: PeerRole,
    pub probe: Arc<LinkProbe>,
}

/// Everything a mock connector did, shared with the test.
#[derive(Default)]
pub struct ConnectorLog {
    pub links: Mutex<Vec<LinkRecord>>,
}

impl ConnectorLog {
    pub fn link_count(&self, role: PeerRole) -> usize {
        self.links.lock().unwrap().iter().filter(|l| l.role == role).count()
    }

    pub fn probe(&self, index: usize) -> Arc<LinkProbe> {
        Arc::clone(&self.links.lock().unwrap()[index].probe)
    }
}

struct MockLink {
    role: PeerRole,
    probe: Arc<LinkProbe>,
    offered: bool,
    candidates_pending: bool,
}

impl PeerLink for MockLink {
    fn create_offer(&mut self) -> Result<String, PeerError> {
        if self.role != PeerRole::Initiator {
            return Err(PeerError::BadState("responder cannot offer".into()));
        }
        self.offered = true;
        Ok("v=0 mock-offer".into())
    }

    fn accept_offer(&mut self, sdp: &str) -> Result<String, PeerError> {
        if self.role != PeerRole::Responder {
            return Err(PeerError::BadState("initiator cannot answer".into()));
        }
        Ok(format!("v=0 mock-answer to [{sdp}]"))
    }

    fn accept_answer(&mut self, _sdp: &str) -> Result<(), PeerError> {
        if !self.offered {
            return Err(PeerError::BadState("no offer outstanding".into()));
        }
        self.probe.answer_applied.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn add_candidate(&mut self, _candidate: &CandidatePayload) -> Result<(), PeerError> {
        if self.probe.closed.load(Ordering::SeqCst) {
            return Err(PeerError::ConnectionFailed("link closed".into()));
        }
        self.probe.candidates_added.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn local_candidates(&mut self) -> Vec<CandidatePayload> {
        if self.candidates_pending {
            self.candidates_pending = false;
            vec![CandidatePayload {
                to: Uuid::nil(),
                candidate: "candidate:1 1 udp 2122260223 192.0.2.1 54321 typ host".into(),
                sdp_mid: Some("0".into()),
                sdp_m_line_index: Some(0),
            }]
        } else {
            Vec::new()
        }
    }

    fn close(&mut self) {
        self.probe.closed.store(true, Ordering::SeqCst);
    }
}

/// Connector whose links negotiate instantly and record what happened.
pub struct MockConnector {
    pub log: Arc<ConnectorLog>,
    pub fail_connect: bool,
}

impl MockConnector {
    pub fn new() -> (Self, Arc<ConnectorLog>) {
        let log = Arc::new(ConnectorLog::default());
        (Self { log: Arc::clone(&log), fail_connect: false }, log)
    }
}

impl PeerConnector for MockConnector {
    fn connect(
        &mut self,
        role: PeerRole,
        _ice_servers: &[IceServerConfig],
    ) -> Result<Box<dyn PeerLink>, PeerError> {
        if self.fail_connect {
            return Err(PeerError::ConnectionFailed("scripted failure".into()));
        }
        let probe = Arc::new(LinkProbe::default());
        self.log.links.lock().unwrap().push(LinkRecord { role, probe: Arc::clone(&probe) });
        Ok(Box::new(MockLink { role, probe, offered: false, candidates_pending: true }))
    }
}

// ===== MEDIA MOCKS =====

/// Observable state of one mock capture track.
pub struct TrackProbe {
    pub enabled: AtomicBool,
    pub ended: AtomicBool,
    pub stopped: AtomicBool,
}

impl Default for TrackProbe {
    fn default() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            ended: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }
}

struct MockTrack {
    probe: Arc<TrackProbe>,
}

impl MediaTrack for MockTrack {
    fn enabled(&self) -> bool {
        self.probe.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.probe.enabled.store(enabled, Ordering::SeqCst);
    }

    fn ended(&self) -> bool {
        self.probe.ended.load(Ordering::SeqCst)
    }

    fn stop(&mut self) {
        self.probe.stopped.store(true, Ordering::SeqCst);
    }
}

/// Tracks handed out by a mock media source, shared with the test.
#[derive(Default)]
pub struct MediaLog {
    pub display_tracks: Mutex<Vec<Arc<TrackProbe>>>,
    pub mic_tracks: Mutex<Vec<Arc<TrackProbe>>>,
    pub deny_display: AtomicBool,
    pub deny_mic: AtomicBool,
}

impl MediaLog {
    pub fn display(&self, index: usize) -> Arc<TrackProbe> {
        Arc::clone(&self.display_tracks.lock().unwrap()[index])
    }

    pub fn mic(&self, index: usize) -> Arc<TrackProbe> {
        Arc::clone(&self.mic_tracks.lock().unwrap()[index])
    }
}

pub struct MockMedia {
    pub log: Arc<MediaLog>,
}

impl MockMedia {
    pub fn new() -> (Self, Arc<MediaLog>) {
        let log = Arc::new(MediaLog::default());
        (Self { log: Arc::clone(&log) }, log)
    }
}

impl MediaSource for MockMedia {
    fn capture_display(&mut self) -> Result<Box<dyn MediaTrack>, MediaError> {
        if self.log.deny_display.load(Ordering::SeqCst) {
            return Err(MediaError::AccessDenied);
        }
        let probe = Arc::new(TrackProbe::default());
        self.log.display_tracks.lock().unwrap().push(Arc::clone(&probe));
        Ok(Box::new(MockTrack { probe }))
    }

    fn capture_microphone(&mut self) -> Result<Box<dyn MediaTrack>, MediaError> {
        if self.log.deny_mic.load(Ordering::SeqCst) {
            return Err(MediaError::AccessDenied);
        }
        let probe = Arc::new(TrackProbe::default());
        self.log.mic_tracks.lock().unwrap().push(Arc::clone(&probe));
        Ok(Box::new(MockTrack { probe }))
    }
}

// ===== SESSION WIRING =====

/// One participant's full stack wired onto a hub, with its probes.
pub struct Party {
    pub id: ParticipantId,
    pub session: BoardSession,
    pub rx: mpsc::Receiver<ChannelSignal>,
    pub connector: Arc<ConnectorLog>,
    pub media: Arc<MediaLog>,
}

/// Subscribe a fresh participant to `board` on `hub` and announce presence.
pub fn join(hub: &LocalHub, board: Uuid, name: &str) -> Party {
    join_with(hub, board, name, SessionConfig::default())
}

/// Like [`join`], with explicit tunables.
pub fn join_with(hub: &LocalHub, board: Uuid, name: &str, config: SessionConfig) -> Party {
    let id = Uuid::new_v4();
    let me = Participant { id, display_name: name.into(), avatar_url: None };
    let (channel, rx) = hub.subscribe(board, id, config.channel_capacity);
    let (connector, connector_log) = MockConnector::new();
    let (media, media_log) = MockMedia::new();
    let mut session = BoardSession::new(
        board,
        me,
        Box::new(channel),
        Box::new(connector),
        Box::new(media),
        config,
    );
    session.init();
    Party { id, session, rx, connector: connector_log, media: media_log }
}

/// Drain every pending inbound signal into the session, collecting effects.
pub fn pump(party: &mut Party) -> Vec<Effect> {
    let mut effects = Vec::new();
    while let Ok(signal) = party.rx.try_recv() {
        effects.extend(party.session.handle_signal(signal, Instant::now()));
    }
    effects
}

/// Pump every party repeatedly until no traffic remains anywhere. Needed
/// because handling one signal can broadcast follow-ups (offers, answers).
pub fn settle(parties: &mut [&mut Party]) -> Vec<Vec<Effect>> {
    let mut all: Vec<Vec<Effect>> = parties.iter().map(|_| Vec::new()).collect();
    loop {
        for (i, party) in parties.iter_mut().enumerate() {
            all[i].extend(pump(party));
        }
        if parties.iter().all(|p| p.rx.is_empty()) {
            break;
        }
    }
    all
}
