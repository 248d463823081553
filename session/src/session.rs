//! The board session reducer.
//!
//! DESIGN
//! ======
//! One `BoardSession` per joined board, owned by the board controller:
//! created on entry, disposed on exit, never a process-wide singleton. All
//! state behind it — element store, history, raster, live strokes, the share
//! and voice machines — is mutated by exactly one driver task, so the whole
//! session is single-threaded and lock-free.
//!
//! Data flows one way. Local input and inbound channel signals both go
//! through a handler that mutates state, broadcasts whatever must replicate,
//! and returns [`Effect`]s for the host. Handlers run to completion; nothing
//! re-enters the session mid-dispatch.
//!
//! OUTAGE BEHAVIOR
//! ===============
//! While the transport reports disconnected, document mutations queue (FIFO,
//! bounded, oldest dropped on overflow) and are flushed on resubscribe after
//! presence is re-tracked. Ephemeral traffic — draw segments, signaling — is
//! dropped instead: replaying a stale SDP or a mid-air stroke after a gap
//! does more harm than good.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;

use tracing::{debug, info, warn};
use uuid::Uuid;

use board::Point;
use board::element::{BoardElement, ElementId, ElementPatch, ShapeKind};
use board::history::{History, HistoryOutcome};
use board::raster::{ExportError, Raster, StrokeStyle};
use board::store::ElementStore;
use board::view::{BoundingRect, RawPointer, Viewport};
use wire::{ChannelMessage, Envelope, Event, Participant, ParticipantId, PresenceRecord};

use crate::config::SessionConfig;
use crate::effect::{Effect, Emitted};
use crate::media::MediaSource;
use crate::peer::PeerConnector;
use crate::share::ShareMachine;
use crate::transport::{ChannelSignal, Transport, TransportError};
use crate::voice::VoiceMesh;

/// A stroke currently in progress, local or remote. Only the last point is
/// needed to paint the next segment; full geometry for committed paths
/// arrives in the add-element event.
struct LiveStroke {
    last: Point,
    points: Vec<Point>,
    style: StrokeStyle,
}

/// One participant's replica of one board.
pub struct BoardSession {
    board_id: Uuid,
    me: Participant,
    joined_at: i64,
    config: SessionConfig,

    transport: Box<dyn Transport>,
    connector: Box<dyn PeerConnector>,
    media: Box<dyn MediaSource>,

    store: ElementStore,
    history: History,
    raster: Raster,
    viewport: Viewport,
    roster: Vec<PresenceRecord>,

    /// Local stroke in progress, if any.
    drawing: Option<(ElementId, LiveStroke)>,
    /// Remote strokes in progress, keyed by stroke id.
    remote_strokes: HashMap<ElementId, LiveStroke>,

    share: ShareMachine,
    voice: VoiceMesh,

    connected: bool,
    queue: VecDeque<Event>,
}

impl BoardSession {
    #[must_use]
    pub fn new(
        board_id: Uuid,
        me: Participant,
        transport: Box<dyn Transport>,
        connector: Box<dyn PeerConnector>,
        media: Box<dyn MediaSource>,
        config: SessionConfig,
    ) -> Self {
        let viewport = Viewport::new(BoundingRect { left: 0.0, top: 0.0, width: 800.0, height: 600.0 }, 1.0);
        let (w, h) = viewport.bitmap_size();
        let share = ShareMachine::new(me.id, config.ice_servers.clone());
        let voice = VoiceMesh::new(me.id, config.ice_servers.clone(), config.negotiation_timeout);
        Self {
            board_id,
            me,
            joined_at: wire::now_ms(),
            config,
            transport,
            connector,
            media,
            store: ElementStore::new(),
            history: History::new(),
            raster: Raster::new(w, h),
            viewport,
            roster: Vec::new(),
            drawing: None,
            remote_strokes: HashMap::new(),
            share,
            voice,
            connected: true,
            queue: VecDeque::new(),
        }
    }

    /// Announce presence on the channel. Call once after construction.
    pub fn init(&mut self) {
        self.joined_at = wire::now_ms();
        self.track_presence();
        info!(board_id = %self.board_id, participant = %self.me.id, "session: joined board");
    }

    /// Leave the board: stop media, close peer connections, unsubscribe.
    pub fn dispose(&mut self) {
        let leave = self.voice.leave();
        self.broadcast_all(leave.events);
        if self.share.is_sharing() {
            let stopped = self.share.stop();
            self.broadcast_all(stopped.events);
        }
        self.share.dispose();
        self.voice.dispose();
        self.transport.unsubscribe();
        info!(board_id = %self.board_id, "session: left board");
    }

    // ===== ACCESSORS =====

    #[must_use]
    pub fn board_id(&self) -> Uuid {
        self.board_id
    }

    #[must_use]
    pub fn participant(&self) -> &Participant {
        &self.me
    }

    #[must_use]
    pub fn store(&self) -> &ElementStore {
        &self.store
    }

    #[must_use]
    pub fn roster(&self) -> &[PresenceRecord] {
        &self.roster
    }

    #[must_use]
    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.history.undo_len()
    }

    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.history.redo_len()
    }

    #[must_use]
    pub fn is_sharing(&self) -> bool {
        self.share.is_sharing()
    }

    #[must_use]
    pub fn in_voice_call(&self) -> bool {
        self.voice.in_call()
    }

    #[must_use]
    pub fn voice_peers(&self) -> Vec<ParticipantId> {
        self.voice.connected_peers()
    }

    // ===== VIEWPORT =====

    /// Convert a raw pointer event to canvas coordinates.
    #[must_use]
    pub fn pointer_to_canvas(&self, raw: RawPointer) -> Point {
        self.viewport.pointer_to_canvas(raw)
    }

    /// Apply a layout change: resize the bitmap and redraw every committed
    /// path (the resize wipes the surface).
    pub fn set_viewport(&mut self, rect: BoundingRect, dpr: f64) -> Vec<Effect> {
        self.viewport.set_rect(rect);
        self.viewport.set_dpr(dpr);
        let (w, h) = self.viewport.bitmap_size();
        self.raster.resize(w, h);
        self.repaint();
        vec![Effect::RenderNeeded]
    }

    /// Set the local drawing tool's stroke style.
    pub fn set_stroke_style(&mut self, color_hex: &str, width: f64) {
        self.raster.set_style(StrokeStyle::from_hex(color_hex, width));
    }

    // ===== LOCAL DRAWING =====

    /// Begin a freehand stroke at `start`. Returns the stroke id, which will
    /// become the committed path's element id.
    pub fn begin_stroke(&mut self, start: Point) -> ElementId {
        if self.drawing.is_some() {
            // Pointer-up was lost; commit what we have before starting over.
            let _ = self.end_stroke();
        }
        let id = Uuid::new_v4();
        let style = self.raster.style();
        self.drawing = Some((id, LiveStroke { last: start, points: vec![start], style }));
        self.raster.paint_segment(start, start);
        self.publish_segment(id, start, style);
        id
    }

    /// Extend the stroke in progress. Paints the new segment locally and
    /// broadcasts it for live remote feedback. No-op when not drawing.
    pub fn stroke_to(&mut self, point: Point) -> Vec<Effect> {
        let Some((id, live)) = self.drawing.as_mut() else {
            return Vec::new();
        };
        let from = live.last;
        live.last = point;
        live.points.push(point);
        let (id, style) = (*id, live.style);
        self.raster.paint_segment_with(from, point, style);
        self.publish_segment(id, point, style);
        vec![Effect::RenderNeeded]
    }

    /// Commit the stroke in progress as a path element: store it, push it
    /// onto the undo stack, broadcast the add.
    pub fn end_stroke(&mut self) -> Vec<Effect> {
        let Some((id, live)) = self.drawing.take() else {
            return Vec::new();
        };
        let element = BoardElement::Path {
            id,
            points: live.points,
            color: board::color::to_hex(live.style.color),
            stroke_width: live.style.width,
            owner: self.me.id,
        };
        self.add_element(element)
    }

    // ===== LOCAL DOCUMENT OPERATIONS =====

    /// Place a shape on the overlay.
    pub fn create_shape(
        &mut self,
        kind: ShapeKind,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: &str,
    ) -> ElementId {
        let id = Uuid::new_v4();
        let element = BoardElement::Shape {
            id,
            kind,
            x,
            y,
            width,
            height,
            color: color.to_string(),
            owner: self.me.id,
        };
        self.add_element(element);
        id
    }

    /// Place a sticky note on the overlay.
    pub fn create_sticky_note(&mut self, x: f64, y: f64, color: &str, text: &str) -> ElementId {
        let id = Uuid::new_v4();
        let element = BoardElement::StickyNote {
            id,
            x,
            y,
            width: 160.0,
            height: 120.0,
            color: color.to_string(),
            text: text.to_string(),
            owner: self.me.id,
        };
        self.add_element(element);
        id
    }

    /// Place a text box on the overlay.
    pub fn create_text_box(&mut self, x: f64, y: f64, text: &str) -> ElementId {
        let id = Uuid::new_v4();
        let element = BoardElement::TextBox {
            id,
            x,
            y,
            width: 200.0,
            height: 40.0,
            text: text.to_string(),
            owner: self.me.id,
        };
        self.add_element(element);
        id
    }

    /// Add a fully-formed element: store, history, broadcast.
    pub fn add_element(&mut self, element: BoardElement) -> Vec<Effect> {
        let id = element.id();
        let is_path = element.is_path();
        if let Err(err) = self.store.add(element.clone()) {
            debug!(%err, "session: local add ignored");
            return Vec::new();
        }
        if is_path {
            self.repaint();
        }
        self.history.record_create(id);
        self.publish(Event::AddElement { element });
        vec![Effect::RenderNeeded]
    }

    /// Patch an element locally and broadcast the patch.
    pub fn update_element(&mut self, id: ElementId, patch: ElementPatch) -> Vec<Effect> {
        if self.store.update(&id, &patch).is_err() {
            debug!(%id, "session: local update on missing element ignored");
            return Vec::new();
        }
        let render = self.store.get(&id).is_some_and(BoardElement::is_path);
        if render {
            self.repaint();
        }
        self.publish(Event::UpdateElement { id, patch });
        if render { vec![Effect::RenderNeeded] } else { Vec::new() }
    }

    /// Delete an element locally and broadcast the deletion. Deletions never
    /// enter the undo stacks; only creations are undoable.
    pub fn delete_element(&mut self, id: ElementId) -> Vec<Effect> {
        let Some(element) = self.store.delete(&id) else {
            return Vec::new();
        };
        if element.is_path() {
            self.repaint();
        }
        self.publish(Event::DeleteElement { id });
        vec![Effect::RenderNeeded]
    }

    /// Undo this participant's most recent creation.
    pub fn undo(&mut self) -> Vec<Effect> {
        match self.history.undo(&mut self.store) {
            HistoryOutcome::Undone { id } => {
                self.repaint();
                self.publish(Event::Undo { id });
                vec![Effect::RenderNeeded]
            }
            _ => Vec::new(),
        }
    }

    /// Re-apply this participant's most recent undo.
    pub fn redo(&mut self) -> Vec<Effect> {
        match self.history.redo(&mut self.store) {
            HistoryOutcome::Redone { element } => {
                self.repaint();
                self.publish(Event::AddElement { element });
                vec![Effect::RenderNeeded]
            }
            _ => Vec::new(),
        }
    }

    /// Wipe the whole board everywhere.
    pub fn clear_board(&mut self) -> Vec<Effect> {
        self.apply_clear();
        self.publish(Event::ClearBoard);
        vec![Effect::RenderNeeded]
    }

    /// Serialize the raster surface (committed paths plus live strokes) as a
    /// PNG image.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] if PNG encoding fails.
    pub fn export_png(&self) -> Result<Vec<u8>, ExportError> {
        self.raster.encode_png()
    }

    // ===== LOCAL MEDIA OPERATIONS =====

    /// Begin sharing this participant's screen.
    pub fn start_share(&mut self) -> Vec<Effect> {
        let peers: Vec<ParticipantId> =
            self.roster.iter().map(|r| r.participant.id).filter(|id| *id != self.me.id).collect();
        let out = self.share.start(&mut *self.media, &mut *self.connector, &peers);
        self.emit(out)
    }

    /// Stop sharing this participant's screen.
    pub fn stop_share(&mut self) -> Vec<Effect> {
        let out = self.share.stop();
        self.emit(out)
    }

    /// Join the board's voice call.
    pub fn join_voice(&mut self) -> Vec<Effect> {
        let out = self.voice.join(&mut *self.media);
        self.emit(out)
    }

    /// Leave the voice call.
    pub fn leave_voice(&mut self) -> Vec<Effect> {
        let out = self.voice.leave();
        self.emit(out)
    }

    /// Mute or unmute the microphone.
    pub fn toggle_mic(&mut self) {
        self.voice.toggle_mic();
    }

    // ===== INBOUND =====

    /// Apply one inbound channel signal. `now` feeds the signaling machines'
    /// negotiation clocks.
    pub fn handle_signal(&mut self, signal: ChannelSignal, now: Instant) -> Vec<Effect> {
        match signal {
            ChannelSignal::Message(ChannelMessage::Event { envelope }) => {
                self.handle_envelope(envelope, now)
            }
            ChannelSignal::Message(ChannelMessage::PresenceSync { roster }) => {
                self.handle_presence(roster)
            }
            ChannelSignal::Disconnected => {
                warn!(board_id = %self.board_id, "session: channel disconnected");
                self.connected = false;
                vec![Effect::Notice("connection lost, reconnecting".into())]
            }
            ChannelSignal::Resubscribed => self.handle_resubscribed(),
        }
    }

    /// Periodic maintenance for the signaling machines.
    pub fn tick(&mut self, now: Instant) -> Vec<Effect> {
        let mut out = self.share.tick();
        out.merge(self.voice.tick(now));
        self.emit(out)
    }

    fn handle_envelope(&mut self, envelope: Envelope, now: Instant) -> Vec<Effect> {
        if envelope.board_id != self.board_id {
            debug!(got = %envelope.board_id, "session: envelope for another board dropped");
            return Vec::new();
        }
        if envelope.from == self.me.id {
            // Our own broadcast echoed back; everything local is already
            // applied.
            return Vec::new();
        }
        if let Some(target) = envelope.event.target() {
            if target != self.me.id {
                return Vec::new();
            }
        }

        let from = envelope.from;
        match envelope.event {
            Event::DrawSegment(segment) => {
                let style = StrokeStyle::from_hex(&segment.color, segment.stroke_width);
                let point = segment.point;
                match self.remote_strokes.get_mut(&segment.stroke_id) {
                    Some(live) => {
                        let prev = live.last;
                        live.last = point;
                        live.points.push(point);
                        live.style = style;
                        self.raster.paint_segment_with(prev, point, style);
                    }
                    None => {
                        self.remote_strokes.insert(
                            segment.stroke_id,
                            LiveStroke { last: point, points: vec![point], style },
                        );
                        self.raster.paint_segment_with(point, point, style);
                    }
                }
                vec![Effect::RenderNeeded]
            }
            Event::AddElement { element } => {
                // The committed path supersedes its live stroke.
                self.remote_strokes.remove(&element.id());
                let is_path = element.is_path();
                match self.store.add(element) {
                    Ok(()) => {
                        if is_path {
                            self.repaint();
                        }
                        vec![Effect::RenderNeeded]
                    }
                    Err(err) => {
                        // Replayed adds are expected; converged already.
                        debug!(%err, "session: remote add ignored");
                        Vec::new()
                    }
                }
            }
            Event::UpdateElement { id, patch } => {
                if self.store.update(&id, &patch).is_err() {
                    debug!(%id, "session: remote update on missing element ignored");
                    return Vec::new();
                }
                if self.store.get(&id).is_some_and(BoardElement::is_path) {
                    self.repaint();
                }
                vec![Effect::RenderNeeded]
            }
            Event::DeleteElement { id } | Event::Undo { id } => {
                // A remote undo is a plain delete here; our own stacks only
                // ever hold our own creations.
                match self.store.delete(&id) {
                    Some(element) => {
                        if element.is_path() {
                            self.repaint();
                        }
                        vec![Effect::RenderNeeded]
                    }
                    None => Vec::new(),
                }
            }
            Event::ClearBoard => {
                self.apply_clear();
                vec![Effect::RenderNeeded]
            }
            event @ (Event::ShareStarted
            | Event::ShareStopped
            | Event::ShareOffer(_)
            | Event::ShareAnswer(_)
            | Event::ShareCandidate(_)) => {
                let out = self.share.handle(&mut *self.connector, from, &event);
                self.emit(out)
            }
            event @ (Event::VoiceJoin
            | Event::VoiceLeave
            | Event::VoiceOffer(_)
            | Event::VoiceAnswer(_)
            | Event::VoiceCandidate(_)) => {
                let out = self.voice.handle(&mut *self.connector, from, &event, now);
                self.emit(out)
            }
        }
    }

    fn handle_presence(&mut self, roster: Vec<PresenceRecord>) -> Vec<Effect> {
        let before: HashSet<ParticipantId> = self.roster.iter().map(|r| r.participant.id).collect();
        let after: HashSet<ParticipantId> = roster.iter().map(|r| r.participant.id).collect();
        // Authoritative replace, never a merge.
        self.roster = roster;

        let mut effects = vec![Effect::RosterChanged];
        for &joined in after.difference(&before) {
            if joined == self.me.id {
                continue;
            }
            debug!(%joined, "session: participant joined");
            let out = self.share.peer_joined(&mut *self.connector, joined);
            effects.extend(self.emit(out));
        }
        for &left in before.difference(&after) {
            if left == self.me.id {
                continue;
            }
            debug!(%left, "session: participant left");
            let mut out = self.share.peer_left(left);
            out.merge(self.voice.peer_left(left));
            effects.extend(self.emit(out));
        }
        effects
    }

    fn handle_resubscribed(&mut self) -> Vec<Effect> {
        self.connected = true;
        self.track_presence();
        let queued: Vec<Event> = self.queue.drain(..).collect();
        let flushed = queued.len();
        for event in queued {
            self.publish(event);
        }
        info!(flushed, "session: resubscribed");
        vec![Effect::Notice("reconnected".into())]
    }

    fn apply_clear(&mut self) {
        self.store.clear();
        self.history.clear();
        self.remote_strokes.clear();
        self.drawing = None;
        self.raster.clear();
    }

    /// Redraw the surface: every committed path in creation order, then any
    /// strokes still in flight on top.
    fn repaint(&mut self) {
        self.raster.render_paths(self.store.all());
        for live in self.remote_strokes.values() {
            self.raster.stroke_polyline(&live.points, live.style);
        }
        if let Some((_, live)) = &self.drawing {
            self.raster.stroke_polyline(&live.points, live.style);
        }
    }

    // ===== OUTBOUND =====

    /// Broadcast an event, or queue it if the channel is down. Only document
    /// mutations queue; ephemeral traffic is dropped during an outage.
    fn publish(&mut self, event: Event) {
        if !self.connected {
            self.enqueue(event);
            return;
        }
        let envelope = Envelope::new(self.board_id, self.me.id, event.clone());
        match self.transport.send(envelope) {
            Ok(()) => {}
            Err(TransportError::Disconnected) => {
                self.connected = false;
                warn!(board_id = %self.board_id, "session: send failed, channel marked down");
                self.enqueue(event);
            }
            Err(err) => warn!(%err, "session: send failed"),
        }
    }

    fn enqueue(&mut self, event: Event) {
        if !event.is_document_mutation() {
            debug!(kind = event.kind(), "session: ephemeral event dropped while offline");
            return;
        }
        if self.queue.len() >= self.config.outbound_queue_limit {
            self.queue.pop_front();
        }
        self.queue.push_back(event);
    }

    fn publish_segment(&mut self, stroke_id: ElementId, point: Point, style: StrokeStyle) {
        self.publish(Event::draw_segment(
            stroke_id,
            point,
            &board::color::to_hex(style.color),
            style.width,
        ));
    }

    fn broadcast_all(&mut self, events: Vec<Event>) {
        for event in events {
            self.publish(event);
        }
    }

    fn emit(&mut self, out: Emitted) -> Vec<Effect> {
        self.broadcast_all(out.events);
        out.effects
    }

    fn track_presence(&mut self) {
        let record = PresenceRecord { participant: self.me.clone(), joined_at: self.joined_at };
        if let Err(err) = self.transport.track(record) {
            warn!(%err, "session: presence track failed");
            self.connected = false;
        }
    }
}
