use std::sync::atomic::Ordering;

use super::*;
use crate::testutil::{MockConnector, MockMedia};
use uuid::Uuid;

fn machine(me: ParticipantId) -> ShareMachine {
    ShareMachine::new(me, Vec::new())
}

fn offers(out: &Emitted) -> Vec<ParticipantId> {
    out.events
        .iter()
        .filter_map(|e| match e {
            Event::ShareOffer(p) => Some(p.to),
            _ => None,
        })
        .collect()
}

#[test]
fn start_announces_then_offers_every_peer() {
    let me = Uuid::new_v4();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let (mut media, media_log) = MockMedia::new();
    let (mut connector, log) = MockConnector::new();
    let mut share = machine(me);

    let out = share.start(&mut media, &mut connector, &[me, a, b]);

    assert!(share.is_sharing());
    assert_eq!(out.events[0], Event::ShareStarted);
    let mut targets = offers(&out);
    targets.sort_unstable();
    let mut expected = vec![a, b];
    expected.sort_unstable();
    assert_eq!(targets, expected, "one offer per peer, none to self");
    assert_eq!(log.link_count(PeerRole::Initiator), 2);
    assert_eq!(media_log.display_tracks.lock().unwrap().len(), 1);
}

#[test]
fn declined_capture_prompt_announces_nothing() {
    let me = Uuid::new_v4();
    let (mut media, media_log) = MockMedia::new();
    media_log.deny_display.store(true, Ordering::SeqCst);
    let (mut connector, log) = MockConnector::new();
    let mut share = machine(me);

    let out = share.start(&mut media, &mut connector, &[me, Uuid::new_v4()]);

    assert!(out.is_empty());
    assert!(!share.is_sharing());
    assert_eq!(log.links.lock().unwrap().len(), 0);
}

#[test]
fn viewer_answers_the_sharers_offer() {
    let sharer = Uuid::new_v4();
    let viewer = Uuid::new_v4();
    let (mut connector, log) = MockConnector::new();
    let mut share = machine(viewer);

    let out = share.handle(&mut connector, sharer, &Event::ShareStarted);
    assert!(out.is_empty());
    assert_eq!(share.viewing_from(), Some(sharer));

    let offer = Event::ShareOffer(SignalPayload { to: viewer, sdp: "v=0 offer".into() });
    let out = share.handle(&mut connector, sharer, &offer);

    assert!(matches!(out.events.first(), Some(Event::ShareAnswer(p)) if p.to == sharer));
    assert!(out.effects.contains(&Effect::RemoteVideo { from: Some(sharer) }));
    assert_eq!(log.link_count(PeerRole::Responder), 1);
}

#[test]
fn offer_without_a_prior_started_still_answers() {
    // A late subscriber can see the offer before (or instead of) the
    // started announcement.
    let sharer = Uuid::new_v4();
    let viewer = Uuid::new_v4();
    let (mut connector, _log) = MockConnector::new();
    let mut share = machine(viewer);

    let offer = Event::ShareOffer(SignalPayload { to: viewer, sdp: "v=0 offer".into() });
    let out = share.handle(&mut connector, sharer, &offer);

    assert!(matches!(out.events.first(), Some(Event::ShareAnswer(_))));
    assert_eq!(share.viewing_from(), Some(sharer));
}

#[test]
fn answer_completes_the_sharers_link() {
    let me = Uuid::new_v4();
    let viewer = Uuid::new_v4();
    let (mut media, _) = MockMedia::new();
    let (mut connector, log) = MockConnector::new();
    let mut share = machine(me);
    share.start(&mut media, &mut connector, &[me, viewer]);

    let answer = Event::ShareAnswer(SignalPayload { to: me, sdp: "v=0 answer".into() });
    let out = share.handle(&mut connector, viewer, &answer);

    assert!(out.is_empty());
    assert!(log.probe(0).answer_applied.load(Ordering::SeqCst));
}

#[test]
fn orphan_answer_after_stop_is_harmless() {
    let me = Uuid::new_v4();
    let viewer = Uuid::new_v4();
    let (mut media, _) = MockMedia::new();
    let (mut connector, _) = MockConnector::new();
    let mut share = machine(me);
    share.start(&mut media, &mut connector, &[me, viewer]);
    share.stop();

    let answer = Event::ShareAnswer(SignalPayload { to: me, sdp: "v=0 answer".into() });
    let out = share.handle(&mut connector, viewer, &answer);

    assert!(out.is_empty());
    assert!(!share.is_sharing());
}

#[test]
fn candidate_without_a_link_is_swallowed() {
    let me = Uuid::new_v4();
    let (mut connector, _) = MockConnector::new();
    let mut share = machine(me);

    let candidate = Event::ShareCandidate(CandidatePayload {
        to: me,
        candidate: "candidate:late".into(),
        sdp_mid: None,
        sdp_m_line_index: None,
    });
    let out = share.handle(&mut connector, Uuid::new_v4(), &candidate);

    assert!(out.is_empty());
}

#[test]
fn stop_closes_track_and_links() {
    let me = Uuid::new_v4();
    let viewer = Uuid::new_v4();
    let (mut media, media_log) = MockMedia::new();
    let (mut connector, log) = MockConnector::new();
    let mut share = machine(me);
    share.start(&mut media, &mut connector, &[me, viewer]);

    let out = share.stop();

    assert_eq!(out.events, vec![Event::ShareStopped]);
    assert!(!share.is_sharing());
    assert!(media_log.display(0).stopped.load(Ordering::SeqCst));
    assert!(log.probe(0).closed.load(Ordering::SeqCst));
}

#[test]
fn native_track_end_auto_stops_on_tick() {
    let me = Uuid::new_v4();
    let (mut media, media_log) = MockMedia::new();
    let (mut connector, _) = MockConnector::new();
    let mut share = machine(me);
    share.start(&mut media, &mut connector, &[me]);

    assert!(share.tick().is_empty(), "live track, nothing to do");

    media_log.display(0).ended.store(true, Ordering::SeqCst);
    let out = share.tick();

    assert!(out.events.contains(&Event::ShareStopped));
    assert!(!share.is_sharing());
}

#[test]
fn remote_stop_tears_down_the_viewer() {
    let sharer = Uuid::new_v4();
    let viewer = Uuid::new_v4();
    let (mut connector, log) = MockConnector::new();
    let mut share = machine(viewer);
    let offer = Event::ShareOffer(SignalPayload { to: viewer, sdp: "v=0 offer".into() });
    share.handle(&mut connector, sharer, &offer);

    let out = share.handle(&mut connector, sharer, &Event::ShareStopped);

    assert!(out.effects.contains(&Effect::RemoteVideo { from: None }));
    assert_eq!(share.viewing_from(), None);
    assert!(log.probe(0).closed.load(Ordering::SeqCst));
}

#[test]
fn concurrent_sharers_resolve_to_the_higher_id() {
    let low = Uuid::from_u128(1);
    let high = Uuid::from_u128(2);
    let (mut media, _) = MockMedia::new();
    let (mut connector, _) = MockConnector::new();

    let mut share = ShareMachine::new(low, Vec::new());
    share.start(&mut media, &mut connector, &[low]);
    let out = share.handle(&mut connector, high, &Event::ShareStarted);
    assert!(out.events.contains(&Event::ShareStopped), "lower id yields");
    assert_eq!(share.viewing_from(), Some(high));

    let mut share = ShareMachine::new(high, Vec::new());
    share.start(&mut media, &mut connector, &[high]);
    let out = share.handle(&mut connector, low, &Event::ShareStarted);
    assert!(out.events.is_empty(), "higher id keeps sharing");
    assert!(share.is_sharing());
}

#[test]
fn switching_sharers_closes_the_old_link() {
    let viewer = Uuid::new_v4();
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    let (mut connector, log) = MockConnector::new();
    let mut share = machine(viewer);
    let offer = Event::ShareOffer(SignalPayload { to: viewer, sdp: "v=0 offer".into() });
    share.handle(&mut connector, first, &offer);
    assert_eq!(share.viewing_from(), Some(first));

    let out = share.handle(&mut connector, second, &Event::ShareStarted);

    assert!(log.probe(0).closed.load(Ordering::SeqCst), "old link closed, not leaked");
    assert!(out.effects.contains(&Effect::RemoteVideo { from: None }));
    assert_eq!(share.viewing_from(), Some(second));
}

#[test]
fn a_fresh_offer_replaces_the_viewers_link() {
    let viewer = Uuid::new_v4();
    let sharer = Uuid::new_v4();
    let (mut connector, log) = MockConnector::new();
    let mut share = machine(viewer);
    let offer = Event::ShareOffer(SignalPayload { to: viewer, sdp: "v=0 offer".into() });
    share.handle(&mut connector, sharer, &offer);

    // The sharer renegotiates (restarted capture, new SDP).
    let out = share.handle(&mut connector, sharer, &offer);

    assert!(log.probe(0).closed.load(Ordering::SeqCst));
    assert!(matches!(out.events.first(), Some(Event::ShareAnswer(_))));
    assert_eq!(log.link_count(PeerRole::Responder), 2);
}

#[test]
fn late_joiner_gets_an_offer() {
    let me = Uuid::new_v4();
    let (mut media, _) = MockMedia::new();
    let (mut connector, log) = MockConnector::new();
    let mut share = machine(me);
    share.start(&mut media, &mut connector, &[me]);

    let newcomer = Uuid::new_v4();
    let out = share.peer_joined(&mut connector, newcomer);

    assert_eq!(offers(&out), vec![newcomer]);
    assert_eq!(log.link_count(PeerRole::Initiator), 1);

    // Already-known viewers are not re-offered.
    assert!(share.peer_joined(&mut connector, newcomer).is_empty());
}
