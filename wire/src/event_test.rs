use board::element::{BoardElement, ElementPatch};
use uuid::Uuid;

use super::*;

fn note() -> BoardElement {
    BoardElement::StickyNote {
        id: Uuid::new_v4(),
        x: 1.0,
        y: 2.0,
        width: 160.0,
        height: 120.0,
        color: "#ffeb3b".into(),
        text: "hi".into(),
        owner: Uuid::new_v4(),
    }
}

// =============================================================
// Serde shape
// =============================================================

#[test]
fn kinds_serialize_kebab_case() {
    let cases: Vec<(Event, &str)> = vec![
        (Event::ClearBoard, "clear-board"),
        (Event::ShareStarted, "share-started"),
        (Event::ShareStopped, "share-stopped"),
        (Event::VoiceJoin, "voice-join"),
        (Event::VoiceLeave, "voice-leave"),
        (Event::AddElement { element: note() }, "add-element"),
        (Event::Undo { id: Uuid::new_v4() }, "undo"),
    ];
    for (event, expected) in cases {
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value.get("kind").and_then(|v| v.as_str()), Some(expected));
        assert_eq!(event.kind(), expected);
    }
}

#[test]
fn update_element_roundtrip() {
    let event = Event::UpdateElement {
        id: Uuid::new_v4(),
        patch: ElementPatch { text: Some("edited".into()), ..ElementPatch::default() },
    };
    let text = serde_json::to_string(&event).unwrap();
    let back: Event = serde_json::from_str(&text).unwrap();
    assert_eq!(back, event);
}

#[test]
fn candidate_optional_fields_roundtrip() {
    let event = Event::VoiceCandidate(CandidatePayload {
        to: Uuid::new_v4(),
        candidate: "candidate:1 1 udp 2130706431 192.0.2.1 54321 typ host".into(),
        sdp_mid: Some("0".into()),
        sdp_m_line_index: Some(0),
    });
    let text = serde_json::to_string(&event).unwrap();
    let back: Event = serde_json::from_str(&text).unwrap();
    assert_eq!(back, event);

    let bare = Event::ShareCandidate(CandidatePayload {
        to: Uuid::new_v4(),
        candidate: "candidate:2".into(),
        sdp_mid: None,
        sdp_m_line_index: None,
    });
    let text = serde_json::to_string(&bare).unwrap();
    assert!(!text.contains("sdp_mid"));
}

// =============================================================
// Targeting and classification
// =============================================================

#[test]
fn targeted_events_expose_their_target() {
    let to = Uuid::new_v4();
    let targeted = [
        Event::ShareOffer(SignalPayload { to, sdp: "o".into() }),
        Event::ShareAnswer(SignalPayload { to, sdp: "a".into() }),
        Event::ShareCandidate(CandidatePayload { to, candidate: "c".into(), sdp_mid: None, sdp_m_line_index: None }),
        Event::VoiceOffer(SignalPayload { to, sdp: "o".into() }),
        Event::VoiceAnswer(SignalPayload { to, sdp: "a".into() }),
        Event::VoiceCandidate(CandidatePayload { to, candidate: "c".into(), sdp_mid: None, sdp_m_line_index: None }),
    ];
    for event in targeted {
        assert_eq!(event.target(), Some(to), "{}", event.kind());
    }
}

#[test]
fn broadcast_events_have_no_target() {
    for event in [Event::ClearBoard, Event::ShareStarted, Event::VoiceJoin, Event::VoiceLeave] {
        assert_eq!(event.target(), None);
    }
}

#[test]
fn document_mutations_are_classified() {
    assert!(Event::AddElement { element: note() }.is_document_mutation());
    assert!(Event::Undo { id: Uuid::new_v4() }.is_document_mutation());
    assert!(Event::ClearBoard.is_document_mutation());
    // Ephemeral and signaling events are not queued on disconnect.
    assert!(!Event::draw_segment(Uuid::new_v4(), Point::new(0.0, 0.0), "#000000", 1.0).is_document_mutation());
    assert!(!Event::VoiceJoin.is_document_mutation());
    assert!(!Event::ShareOffer(SignalPayload { to: Uuid::new_v4(), sdp: String::new() }).is_document_mutation());
}
