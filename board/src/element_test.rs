#![allow(clippy::float_cmp)]

use uuid::Uuid;

use super::*;
use crate::element::{BoardElement, ElementPatch, ShapeKind};

fn sticky(id: Uuid) -> BoardElement {
    BoardElement::StickyNote {
        id,
        x: 10.0,
        y: 20.0,
        width: 160.0,
        height: 120.0,
        color: "#ffeb3b".into(),
        text: "remember".into(),
        owner: Uuid::new_v4(),
    }
}

// =============================================================
// Serde
// =============================================================

#[test]
fn path_serde_roundtrip() {
    let element = BoardElement::Path {
        id: Uuid::new_v4(),
        points: vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0), Point::new(10.0, 2.0)],
        color: "#ff0000".into(),
        stroke_width: 3.0,
        owner: Uuid::new_v4(),
    };
    let json = serde_json::to_string(&element).unwrap();
    assert!(json.contains("\"type\":\"path\""));
    let back: BoardElement = serde_json::from_str(&json).unwrap();
    assert_eq!(back, element);
}

#[test]
fn shape_kind_serde() {
    assert_eq!(serde_json::to_string(&ShapeKind::Rect).unwrap(), "\"rect\"");
    assert_eq!(serde_json::to_string(&ShapeKind::Circle).unwrap(), "\"circle\"");
    let back: ShapeKind = serde_json::from_str("\"circle\"").unwrap();
    assert_eq!(back, ShapeKind::Circle);
}

#[test]
fn sticky_note_serde_roundtrip() {
    let element = sticky(Uuid::new_v4());
    let json = serde_json::to_string(&element).unwrap();
    let back: BoardElement = serde_json::from_str(&json).unwrap();
    assert_eq!(back, element);
}

#[test]
fn unknown_type_rejects() {
    let result = serde_json::from_str::<BoardElement>(r#"{"type":"hologram","id":"x"}"#);
    assert!(result.is_err());
}

// =============================================================
// Identity accessors
// =============================================================

#[test]
fn id_and_owner_cover_all_variants() {
    let id = Uuid::new_v4();
    let owner = Uuid::new_v4();
    let variants = [
        BoardElement::Path { id, points: vec![], color: "#000000".into(), stroke_width: 1.0, owner },
        BoardElement::Shape {
            id,
            kind: ShapeKind::Rect,
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
            color: "#000000".into(),
            owner,
        },
        sticky_with(id, owner),
        BoardElement::TextBox { id, x: 0.0, y: 0.0, width: 1.0, height: 1.0, text: String::new(), owner },
    ];
    for v in variants {
        assert_eq!(v.id(), id);
        assert_eq!(v.owner(), owner);
    }
}

fn sticky_with(id: Uuid, owner: Uuid) -> BoardElement {
    let mut e = sticky(id);
    if let BoardElement::StickyNote { owner: o, .. } = &mut e {
        *o = owner;
    }
    e
}

#[test]
fn only_path_is_rasterized() {
    let e = sticky(Uuid::new_v4());
    assert!(!e.is_path());
    let p = BoardElement::Path {
        id: Uuid::new_v4(),
        points: vec![],
        color: "#000000".into(),
        stroke_width: 1.0,
        owner: Uuid::new_v4(),
    };
    assert!(p.is_path());
}

// =============================================================
// Patches
// =============================================================

#[test]
fn patch_moves_and_recolors_sticky() {
    let mut e = sticky(Uuid::new_v4());
    let patch = ElementPatch { color: Some("#00ff00".into()), ..ElementPatch::move_to(99.0, 101.0) };
    e.apply_patch(&patch);
    let BoardElement::StickyNote { x, y, color, text, .. } = &e else {
        panic!("variant changed");
    };
    assert_eq!(*x, 99.0);
    assert_eq!(*y, 101.0);
    assert_eq!(color, "#00ff00");
    assert_eq!(text, "remember");
}

#[test]
fn patch_ignores_fields_variant_lacks() {
    let mut e = BoardElement::Path {
        id: Uuid::new_v4(),
        points: vec![Point::new(1.0, 1.0)],
        color: "#123456".into(),
        stroke_width: 2.0,
        owner: Uuid::new_v4(),
    };
    // x/y/text mean nothing to a path; only color and stroke width apply.
    let patch = ElementPatch {
        x: Some(7.0),
        text: Some("nope".into()),
        color: Some("#654321".into()),
        stroke_width: Some(5.0),
        ..ElementPatch::default()
    };
    e.apply_patch(&patch);
    let BoardElement::Path { color, stroke_width, points, .. } = &e else {
        panic!("variant changed");
    };
    assert_eq!(color, "#654321");
    assert_eq!(*stroke_width, 5.0);
    assert_eq!(points.len(), 1);
}

#[test]
fn disjoint_patches_commute() {
    let base = sticky(Uuid::new_v4());
    let move_patch = ElementPatch::move_to(40.0, 50.0);
    let text_patch = ElementPatch { text: Some("swapped".into()), ..ElementPatch::default() };

    let mut ab = base.clone();
    ab.apply_patch(&move_patch);
    ab.apply_patch(&text_patch);

    let mut ba = base.clone();
    ba.apply_patch(&text_patch);
    ba.apply_patch(&move_patch);

    assert_eq!(ab, ba);
}

#[test]
fn empty_patch_serializes_empty() {
    let json = serde_json::to_string(&ElementPatch::default()).unwrap();
    assert_eq!(json, "{}");
}
