//! Integration tests: design document import → export → re-import.
//!
//! The fixture is deliberately messy: duplicate ids, a numeric string, an
//! unknown color, a dangling instance, an undersized group and out-of-range
//! canvas and view values.

use festoon_core::document::{export_document, export_string, import_document, import_str};
use festoon_core::*;
use pretty_assertions::assert_eq;

fn fixture() -> Scene {
    import_str(include_str!("fixtures/party_arch.json")).expect("fixture should import")
}

fn id(s: &str) -> NodeId {
    NodeId::intern(s)
}

// ─── Import repairs ──────────────────────────────────────────────────────

#[test]
fn nodes_come_back_in_z_order() {
    let scene = fixture();
    let names: Vec<&str> = scene.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(&names[..3], &["loose", "inst_a", "inst_b"]);
    assert_eq!(&names[4..], &["label", "ghost", "guide_1", "orphan"]);
    let z: Vec<usize> = scene.nodes.iter().map(|n| n.z_index).collect();
    assert_eq!(z, (0..8).collect::<Vec<_>>());
}

#[test]
fn duplicate_id_is_reminted_and_bad_color_falls_back() {
    let scene = fixture();
    let dup = &scene.nodes[3];
    assert_ne!(dup.id, id("loose"));
    assert_eq!((dup.x, dup.y), (60.0, 60.0));
    assert_eq!(dup.color, color::FALLBACK_SWATCH);
    assert_eq!(scene.node(id("loose")).unwrap().x, 50.0);
}

#[test]
fn dangling_instance_becomes_balloon() {
    let scene = fixture();
    let orphan = scene.node(id("orphan")).unwrap();
    assert!(matches!(orphan.kind, NodeKind::Balloon(_)));
    assert_eq!(orphan.type_id, DEFAULT_TYPE_ID);
    let inst = scene.node(id("inst_b")).unwrap();
    assert_eq!(inst.symbol_id(), Some(SymbolId::intern("sym_cluster")));
}

#[test]
fn groups_are_reconciled() {
    let scene = fixture();
    assert_eq!(scene.groups.len(), 1);
    let pair = &scene.groups[0];
    assert_eq!(pair.child_ids.as_slice(), &[id("inst_a"), id("inst_b")]);
    assert_eq!(scene.node(id("inst_b")).unwrap().group_id, Some(pair.id));
    assert_eq!(scene.node(id("label")).unwrap().group_id, None);
}

#[test]
fn view_settings_and_canvas_are_clamped() {
    let scene = fixture();
    assert_eq!(scene.view, View { x: 10.0, y: 20.0, scale: MAX_VIEW_SCALE });
    assert!(!scene.settings.grid);
    assert!(scene.settings.snap);
    assert_eq!(scene.settings.snap_step, 10.0);
    assert_eq!(scene.settings.snap_guide_priority, GuidePriority::EdgesFirst);
    assert_eq!(scene.canvas.width_cm, MAX_CANVAS_CM);
    assert_eq!(scene.canvas.height_cm, 50.0);
    assert_eq!(scene.canvas.background_color, "#eeeeee");
    assert_eq!(scene.stack_grid.config.count, 3);
    assert_eq!(scene.stack_grid.config.direction, StackDirection::Column);
}

#[test]
fn guide_flag_and_text_meta_survive() {
    let scene = fixture();
    let guide = scene.node(id("guide_1")).unwrap();
    assert!(guide.guide && guide.locked);
    let NodeKind::Text(meta) = &scene.node(id("label")).unwrap().kind else {
        panic!("expected text");
    };
    assert_eq!(meta.text, "Happy\nBirthday");
    assert_eq!(meta.size, 30.0);
}

// ─── Round-trip ──────────────────────────────────────────────────────────

#[test]
fn export_then_import_is_lossless() {
    let scene = fixture();
    let json = export_string(&scene, 42).unwrap();
    let again = import_str(&json).unwrap();
    assert_eq!(scene, again);
}

#[test]
fn export_uses_camel_case_schema() {
    let scene = fixture();
    let value = serde_json::to_value(export_document(&scene, 7)).unwrap();
    assert_eq!(value["version"], 1);
    assert_eq!(value["savedAt"], 7);
    assert!(value["canvas"].get("widthCm").is_some());
    assert!(value["stackGrid"].get("gapX").is_some());
    let first = &value["nodes"][0];
    assert!(first.get("zIndex").is_some());
    assert!(first.get("typeId").is_some());
    assert!(first["meta"].get("radiusX").is_some());
    let instance = &value["nodes"][1];
    assert_eq!(instance["kind"], "symbol");
    assert_eq!(instance["symbolId"], "sym_cluster");
}

#[test]
fn rejects_documents_without_nodes() {
    assert!(matches!(
        import_document(&serde_json::json!({ "groups": [] })),
        Err(ImportError::MissingNodeList)
    ));
    assert!(matches!(
        import_document(&serde_json::json!([1, 2])),
        Err(ImportError::NotAnObject)
    ));
    assert!(matches!(import_str("{nope"), Err(ImportError::Json(_))));
}
