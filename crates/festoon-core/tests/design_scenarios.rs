//! Integration tests: whole-scene behaviour across modules (materials,
//! stack grid, snapping, symbol expansion and z-order).

use festoon_core::geometry::{Bounds, node_bounds};
use festoon_core::snap::{GuideSource, collect_guides};
use festoon_core::symbols::{expand_instance, would_create_cycle};
use festoon_core::*;
use pretty_assertions::assert_eq;
use std::collections::HashSet;

fn balloon(id: &str, x: f32, y: f32, r: f32) -> Node {
    Node::balloon(
        NodeId::intern(id),
        x,
        y,
        BalloonMeta {
            radius_x: r,
            radius_y: r,
            ..BalloonMeta::default()
        },
    )
}

fn party_arch() -> Scene {
    import_str(include_str!("fixtures/party_arch.json")).unwrap()
}

// ─── Materials ───────────────────────────────────────────────────────────

#[test]
fn fixture_material_counts() {
    let scene = party_arch();
    let summary = compute_materials(&scene, &Catalog::builtin(), MaterialFilter::default());
    assert_eq!(summary.total, 9);

    let colors: Vec<(&str, usize)> = summary
        .by_color
        .iter()
        .map(|c| (c.color.as_str(), c.qty))
        .collect();
    assert_eq!(
        colors,
        vec![("#ff0000", 4), ("#ffffff", 2), ("#ff3b30", 2), ("#0000ff", 1)]
    );

    let types: Vec<(&str, usize)> = summary
        .by_type
        .iter()
        .map(|t| (t.type_id.as_str(), t.qty))
        .collect();
    assert_eq!(types, vec![("round-11", 7), ("round-5", 2)]);
    assert!(summary.has_costs);
    assert_eq!(summary.estimated_cost, 55.0);
}

#[test]
fn hidden_nodes_count_only_when_asked() {
    let scene = party_arch();
    let filter = MaterialFilter {
        include_hidden: true,
        include_locked: true,
    };
    let summary = compute_materials(&scene, &Catalog::builtin(), filter);
    // The hidden balloon joins; the guide never does.
    assert_eq!(summary.total, 10);
}

#[test]
fn guides_are_not_material() {
    let mut scene = Scene::new();
    for (i, x) in [0.0, 100.0, 200.0].into_iter().enumerate() {
        scene.nodes.push(balloon(&format!("mat_{i}"), x, 0.0, 10.0));
    }
    let mut guide = balloon("mat_guide", 300.0, 0.0, 10.0);
    guide.guide = true;
    guide.locked = true;
    scene.nodes.push(guide);

    let summary = compute_materials(&scene, &Catalog::builtin(), MaterialFilter::default());
    assert_eq!(summary.total, 3);
    assert_eq!(summary.by_type[0].subtotal, 21.0);
    assert_eq!(summary.estimated_cost, 21.0);
}

#[test]
fn materials_export_lists_nodes() {
    let scene = party_arch();
    let export = MaterialsExport::new(&scene, &Catalog::builtin(), MaterialFilter::default(), 99);
    assert_eq!(export.created_at, 99);
    assert_eq!(export.summary.total, 9);
    // Every canvas node but the guide, instances unexpanded.
    assert_eq!(export.nodes.len(), 7);
}

// ─── Stack grid ──────────────────────────────────────────────────────────

#[test]
fn snake_rows_turn_back() {
    let mut grid = StackGrid::new(StackGridConfig {
        count: 3,
        gap_x: 0.0,
        gap_y: 0.0,
        direction: StackDirection::Row,
        pattern: StackPattern::Snake,
        origin_x: 0.0,
        origin_y: 0.0,
    });
    let cell = StackGrid::cell_for(10.0, 10.0);
    let spots: Vec<(f32, f32)> = (0..6).map(|_| grid.next(cell)).collect();
    assert_eq!(
        spots,
        vec![
            (0.0, 0.0),
            (20.0, 0.0),
            (40.0, 0.0),
            (40.0, 20.0),
            (20.0, 20.0),
            (0.0, 20.0),
        ]
    );
}

#[test]
fn column_grid_fills_downwards() {
    let mut grid = StackGrid::new(StackGridConfig {
        count: 2,
        gap_x: 5.0,
        gap_y: 5.0,
        direction: StackDirection::Column,
        pattern: StackPattern::Normal,
        origin_x: 100.0,
        origin_y: 100.0,
    });
    let cell = StackGrid::cell_for(10.0, 10.0);
    let spots: Vec<(f32, f32)> = (0..3).map(|_| grid.next(cell)).collect();
    assert_eq!(spots, vec![(100.0, 100.0), (100.0, 125.0), (125.0, 100.0)]);
}

// ─── Snapping ────────────────────────────────────────────────────────────

#[test]
fn node_guide_beats_canvas_guide_at_equal_distance() {
    let mut scene = Scene::new();
    // Canvas left edge at x=100.
    scene.canvas.offset_x_cm = 10.0;
    // Right edge at x=104.
    scene.nodes.push(balloon("snap_anchor", 94.0, 50.0, 10.0));

    let guides = collect_guides(&scene, &HashSet::new());
    let options = SnapOptions {
        enabled: true,
        tolerance: 8.0,
        priority: GuidePriority::EdgesFirst,
    };
    let moving = Bounds::new(102.0, 300.0, 50.0, 50.0);
    let result = snap_box(&moving, &guides, &options);
    assert_eq!(result.dx, 2.0);
    assert_eq!(
        result.guide_x.map(|g| g.source),
        Some(GuideSource::Node(NodeId::intern("snap_anchor")))
    );
    assert_eq!(result.dy, 0.0);
}

#[test]
fn moving_nodes_do_not_guide_themselves() {
    let mut scene = Scene::new();
    scene.nodes.push(balloon("self_a", 500.0, 500.0, 10.0));
    let me = HashSet::from([NodeId::intern("self_a")]);
    let guides = collect_guides(&scene, &me);
    let b = node_bounds(&scene.nodes[0], &scene.symbols);
    let result = snap_box(&b, &guides, &SnapOptions::from_settings(&scene.settings));
    assert!(!result.is_snapped());
}

// ─── Symbols ─────────────────────────────────────────────────────────────

#[test]
fn instances_expand_with_their_transform() {
    let scene = party_arch();
    let mut inst = scene.node(NodeId::intern("inst_a")).unwrap().clone();
    inst.scale_x = 2.0;
    inst.scale_y = 2.0;
    let leaves = expand_instance(&inst, &scene.symbols);
    let spots: Vec<(f32, f32)> = leaves.iter().map(|n| (n.x, n.y)).collect();
    assert_eq!(spots, vec![(60.0, 200.0), (140.0, 200.0), (100.0, 140.0)]);
    assert!(leaves.iter().all(|n| n.group_id.is_none()));
}

#[test]
fn imported_wide_cycle_is_cheap_to_count() {
    let instances: Vec<_> = (0..12)
        .map(|i| {
            serde_json::json!({ "id": format!("wc_{i}"), "kind": "symbol", "symbolId": "sym_wc" })
        })
        .collect();
    let doc = serde_json::json!({
        "symbols": [{ "id": "sym_wc", "nodes": instances }],
        "nodes": [{ "id": "wc_root", "kind": "symbol", "symbolId": "sym_wc" }]
    });
    let scene = import_document(&doc).unwrap();
    assert!(symbols::has_cycle(&scene.symbols));

    let summary = compute_materials(&scene, &Catalog::builtin(), MaterialFilter::default());
    assert_eq!(summary.total, 0);
    let root = scene.node(NodeId::intern("wc_root")).unwrap();
    assert!(expand_instance(root, &scene.symbols).is_empty());
}

#[test]
fn nested_reference_cycles_are_detected() {
    let mut scene = party_arch();
    let outer = SymbolId::intern("sym_outer");
    let cluster = SymbolId::intern("sym_cluster");
    scene.symbols.push(Symbol {
        id: outer,
        name: "Outer".into(),
        nodes: vec![Node::instance(NodeId::intern("nest_1"), 0.0, 0.0, cluster)],
    });
    assert!(!would_create_cycle(&scene.symbols, outer, cluster));
    assert!(would_create_cycle(&scene.symbols, cluster, outer));
    assert!(would_create_cycle(&scene.symbols, cluster, cluster));
}

// ─── Z-order ─────────────────────────────────────────────────────────────

#[test]
fn bring_to_front_keeps_relative_order() {
    let mut scene = party_arch();
    let picked = HashSet::from([NodeId::intern("loose"), NodeId::intern("inst_b")]);
    assert!(zorder::bring_to_front(&mut scene.nodes, &picked));
    zorder::reindex(&mut scene.nodes);
    let tail: Vec<&str> = scene.nodes[6..].iter().map(|n| n.id.as_str()).collect();
    assert_eq!(tail, vec!["loose", "inst_b"]);
    let z: Vec<usize> = scene.nodes.iter().map(|n| n.z_index).collect();
    assert_eq!(z, (0..8).collect::<Vec<_>>());
    assert!(!zorder::bring_to_front(&mut scene.nodes, &picked));
}
