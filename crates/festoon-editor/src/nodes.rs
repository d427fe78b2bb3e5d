//! Node creation, editing, deletion and arrangement.
//!
//! Every operation here addresses the active node list, so the same calls
//! edit a symbol's body while in symbol edit mode.

use crate::editor::Editor;
use crate::selection::EditScope;
use festoon_core::align::{self, AlignMode, DistributeAxis};
use festoon_core::geometry::{snap_to_step, union_bounds};
use festoon_core::materials::CatalogEntry;
use festoon_core::snap::{SnapOptions, SnapResult, collect_guides, snap_box};
use festoon_core::symbols::would_create_cycle;
use festoon_core::{
    BalloonMeta, DEFAULT_TYPE_ID, ImageMeta, Node, NodeId, NodeKind, NodePatch, TextMeta, color,
    zorder,
};
use std::collections::{HashMap, HashSet};

/// Catalog type, color and shape for a new balloon.
#[derive(Debug, Clone, PartialEq)]
pub struct BalloonStyle {
    pub type_id: String,
    pub color: String,
    pub meta: BalloonMeta,
}

impl Default for BalloonStyle {
    fn default() -> Self {
        Self {
            type_id: DEFAULT_TYPE_ID.to_string(),
            color: color::FALLBACK_SWATCH.to_string(),
            meta: BalloonMeta::default(),
        }
    }
}

impl BalloonStyle {
    pub fn from_catalog(entry: &CatalogEntry, color: &str) -> Self {
        Self {
            type_id: entry.id.clone(),
            color: color.to_string(),
            meta: entry.defaults.clone(),
        }
    }

    pub(crate) fn build(&self, id: NodeId, x: f32, y: f32) -> Node {
        let mut node = Node::balloon(id, x, y, self.meta.clone());
        node.type_id.clone_from(&self.type_id);
        node.color = color::normalize_or_fallback(&self.color);
        node
    }
}

impl Editor {
    // ─── Insertion ───────────────────────────────────────────────────────

    /// Append to the active list with a unique id and the top z slot.
    pub(crate) fn push_node(&mut self, mut node: Node) -> NodeId {
        if self.scene.id_in_use(node.id) {
            node.id = self.scene.fresh_node_id();
        }
        node.group_id = None;
        node.color = color::normalize_or_fallback(&node.color);
        let nodes = self.active_nodes_mut();
        node.z_index = nodes.len();
        let id = node.id;
        nodes.push(node);
        id
    }

    /// Whether an instance of `symbol_id` may be placed in the active list.
    pub(crate) fn can_place_instance(&self, symbol_id: festoon_core::SymbolId) -> bool {
        if self.scene.symbol(symbol_id).is_none() {
            return false;
        }
        match self.selection.scope {
            EditScope::Symbol { symbol_id: container, .. } => {
                !would_create_cycle(&self.scene.symbols, container, symbol_id)
            }
            _ => true,
        }
    }

    fn push_and_select(&mut self, node: Node, label: &str) -> NodeId {
        let id = self.push_node(node);
        if self.is_selectable(id) {
            self.selection.select(id, false);
        }
        self.mark_dirty(label);
        id
    }

    /// Insert any node. Instances of unknown symbols, or ones that would
    /// make a symbol contain itself, are refused.
    pub fn add_node(&mut self, node: Node) -> Option<NodeId> {
        if let Some(symbol_id) = node.symbol_id() {
            if !self.can_place_instance(symbol_id) {
                log::warn!("refused instance of {symbol_id}: unknown symbol or reference cycle");
                return None;
            }
        }
        Some(self.push_and_select(node, "add"))
    }

    pub fn add_balloon(&mut self, x: f32, y: f32, style: &BalloonStyle) -> NodeId {
        let node = style.build(NodeId::fresh(), x, y);
        self.push_and_select(node, "add balloon")
    }

    pub fn add_text(&mut self, x: f32, y: f32, text: &str) -> NodeId {
        let meta = TextMeta {
            text: text.to_string(),
            ..TextMeta::default()
        };
        self.push_and_select(Node::text(NodeId::fresh(), x, y, meta), "add text")
    }

    pub fn add_image(&mut self, x: f32, y: f32, src: &str, width: f32, height: f32) -> NodeId {
        let d = ImageMeta::default();
        let meta = ImageMeta {
            src: src.to_string(),
            width: if width.is_finite() && width > 0.0 { width } else { d.width },
            height: if height.is_finite() && height > 0.0 { height } else { d.height },
        };
        self.push_and_select(Node::image(NodeId::fresh(), x, y, meta), "add image")
    }

    // ─── Editing ─────────────────────────────────────────────────────────

    /// Patch one node. Returns whether anything changed.
    pub fn update_node(&mut self, id: NodeId, patch: &NodePatch) -> bool {
        if let Some(NodeKind::SymbolInstance { symbol_id }) = &patch.kind {
            if !self.can_place_instance(*symbol_id) {
                return false;
            }
        }
        let Some(node) = self.active_node_mut(id) else {
            return false;
        };
        if !patch.apply(node) {
            return false;
        }
        self.mark_dirty("edit");
        true
    }

    /// Patch many nodes as one undo step. Returns how many changed.
    pub fn update_nodes(&mut self, patches: &[(NodeId, NodePatch)]) -> usize {
        self.batch("edit", |ed| {
            patches
                .iter()
                .filter(|(id, patch)| ed.update_node(*id, patch))
                .count()
        })
    }

    /// Switch a node's catalog type. With `replace_meta` a balloon takes the
    /// type's default meta wholesale; otherwise only its radii follow the
    /// defaults and knot and shape are kept.
    pub fn set_node_type(
        &mut self,
        id: NodeId,
        type_id: &str,
        defaults: Option<&BalloonMeta>,
        replace_meta: bool,
    ) -> bool {
        let Some(node) = self.active_node_mut(id) else {
            return false;
        };
        let before = node.clone();
        node.type_id = type_id.to_string();
        if let (NodeKind::Balloon(meta), Some(defaults)) = (&mut node.kind, defaults) {
            if replace_meta {
                *meta = defaults.clone();
            } else {
                meta.radius_x = defaults.radius_x;
                meta.radius_y = defaults.radius_y;
            }
        }
        if *node == before {
            return false;
        }
        self.mark_dirty("type");
        true
    }

    /// Edit a balloon's meta in place. Radii are kept positive.
    pub fn update_balloon_meta(&mut self, id: NodeId, edit: impl FnOnce(&mut BalloonMeta)) -> bool {
        let Some(node) = self.active_node_mut(id) else {
            return false;
        };
        let NodeKind::Balloon(meta) = &mut node.kind else {
            return false;
        };
        let before = meta.clone();
        edit(meta);
        if !(meta.radius_x.is_finite() && meta.radius_x > 0.0) {
            meta.radius_x = before.radius_x;
        }
        if !(meta.radius_y.is_finite() && meta.radius_y > 0.0) {
            meta.radius_y = before.radius_y;
        }
        if *meta == before {
            return false;
        }
        self.mark_dirty("balloon");
        true
    }

    /// Change a node's kind, keeping transform, style and flags.
    pub fn retype_node(&mut self, id: NodeId, kind: NodeKind) -> bool {
        let patch = NodePatch {
            kind: Some(kind),
            ..NodePatch::default()
        };
        self.update_node(id, &patch)
    }

    pub fn toggle_lock(&mut self, id: NodeId) -> bool {
        let Some(node) = self.active_node_mut(id) else {
            return false;
        };
        node.locked = !node.locked;
        self.mark_dirty("lock");
        true
    }

    pub fn toggle_visible(&mut self, id: NodeId) -> bool {
        let Some(node) = self.active_node_mut(id) else {
            return false;
        };
        node.visible = !node.visible;
        self.mark_dirty("visibility");
        true
    }

    fn set_flag_for_selection(&mut self, label: &str, set: impl Fn(&mut Node) -> bool) -> usize {
        let selected = self.selection.id_set();
        let changed = self
            .active_nodes_mut()
            .iter_mut()
            .filter(|n| selected.contains(&n.id))
            .map(|n| set(n))
            .filter(|changed| *changed)
            .count();
        if changed > 0 {
            self.mark_dirty(label);
        }
        changed
    }

    pub fn set_locked_for_selection(&mut self, locked: bool) -> usize {
        self.set_flag_for_selection("lock", |n| {
            let changed = n.locked != locked;
            n.locked = locked;
            changed
        })
    }

    /// Lock everything selected unless it is all locked already, in which
    /// case unlock it all.
    pub fn toggle_lock_selection(&mut self) -> usize {
        let any_unlocked = self.selected_nodes().iter().any(|n| !n.locked);
        self.set_locked_for_selection(any_unlocked)
    }

    pub fn set_visible_for_selection(&mut self, visible: bool) -> usize {
        self.set_flag_for_selection("visibility", |n| {
            let changed = n.visible != visible;
            n.visible = visible;
            changed
        })
    }

    // ─── Deletion ────────────────────────────────────────────────────────

    pub fn delete_selected(&mut self) -> usize {
        let ids: Vec<NodeId> = self.selection.ids().to_vec();
        let removed = self.delete_nodes(&ids);
        self.selection.clear();
        removed
    }

    /// Remove nodes from the active list. Groups and selection are
    /// repaired afterwards.
    pub fn delete_nodes(&mut self, ids: &[NodeId]) -> usize {
        let doomed: HashSet<NodeId> = ids.iter().copied().collect();
        let nodes = self.active_nodes_mut();
        let before = nodes.len();
        nodes.retain(|n| !doomed.contains(&n.id));
        let removed = before - nodes.len();
        if removed == 0 {
            return 0;
        }
        self.reconcile();
        self.mark_dirty("delete");
        removed
    }

    // ─── Z-order ─────────────────────────────────────────────────────────

    fn restack(
        &mut self,
        label: &str,
        op: impl FnOnce(&mut Vec<Node>, &HashSet<NodeId>) -> bool,
    ) -> bool {
        let selected = self.selection.id_set();
        if selected.is_empty() {
            return false;
        }
        let nodes = self.active_nodes_mut();
        if !op(nodes, &selected) {
            return false;
        }
        zorder::reindex(nodes);
        self.mark_dirty(label);
        true
    }

    pub fn bring_to_front(&mut self) -> bool {
        self.restack("bring to front", |nodes, sel| zorder::bring_to_front(nodes, sel))
    }

    pub fn send_to_back(&mut self) -> bool {
        self.restack("send to back", |nodes, sel| zorder::send_to_back(nodes, sel))
    }

    pub fn bring_forward(&mut self) -> bool {
        self.restack("bring forward", |nodes, sel| zorder::bring_forward(nodes, sel))
    }

    pub fn send_backward(&mut self) -> bool {
        self.restack("send backward", |nodes, sel| zorder::send_backward(nodes, sel))
    }

    /// Put `ordered` at the back in the given order; everything else keeps
    /// its relative order in front of them.
    pub fn reorder_by_ids(&mut self, ordered: &[NodeId]) -> bool {
        let nodes = self.active_nodes_mut();
        if !zorder::reorder_by_ids(nodes, ordered) {
            return false;
        }
        zorder::reindex(nodes);
        self.mark_dirty("reorder");
        true
    }

    // ─── Arrangement ─────────────────────────────────────────────────────

    pub(crate) fn movable_selection(&self) -> Vec<&Node> {
        self.selected_nodes()
            .into_iter()
            .filter(|n| !n.locked)
            .collect()
    }

    /// Move each listed node's center, as one undo step.
    pub(crate) fn move_nodes(&mut self, label: &str, targets: &[(NodeId, f32, f32)]) -> bool {
        if targets.is_empty() {
            return false;
        }
        self.batch(label, |ed| {
            let mut changed = false;
            for (id, x, y) in targets {
                if let Some(node) = ed.active_node_mut(*id) {
                    changed |= NodePatch::position(*x, *y).apply(node);
                }
            }
            if changed {
                ed.mark_dirty(label);
            }
            changed
        })
    }

    /// Line up unlocked selected nodes. Needs at least two.
    pub fn align_selection(&mut self, mode: AlignMode) -> bool {
        let nodes = self.movable_selection();
        let targets = align::align_targets(&nodes, &self.scene.symbols, mode);
        self.move_nodes("align", &targets)
    }

    /// Space unlocked selected nodes evenly between the outer two. Needs at
    /// least three.
    pub fn distribute_selection(&mut self, axis: DistributeAxis) -> bool {
        let nodes = self.movable_selection();
        let current: HashMap<NodeId, (f32, f32)> =
            nodes.iter().map(|n| (n.id, (n.x, n.y))).collect();
        let targets: Vec<(NodeId, f32, f32)> = align::distribute_targets(&nodes, axis)
            .into_iter()
            .filter_map(|(id, v)| {
                let (x, y) = *current.get(&id)?;
                Some(match axis {
                    DistributeAxis::X => (id, v, y),
                    DistributeAxis::Y => (id, x, v),
                })
            })
            .collect();
        self.move_nodes("distribute", &targets)
    }

    /// Adjust a proposed drag delta for the selection.
    ///
    /// Guide snapping (against other canvas nodes and the canvas frame)
    /// wins per axis; otherwise, with grid snap on, the box's top-left
    /// lands on the grid. The returned `dx`/`dy` are the final deltas to
    /// apply, not corrections. Guides are not used inside symbol edit,
    /// where coordinates are symbol-local.
    pub fn snap_selection_delta(&self, dx: f32, dy: f32) -> SnapResult {
        let nodes: Vec<&Node> = self.selected_nodes();
        let mut result = SnapResult {
            dx,
            dy,
            ..SnapResult::default()
        };
        let Some(b) = union_bounds(nodes.iter().copied(), &self.scene.symbols) else {
            return result;
        };
        let moved = b.translate(dx, dy);

        if !matches!(self.selection.scope, EditScope::Symbol { .. }) {
            let guides = collect_guides(&self.scene, &self.selection.id_set());
            let snap = snap_box(&moved, &guides, &SnapOptions::from_settings(&self.scene.settings));
            if snap.guide_x.is_some() {
                result.dx += snap.dx;
                result.guide_x = snap.guide_x;
            }
            if snap.guide_y.is_some() {
                result.dy += snap.dy;
                result.guide_y = snap.guide_y;
            }
        }

        let settings = &self.scene.settings;
        if settings.snap {
            if result.guide_x.is_none() {
                result.dx += snap_to_step(moved.x, settings.snap_step) - moved.x;
            }
            if result.guide_y.is_none() {
                result.dy += snap_to_step(moved.y, settings.snap_step) - moved.y;
            }
        }
        result
    }

    /// Shift unlocked selected nodes by a fixed delta.
    pub fn nudge_selection(&mut self, dx: f32, dy: f32) -> bool {
        if !dx.is_finite() || !dy.is_finite() || (dx == 0.0 && dy == 0.0) {
            return false;
        }
        let targets: Vec<(NodeId, f32, f32)> = self
            .movable_selection()
            .iter()
            .map(|n| (n.id, n.x + dx, n.y + dy))
            .collect();
        self.move_nodes("move", &targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::persistence::MemoryStore;
    use crate::schedule::ManualClock;
    use pretty_assertions::assert_eq;

    fn editor() -> Editor {
        Editor::with_backends(
            EditorConfig::default(),
            Box::new(MemoryStore::new()),
            Box::new(ManualClock::new(0)),
        )
    }

    fn round(r: f32) -> BalloonStyle {
        BalloonStyle {
            meta: BalloonMeta {
                radius_x: r,
                radius_y: r,
                ..BalloonMeta::default()
            },
            ..BalloonStyle::default()
        }
    }

    #[test]
    fn add_selects_and_stacks() {
        let mut ed = editor();
        let a = ed.add_balloon(0.0, 0.0, &round(10.0));
        let b = ed.add_balloon(50.0, 0.0, &round(10.0));
        assert_eq!(ed.selection().ids(), &[b]);
        assert_eq!(ed.scene().node(a).unwrap().z_index, 0);
        assert_eq!(ed.scene().node(b).unwrap().z_index, 1);
    }

    #[test]
    fn colors_are_normalized_on_insert() {
        let mut ed = editor();
        let style = BalloonStyle {
            color: "#ABC".into(),
            ..BalloonStyle::default()
        };
        let id = ed.add_balloon(0.0, 0.0, &style);
        assert_eq!(ed.scene().node(id).unwrap().color, "#aabbcc");
    }

    #[test]
    fn duplicate_ids_are_reminted() {
        let mut ed = editor();
        let id = NodeId::intern("nodes_dup");
        let first = ed.add_node(Node::balloon(id, 0.0, 0.0, BalloonMeta::default())).unwrap();
        let second = ed.add_node(Node::balloon(id, 0.0, 0.0, BalloonMeta::default())).unwrap();
        assert_eq!(first, id);
        assert_ne!(second, id);
    }

    #[test]
    fn align_skips_locked_nodes() {
        let mut ed = editor();
        let a = ed.add_balloon(0.0, 0.0, &round(10.0));
        let b = ed.add_balloon(100.0, 50.0, &round(10.0));
        let c = ed.add_balloon(200.0, 80.0, &round(10.0));
        ed.toggle_lock(c);
        ed.set_selection(&[a, b, c]);
        assert!(ed.align_selection(AlignMode::Top));
        assert_eq!(ed.scene().node(b).unwrap().y, 0.0);
        assert_eq!(ed.scene().node(c).unwrap().y, 80.0);
    }

    #[test]
    fn toggle_lock_selection_locks_then_unlocks() {
        let mut ed = editor();
        let a = ed.add_balloon(0.0, 0.0, &round(10.0));
        let b = ed.add_balloon(0.0, 0.0, &round(10.0));
        ed.toggle_lock(a);
        ed.set_selection(&[a, b]);
        assert_eq!(ed.toggle_lock_selection(), 1);
        assert!(ed.selected_nodes().iter().all(|n| n.locked));
        assert_eq!(ed.toggle_lock_selection(), 2);
        assert!(ed.selected_nodes().iter().all(|n| !n.locked));
    }

    #[test]
    fn snap_delta_prefers_guides_over_grid() {
        let mut ed = editor();
        ed.add_balloon(100.0, 100.0, &round(10.0));
        let moving = ed.add_balloon(300.0, 300.0, &round(10.0));
        ed.update_settings(|s| s.snap = true);
        ed.set_selection(&[moving]);

        // Moving center lands at 98: the other node's center at 100 wins.
        let r = ed.snap_selection_delta(-202.0, 37.0);
        assert_eq!(r.dx, -200.0);
        assert!(r.guide_x.is_some());
        // No guide near y=327: the box top rounds to 330 on the grid.
        assert!(r.guide_y.is_none());
        assert_eq!(r.dy, 40.0);
    }

    #[test]
    fn nudge_moves_unlocked_only() {
        let mut ed = editor();
        let a = ed.add_balloon(0.0, 0.0, &round(10.0));
        let b = ed.add_balloon(0.0, 0.0, &round(10.0));
        ed.toggle_lock(b);
        ed.set_selection(&[a, b]);
        assert!(ed.nudge_selection(5.0, -5.0));
        assert_eq!((ed.scene().node(a).unwrap().x, ed.scene().node(a).unwrap().y), (5.0, -5.0));
        assert_eq!(ed.scene().node(b).unwrap().x, 0.0);
    }
}
