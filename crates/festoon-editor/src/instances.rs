//! Symbol library operations and symbol edit mode.

use crate::editor::Editor;
use crate::selection::EditScope;
use festoon_core::geometry::union_bounds;
use festoon_core::symbols::expand_instance;
use festoon_core::{Node, NodeId, Symbol, SymbolId};
use std::collections::HashSet;

impl Editor {
    /// Turn the selected canvas nodes into a new symbol and put one
    /// instance of it where they were.
    ///
    /// The symbol's origin is the center of the selection's box, so the
    /// instance sits at that center and the picture does not move.
    pub fn create_symbol_from_selection(&mut self, name: Option<&str>) -> Option<SymbolId> {
        if self.selection.scope != EditScope::Canvas {
            return None;
        }
        let picked: Vec<Node> = self
            .selected_nodes()
            .into_iter()
            .filter(|n| !n.guide)
            .cloned()
            .collect();
        let bbox = union_bounds(picked.iter(), &self.scene.symbols)?;
        let (cx, cy) = bbox.center();
        let picked_ids: HashSet<NodeId> = picked.iter().map(|n| n.id).collect();

        let sid = self.scene.fresh_symbol_id();
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Symbol {}", self.scene.symbols.len() + 1));
        let body: Vec<Node> = picked
            .into_iter()
            .map(|mut n| {
                n.x -= cx;
                n.y -= cy;
                n.group_id = None;
                n
            })
            .collect();

        // Slot of the front-most picked node once the picked ones are gone.
        let front = self
            .scene
            .nodes
            .iter()
            .rposition(|n| picked_ids.contains(&n.id))
            .unwrap_or(self.scene.nodes.len());
        let slot = self.scene.nodes[..front]
            .iter()
            .filter(|n| !picked_ids.contains(&n.id))
            .count();

        self.batch("create symbol", |ed| {
            ed.scene.nodes.retain(|n| !picked_ids.contains(&n.id));
            ed.scene.symbols.push(Symbol {
                id: sid,
                name: name.clone(),
                nodes: body,
            });
            let mut instance = Node::instance(ed.scene.fresh_node_id(), cx, cy, sid);
            instance.name = name;
            let iid = instance.id;
            let slot = slot.min(ed.scene.nodes.len());
            ed.scene.nodes.insert(slot, instance);
            ed.reconcile();
            ed.selection.set([iid]);
            ed.mark_dirty("create symbol");
        });
        log::debug!("created symbol {sid} from {} nodes", picked_ids.len());
        Some(sid)
    }

    /// Place an instance in the active list. Refused for unknown symbols
    /// and for placements that would make a symbol contain itself.
    pub fn place_symbol(&mut self, symbol_id: SymbolId, x: f32, y: f32) -> Option<NodeId> {
        let name = self.scene.symbol(symbol_id)?.name.clone();
        let mut node = Node::instance(NodeId::fresh(), x, y, symbol_id);
        node.name = name;
        self.add_node(node)
    }

    pub fn rename_symbol(&mut self, symbol_id: SymbolId, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let Some(symbol) = self.scene.symbol_mut(symbol_id) else {
            return false;
        };
        if symbol.name == name {
            return false;
        }
        symbol.name = name.to_string();
        self.mark_dirty("rename symbol");
        true
    }

    /// Remove a symbol along with every instance of it, on the canvas and
    /// inside other symbols.
    pub fn delete_symbol(&mut self, symbol_id: SymbolId) -> bool {
        if self.scene.symbol(symbol_id).is_none() {
            return false;
        }
        let refers = |n: &Node| n.symbol_id() == Some(symbol_id);
        let before = self.scene.nodes.len();
        self.scene.symbols.retain(|s| s.id != symbol_id);
        self.scene.nodes.retain(|n| !refers(n));
        for symbol in &mut self.scene.symbols {
            symbol.nodes.retain(|n| !refers(n));
        }
        log::debug!(
            "deleted symbol {symbol_id} and {} canvas instances",
            before - self.scene.nodes.len()
        );
        self.reconcile();
        self.mark_dirty("delete symbol");
        true
    }

    /// Replace an instance with plain copies of what it shows. The copies
    /// take the instance's stack slot and group membership.
    pub fn detach_instance(&mut self, instance_id: NodeId) -> Vec<NodeId> {
        let Some(pos) = self.active_nodes().iter().position(|n| n.id == instance_id) else {
            return Vec::new();
        };
        let instance = self.active_nodes()[pos].clone();
        if instance.symbol_id().is_none() {
            return Vec::new();
        }
        let mut leaves = expand_instance(&instance, &self.scene.symbols);
        for leaf in &mut leaves {
            leaf.id = self.scene.fresh_node_id();
        }
        let ids: Vec<NodeId> = leaves.iter().map(|n| n.id).collect();

        self.batch("detach", |ed| {
            let nodes = ed.active_nodes_mut();
            let tail = nodes.split_off(pos + 1);
            nodes.pop();
            nodes.extend(leaves);
            nodes.extend(tail);
            if let Some(gid) = instance.group_id {
                if let Some(group) = ed.scene.group_mut(gid) {
                    group.child_ids.retain(|id| *id != instance_id);
                    group.child_ids.extend(ids.iter().copied());
                }
            }
            ed.reconcile();
            ed.set_selection(&ids);
            ed.mark_dirty("detach");
        });
        ids
    }

    /// Edit the symbol behind a canvas instance. Node operations then
    /// target the symbol's own nodes, in its local coordinates.
    pub fn enter_symbol_edit(&mut self, instance_id: NodeId) -> bool {
        if self.selection.scope != EditScope::Canvas {
            return false;
        }
        let Some(symbol_id) = self.scene.node(instance_id).and_then(Node::symbol_id) else {
            return false;
        };
        if self.scene.symbol(symbol_id).is_none() {
            return false;
        }
        self.clear_selection();
        self.selection.scope = EditScope::Symbol {
            symbol_id,
            instance_id,
        };
        true
    }

    /// Back to the canvas with the edited instance selected.
    pub fn exit_symbol_edit(&mut self) -> bool {
        let EditScope::Symbol { instance_id, .. } = self.selection.scope else {
            return false;
        };
        self.clear_selection();
        self.selection.scope = EditScope::Canvas;
        self.select(instance_id, false);
        true
    }

    /// Leaf nodes an instance in the active list resolves to, in its
    /// parent's space. Empty for unknown ids.
    pub fn resolve_instance(&self, id: NodeId) -> Vec<Node> {
        self.active_node(id)
            .map(|n| expand_instance(n, &self.scene.symbols))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use crate::config::EditorConfig;
    use crate::editor::Editor;
    use crate::nodes::BalloonStyle;
    use crate::persistence::MemoryStore;
    use crate::schedule::ManualClock;
    use crate::selection::EditScope;
    use festoon_core::BalloonMeta;
    use pretty_assertions::assert_eq;

    fn editor() -> Editor {
        Editor::with_backends(
            EditorConfig::default(),
            Box::new(MemoryStore::new()),
            Box::new(ManualClock::new(0)),
        )
    }

    fn small() -> BalloonStyle {
        BalloonStyle {
            meta: BalloonMeta {
                radius_x: 10.0,
                radius_y: 10.0,
                ..BalloonMeta::default()
            },
            ..BalloonStyle::default()
        }
    }

    #[test]
    fn create_symbol_keeps_picture_in_place() {
        let mut ed = editor();
        let a = ed.add_balloon(100.0, 100.0, &small());
        let b = ed.add_balloon(140.0, 100.0, &small());
        ed.set_selection(&[a, b]);
        let sid = ed.create_symbol_from_selection(Some("Pair")).unwrap();

        assert_eq!(ed.scene().nodes.len(), 1);
        let instance = &ed.scene().nodes[0];
        assert_eq!(instance.symbol_id(), Some(sid));
        assert_eq!((instance.x, instance.y), (120.0, 100.0));

        let body = &ed.scene().symbol(sid).unwrap().nodes;
        assert_eq!((body[0].x, body[1].x), (-20.0, 20.0));

        let leaves = ed.resolve_instance(instance.id);
        let xs: Vec<f32> = leaves.iter().map(|n| n.x).collect();
        assert_eq!(xs, vec![100.0, 140.0]);
    }

    #[test]
    fn symbol_cannot_contain_itself() {
        let mut ed = editor();
        let a = ed.add_balloon(0.0, 0.0, &small());
        ed.set_selection(&[a]);
        let sid = ed.create_symbol_from_selection(None).unwrap();
        let instance = ed.scene().nodes[0].id;

        assert!(ed.enter_symbol_edit(instance));
        assert_eq!(ed.place_symbol(sid, 0.0, 0.0), None);
        assert_eq!(ed.active_nodes().len(), 1);

        assert!(ed.exit_symbol_edit());
        assert_eq!(ed.scope(), EditScope::Canvas);
        assert_eq!(ed.selection().ids(), &[instance]);
    }

    #[test]
    fn symbol_edit_targets_symbol_nodes() {
        let mut ed = editor();
        let a = ed.add_balloon(50.0, 50.0, &small());
        ed.set_selection(&[a]);
        let sid = ed.create_symbol_from_selection(None).unwrap();
        let instance = ed.scene().nodes[0].id;
        ed.enter_symbol_edit(instance);

        let inner = ed.add_balloon(30.0, 0.0, &small());
        assert!(ed.scene().node(inner).is_none());
        assert_eq!(ed.scene().symbol(sid).unwrap().nodes.len(), 2);
        assert_eq!(ed.resolve_instance(inner).len(), 1);
    }

    #[test]
    fn detach_replaces_instance_with_copies() {
        let mut ed = editor();
        let a = ed.add_balloon(0.0, 0.0, &small());
        let b = ed.add_balloon(40.0, 0.0, &small());
        ed.set_selection(&[a, b]);
        let sid = ed.create_symbol_from_selection(None).unwrap();
        let instance = ed.scene().nodes[0].id;
        ed.update_node(instance, &festoon_core::NodePatch::position(120.0, 0.0));

        let copies = ed.detach_instance(instance);
        assert_eq!(copies.len(), 2);
        let xs: Vec<f32> = ed.scene().nodes.iter().map(|n| n.x).collect();
        assert_eq!(xs, vec![100.0, 140.0]);
        assert_eq!(ed.selection().ids(), copies.as_slice());
        // The symbol itself stays in the library.
        assert!(ed.scene().symbol(sid).is_some());
    }

    #[test]
    fn delete_symbol_removes_instances() {
        let mut ed = editor();
        let a = ed.add_balloon(0.0, 0.0, &small());
        ed.set_selection(&[a]);
        let sid = ed.create_symbol_from_selection(None).unwrap();
        ed.place_symbol(sid, 200.0, 0.0).unwrap();
        ed.add_balloon(0.0, 0.0, &small());
        assert_eq!(ed.scene().nodes.len(), 3);
        assert!(ed.delete_symbol(sid));
        assert_eq!(ed.scene().nodes.len(), 1);
        assert!(ed.scene().symbols.is_empty());
    }
}
