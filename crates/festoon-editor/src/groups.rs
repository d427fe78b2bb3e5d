//! Grouping and group edit mode.

use crate::editor::Editor;
use crate::selection::EditScope;
use festoon_core::{Group, GroupId, NodeId, zorder};
use std::collections::HashSet;

impl Editor {
    /// Group the unlocked selected canvas nodes. Needs two. Members are
    /// taken out of any group they were in before.
    pub fn group_selection(&mut self, name: Option<&str>) -> Option<GroupId> {
        if self.selection.scope != EditScope::Canvas {
            return None;
        }
        let ids: Vec<NodeId> = self
            .selected_nodes()
            .iter()
            .filter(|n| !n.locked)
            .map(|n| n.id)
            .collect();
        if ids.len() < 2 {
            return None;
        }
        let gid = self.scene.fresh_group_id();
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Group {}", self.scene.groups.len() + 1));

        self.batch("group", |ed| {
            for group in &mut ed.scene.groups {
                group.child_ids.retain(|id| !ids.contains(id));
            }
            ed.scene.groups.push(Group::new(gid, name, ids.iter().copied()));
            ed.reconcile();
            ed.selection.set(ids.iter().copied());
            ed.selection.active_group = Some(gid);
            ed.mark_dirty("group");
        });
        let members = self.scene.group(gid).map_or(0, |g| g.child_ids.len());
        log::debug!("grouped {members} nodes as {gid}");
        Some(gid)
    }

    /// Take the selected nodes out of their groups. Groups left with fewer
    /// than two members disappear.
    pub fn ungroup_selection(&mut self) -> bool {
        if matches!(self.selection.scope, EditScope::Symbol { .. }) {
            return false;
        }
        let selected = self.selection.id_set();
        let mut touched = false;
        for group in &mut self.scene.groups {
            let before = group.child_ids.len();
            group.child_ids.retain(|id| !selected.contains(id));
            touched |= before != group.child_ids.len();
        }
        if !touched {
            return false;
        }
        self.reconcile();
        self.selection.active_group = None;
        self.mark_dirty("ungroup");
        true
    }

    /// Select every member of a group and mark it active.
    pub fn select_group(&mut self, gid: GroupId) -> bool {
        if self.selection.scope != EditScope::Canvas {
            return false;
        }
        let Some(group) = self.scene.group(gid) else {
            return false;
        };
        let members: Vec<NodeId> = group
            .child_ids
            .iter()
            .copied()
            .filter(|id| self.is_selectable(*id))
            .collect();
        self.selection.set(members);
        self.selection.active_group = Some(gid);
        true
    }

    /// Select `id`; at canvas level a grouped node selects its whole group.
    pub fn pick(&mut self, id: NodeId, append: bool) -> bool {
        if self.selection.scope == EditScope::Canvas && !append {
            if let Some(gid) = self.scene.group_of(id).map(|g| g.id) {
                return self.select_group(gid);
            }
        }
        self.select(id, append)
    }

    pub fn rename_group(&mut self, gid: GroupId, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let Some(group) = self.scene.group_mut(gid) else {
            return false;
        };
        if group.name == name {
            return false;
        }
        group.name = name.to_string();
        self.mark_dirty("rename group");
        true
    }

    /// Restrict selection to one group's members.
    pub fn enter_group_edit(&mut self, gid: GroupId) -> bool {
        if self.selection.scope != EditScope::Canvas || self.scene.group(gid).is_none() {
            return false;
        }
        self.selection.clear();
        self.selection.scope = EditScope::Group(gid);
        self.selection.active_group = Some(gid);
        true
    }

    /// Back to canvas scope with the group selected as a whole.
    pub fn exit_group_edit(&mut self) -> bool {
        let EditScope::Group(gid) = self.selection.scope else {
            return false;
        };
        self.selection.scope = EditScope::Canvas;
        self.selection.clear();
        self.select_group(gid);
        true
    }

    /// Re-stack a group's members front to back. Members missing from
    /// `front_to_back` keep their relative order behind the listed ones;
    /// ids that are not members are ignored.
    pub fn reorder_group_children(&mut self, gid: GroupId, front_to_back: &[NodeId]) -> bool {
        let Some(group) = self.scene.group(gid) else {
            return false;
        };
        let mut seen = HashSet::new();
        let mut order: Vec<NodeId> = front_to_back
            .iter()
            .copied()
            .filter(|id| group.contains(*id) && seen.insert(*id))
            .collect();
        order.extend(group.child_ids.iter().copied().filter(|id| seen.insert(*id)));

        let listed_changed = group.child_ids.as_slice() != order.as_slice();
        let restacked = zorder::reorder_group_block(&mut self.scene.nodes, &order);
        if !listed_changed && !restacked {
            return false;
        }
        if let Some(group) = self.scene.group_mut(gid) {
            group.child_ids = order.into_iter().collect();
        }
        zorder::reindex(&mut self.scene.nodes);
        self.mark_dirty("reorder group");
        true
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
    use pretty_assertions::assert_eq;

    fn editor() -> Editor {
        Editor::with_backends(
            EditorConfig::default(),
            Box::new(MemoryStore::new()),
            Box::new(ManualClock::new(0)),
        )
    }

    #[test]
    fn group_needs_two_unlocked_nodes() {
        let mut ed = editor();
        let a = ed.add_balloon(0.0, 0.0, &BalloonStyle::default());
        let b = ed.add_balloon(10.0, 0.0, &BalloonStyle::default());
        ed.toggle_lock(b);
        ed.set_selection(&[a, b]);
        assert_eq!(ed.group_selection(None), None);
        ed.toggle_lock(b);
        let gid = ed.group_selection(None).unwrap();
        assert_eq!(ed.scene().group(gid).unwrap().name, "Group 1");
        assert_eq!(ed.scene().node(a).unwrap().group_id, Some(gid));
    }

    #[test]
    fn regrouping_moves_members() {
        let mut ed = editor();
        let ids: Vec<_> = (0..3)
            .map(|i| ed.add_balloon(i as f32 * 10.0, 0.0, &BalloonStyle::default()))
            .collect();
        ed.set_selection(&ids[..2]);
        let first = ed.group_selection(Some("first")).unwrap();
        ed.set_selection(&ids[1..]);
        let second = ed.group_selection(Some("second")).unwrap();
        // `first` lost a member and fell below two, so it is gone.
        assert!(ed.scene().group(first).is_none());
        assert_eq!(ed.scene().node(ids[1]).unwrap().group_id, Some(second));
        assert_eq!(ed.scene().node(ids[0]).unwrap().group_id, None);
    }

    #[test]
    fn group_scope_limits_selection() {
        let mut ed = editor();
        let a = ed.add_balloon(0.0, 0.0, &BalloonStyle::default());
        let b = ed.add_balloon(10.0, 0.0, &BalloonStyle::default());
        let outside = ed.add_balloon(20.0, 0.0, &BalloonStyle::default());
        ed.set_selection(&[a, b]);
        let gid = ed.group_selection(None).unwrap();

        assert!(ed.enter_group_edit(gid));
        assert!(!ed.select(outside, false));
        assert!(ed.select(a, false));
        assert_eq!(ed.selection().ids(), &[a]);

        assert!(ed.exit_group_edit());
        assert_eq!(ed.scope(), EditScope::Canvas);
        assert_eq!(ed.selection().ids(), &[a, b]);
        assert_eq!(ed.selection().active_group, Some(gid));
    }

    #[test]
    fn ungroup_dissolves_group() {
        let mut ed = editor();
        let a = ed.add_balloon(0.0, 0.0, &BalloonStyle::default());
        let b = ed.add_balloon(10.0, 0.0, &BalloonStyle::default());
        ed.set_selection(&[a, b]);
        ed.group_selection(None).unwrap();
        ed.set_selection(&[a]);
        assert!(ed.ungroup_selection());
        assert!(ed.scene().groups.is_empty());
        assert_eq!(ed.scene().node(b).unwrap().group_id, None);
    }

    #[test]
    fn pick_selects_whole_group() {
        let mut ed = editor();
        let a = ed.add_balloon(0.0, 0.0, &BalloonStyle::default());
        let b = ed.add_balloon(10.0, 0.0, &BalloonStyle::default());
        ed.set_selection(&[a, b]);
        let gid = ed.group_selection(None).unwrap();
        ed.clear_selection();
        assert!(ed.pick(b, false));
        assert_eq!(ed.selection().ids(), &[a, b]);
        assert_eq!(ed.selection().active_group, Some(gid));
    }

    #[test]
    fn reorder_children_restacks_block() {
        let mut ed = editor();
        let a = ed.add_balloon(0.0, 0.0, &BalloonStyle::default());
        let b = ed.add_balloon(10.0, 0.0, &BalloonStyle::default());
        let c = ed.add_balloon(20.0, 0.0, &BalloonStyle::default());
        ed.set_selection(&[a, b]);
        let gid = ed.group_selection(None).unwrap();
        // Front to back: a over b.
        assert!(ed.reorder_group_children(gid, &[a, b]));
        let order: Vec<_> = ed.scene().nodes.iter().map(|n| n.id).collect();
        assert_eq!(order, vec![b, a, c]);
        assert!(!ed.reorder_group_children(gid, &[a, b]));
    }
}
