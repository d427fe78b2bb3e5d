//! Selection state and edit scope.

use festoon_core::{GroupId, NodeId, SymbolId};
use std::collections::HashSet;

/// Which node list selection (and node edits) currently address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditScope {
    #[default]
    Canvas,
    /// Only members of this group are selectable.
    Group(GroupId),
    /// Selection and node edits target the symbol's own nodes.
    Symbol {
        symbol_id: SymbolId,
        instance_id: NodeId,
    },
}

/// Ordered, duplicate-free set of selected ids plus the last-touched one.
///
/// This type does not know which ids are valid; the editor filters before
/// calling in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<NodeId>,
    primary: Option<NodeId>,
    /// Group highlighted at the canvas level (set by group selection).
    pub active_group: Option<GroupId>,
    pub scope: EditScope,
}

impl Selection {
    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub fn primary(&self) -> Option<NodeId> {
        self.primary
    }

    pub fn id_set(&self) -> HashSet<NodeId> {
        self.ids.iter().copied().collect()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.ids.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Select `id`, replacing the selection unless `append`.
    pub fn select(&mut self, id: NodeId, append: bool) {
        if !append {
            self.ids.clear();
        }
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
        self.primary = Some(id);
    }

    /// Add or remove `id`; primary becomes the last remaining id.
    pub fn toggle(&mut self, id: NodeId) {
        if let Some(pos) = self.ids.iter().position(|x| *x == id) {
            self.ids.remove(pos);
        } else {
            self.ids.push(id);
        }
        self.primary = self.ids.last().copied();
    }

    /// Replace with `ids` (deduplicated, order kept).
    pub fn set(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        self.ids.clear();
        self.extend(ids);
        self.primary = self.ids.last().copied();
    }

    pub fn extend(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        for id in ids {
            if !self.ids.contains(&id) {
                self.ids.push(id);
            }
        }
        self.primary = self.ids.last().copied();
    }

    /// Clear selected ids and the highlighted group. The scope stays.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.primary = None;
        self.active_group = None;
    }

    /// Keep only ids passing `keep`. Primary falls back to the last kept id.
    pub fn retain(&mut self, mut keep: impl FnMut(NodeId) -> bool) -> bool {
        let before = self.ids.len();
        self.ids.retain(|id| keep(*id));
        if self.primary.is_some_and(|p| !self.ids.contains(&p)) {
            self.primary = self.ids.last().copied();
        }
        before != self.ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> NodeId {
        NodeId::intern(s)
    }

    #[test]
    fn select_replace_and_append() {
        let mut sel = Selection::default();
        sel.select(id("sel_a"), false);
        sel.select(id("sel_b"), true);
        sel.select(id("sel_a"), true);
        assert_eq!(sel.ids(), &[id("sel_a"), id("sel_b")]);
        assert_eq!(sel.primary(), Some(id("sel_a")));
        sel.select(id("sel_c"), false);
        assert_eq!(sel.ids(), &[id("sel_c")]);
    }

    #[test]
    fn toggle_updates_primary() {
        let mut sel = Selection::default();
        sel.set([id("tg_a"), id("tg_b")]);
        sel.toggle(id("tg_b"));
        assert_eq!(sel.primary(), Some(id("tg_a")));
        sel.toggle(id("tg_a"));
        assert!(sel.is_empty());
        assert_eq!(sel.primary(), None);
    }

    #[test]
    fn retain_reports_change() {
        let mut sel = Selection::default();
        sel.set([id("rt_a"), id("rt_b")]);
        assert!(sel.retain(|x| x == id("rt_a")));
        assert_eq!(sel.primary(), Some(id("rt_a")));
        assert!(!sel.retain(|_| true));
    }
}
