//! Copy, cut, paste and duplicate.

use crate::clipboard::{Clipboard, PasteMode};
use crate::editor::Editor;
use crate::selection::EditScope;
use festoon_core::{Group, NodeId};

/// Upper bound for one duplicate-many call.
pub const MAX_DUPLICATES: usize = 200;

impl Editor {
    fn capture_selection(&self) -> Option<Clipboard> {
        let nodes = self.selected_nodes();
        let groups: &[Group] = match self.selection.scope {
            EditScope::Symbol { .. } => &[],
            _ => &self.scene.groups,
        };
        Clipboard::capture(&nodes, groups, &self.scene.symbols)
    }

    /// Copy the selection. A new copy starts a new cascade.
    pub fn copy_selected(&mut self) -> bool {
        let Some(clip) = self.capture_selection() else {
            return false;
        };
        log::debug!("copied {} nodes", clip.len());
        self.clipboard = Some(clip);
        self.paste_session.end();
        true
    }

    pub fn cut_selected(&mut self) -> bool {
        if !self.copy_selected() {
            return false;
        }
        self.batch("cut", |ed| ed.delete_selected());
        true
    }

    /// Paste the clipboard.
    ///
    /// `Cascade` reuses the open session's base point (or opens one at
    /// `target`, falling back to the configured default point) and shifts
    /// each paste one more offset step. `Single` pastes once, one offset
    /// step from `target`.
    pub fn paste(&mut self, target: Option<(f32, f32)>, mode: PasteMode) -> Vec<NodeId> {
        let Some(clip) = self.clipboard.clone() else {
            return Vec::new();
        };
        let now = self.now();
        let step = self.config.paste_offset;
        let fallback = self.config.default_paste_point;

        let (x, y) = match mode {
            PasteMode::Cascade => {
                self.paste_session.expire_if_idle(now);
                self.paste_session.open(target.unwrap_or(fallback), now);
                let (bx, by) = self.paste_session.base.unwrap_or(fallback);
                let offset = step * self.paste_session.count as f32;
                self.paste_session.count += 1;
                (bx + offset, by + offset)
            }
            PasteMode::Single => {
                if self.paste_session.active {
                    self.paste_session.touch(now);
                }
                let (bx, by) = target.unwrap_or(fallback);
                (bx + step, by + step)
            }
        };
        self.batch("paste", |ed| ed.paste_clip(&clip, x, y))
    }

    /// Instantiate `clip` with its box's top-left at (`x`, `y`). Groups
    /// are recreated at canvas level only.
    fn paste_clip(&mut self, clip: &Clipboard, x: f32, y: f32) -> Vec<NodeId> {
        let mut placed: Vec<Option<NodeId>> = Vec::with_capacity(clip.len());
        for entry in &clip.entries {
            if let Some(symbol_id) = entry.template.symbol_id() {
                if !self.can_place_instance(symbol_id) {
                    log::warn!("skipped pasting instance of {symbol_id}");
                    placed.push(None);
                    continue;
                }
            }
            let node = entry.instantiate(NodeId::fresh(), x + entry.dx, y + entry.dy);
            placed.push(Some(self.push_node(node)));
        }

        if !matches!(self.selection.scope, EditScope::Symbol { .. }) {
            for group in &clip.groups {
                let members: Vec<NodeId> = group
                    .members
                    .iter()
                    .filter_map(|i| placed.get(*i).copied().flatten())
                    .collect();
                if members.len() >= 2 {
                    let gid = self.scene.fresh_group_id();
                    self.scene
                        .groups
                        .push(Group::new(gid, group.name.clone(), members));
                }
            }
        }

        let ids: Vec<NodeId> = placed.into_iter().flatten().collect();
        if ids.is_empty() {
            return ids;
        }
        self.reconcile();
        self.set_selection(&ids);
        self.mark_dirty("paste");
        ids
    }

    /// Copy the selection in place, shifted by `offset` (default: the
    /// paste offset) from the original. The clipboard is left alone.
    pub fn duplicate_selected(&mut self, offset: Option<f32>) -> Vec<NodeId> {
        let Some(clip) = self.capture_selection() else {
            return Vec::new();
        };
        let offset = offset
            .filter(|o| o.is_finite())
            .unwrap_or(self.config.paste_offset);
        self.batch("duplicate", |ed| {
            ed.paste_clip(&clip, clip.bbox.x + offset, clip.bbox.y + offset)
        })
    }

    /// `count` copies (clamped to `1..=200`), copy `k` shifted by
    /// `k * (step_x, step_y)`, or all stacked on the original when
    /// `in_place`. Everything created ends up selected.
    pub fn duplicate_selected_many(
        &mut self,
        count: usize,
        step_x: f32,
        step_y: f32,
        in_place: bool,
    ) -> Vec<NodeId> {
        let Some(clip) = self.capture_selection() else {
            return Vec::new();
        };
        let count = count.clamp(1, MAX_DUPLICATES);
        let (sx, sy) = if in_place || !step_x.is_finite() || !step_y.is_finite() {
            (0.0, 0.0)
        } else {
            (step_x, step_y)
        };
        self.batch("duplicate", |ed| {
            let mut all = Vec::new();
            for k in 1..=count {
                let k = k as f32;
                all.extend(ed.paste_clip(&clip, clip.bbox.x + k * sx, clip.bbox.y + k * sy));
            }
            ed.set_selection(&all);
            all
        })
    }

    pub fn end_paste_session(&mut self) {
        self.paste_session.end();
    }

    /// Expire an idle paste session. Returns whether it ended.
    pub fn tick_paste_session(&mut self) -> bool {
        let now = self.now();
        self.paste_session.expire_if_idle(now)
    }
}
