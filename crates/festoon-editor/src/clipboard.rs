//! Clipboard contents and the cascading paste session.
//!
//! A copy stores each node as an offset from the top-left corner of the
//! copied selection's box, so a paste can land anywhere. Groups whose
//! members were all copied are kept as index lists into the entries.

use festoon_core::geometry::{Bounds, union_bounds};
use festoon_core::{Group, Node, NodeId, Symbol};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct ClipEntry {
    pub source_id: NodeId,
    /// Node center minus the copied box's top-left corner.
    pub dx: f32,
    pub dy: f32,
    /// Kind, style and transform to reproduce. Its id and position are
    /// not used.
    pub template: Node,
}

impl ClipEntry {
    /// Rebuild through the base constructor with a new id, then restore the
    /// copied transform, style and flags.
    pub fn instantiate(&self, id: NodeId, x: f32, y: f32) -> Node {
        let t = &self.template;
        let mut node = Node::new(id, t.kind.clone(), x, y);
        node.name.clone_from(&t.name);
        node.type_id.clone_from(&t.type_id);
        node.color.clone_from(&t.color);
        node.rotation = t.rotation;
        node.scale_x = t.scale_x;
        node.scale_y = t.scale_y;
        node.opacity = t.opacity;
        node.locked = t.locked;
        node.visible = t.visible;
        node
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClipGroup {
    pub name: String,
    /// Indices into [`Clipboard::entries`].
    pub members: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clipboard {
    pub bbox: Bounds,
    pub entries: Vec<ClipEntry>,
    pub groups: Vec<ClipGroup>,
}

impl Clipboard {
    /// Copy `nodes`. Guides are skipped; `None` when nothing is left.
    pub fn capture(nodes: &[&Node], groups: &[Group], symbols: &[Symbol]) -> Option<Self> {
        let nodes: Vec<&Node> = nodes.iter().copied().filter(|n| !n.guide).collect();
        let bbox = union_bounds(nodes.iter().copied(), symbols)?;

        let entries: Vec<ClipEntry> = nodes
            .iter()
            .map(|n| {
                let mut template = (*n).clone();
                template.group_id = None;
                ClipEntry {
                    source_id: n.id,
                    dx: n.x - bbox.x,
                    dy: n.y - bbox.y,
                    template,
                }
            })
            .collect();

        let index: HashMap<NodeId, usize> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.source_id, i))
            .collect();
        let groups = groups
            .iter()
            .filter_map(|g| {
                let members: Option<Vec<usize>> =
                    g.child_ids.iter().map(|id| index.get(id).copied()).collect();
                members
                    .filter(|m| m.len() >= 2)
                    .map(|members| ClipGroup {
                        name: g.name.clone(),
                        members,
                    })
            })
            .collect();

        Some(Self {
            bbox,
            entries,
            groups,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteMode {
    /// Paste once, one offset step from the target.
    Single,
    /// Reuse the session's base point and step further each time.
    Cascade,
}

/// State of a run of cascading pastes.
#[derive(Debug, Clone, PartialEq)]
pub struct PasteSession {
    pub active: bool,
    /// Pastes made in this session; also the next offset multiplier.
    pub count: u32,
    pub base: Option<(f32, f32)>,
    pub started_at: Option<u64>,
    pub last_paste_at: Option<u64>,
    pub timeout_ms: u64,
}

impl PasteSession {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            active: false,
            count: 0,
            base: None,
            started_at: None,
            last_paste_at: None,
            timeout_ms,
        }
    }

    /// Start a session at `base`, or just touch an open one.
    pub fn open(&mut self, base: (f32, f32), now: u64) {
        if self.active {
            self.touch(now);
            return;
        }
        self.active = true;
        self.count = 0;
        self.base = Some(base);
        self.started_at = Some(now);
        self.last_paste_at = Some(now);
        log::debug!("paste session opened at {base:?}");
    }

    pub fn touch(&mut self, now: u64) {
        self.last_paste_at = Some(now);
    }

    /// End the session when more than `timeout_ms` passed since the last
    /// paste. A zero timeout never expires.
    pub fn expire_if_idle(&mut self, now: u64) -> bool {
        if !self.active || self.timeout_ms == 0 {
            return false;
        }
        let Some(last) = self.last_paste_at else {
            return false;
        };
        if now.saturating_sub(last) > self.timeout_ms {
            log::debug!("paste session expired after {} pastes", self.count);
            self.end();
            return true;
        }
        false
    }

    pub fn end(&mut self) {
        *self = Self::new(self.timeout_ms);
    }
}
