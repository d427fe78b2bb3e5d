//! Core scene data model for Festoon designs.
//!
//! A design is a flat, ordered list of nodes (the order *is* the draw and
//! hit-test order), a set of purely logical groups referencing those nodes,
//! and a library of symbols whose nodes live in their own local coordinate
//! space. Node `x`/`y` is always the node's visual center.

use crate::color::FALLBACK_SWATCH;
use crate::id::{GroupId, NodeId, SymbolId};
use crate::stack_grid::StackGrid;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};

// ─── Constants ───────────────────────────────────────────────────────────

/// Canvas pixels per real-world centimeter.
pub const PX_PER_CM: f32 = 10.0;
pub const MIN_CANVAS_CM: f32 = 10.0;
pub const MAX_CANVAS_CM: f32 = 500.0;
pub const MIN_DISPLAY_SCALE: f32 = 0.3;
pub const MAX_DISPLAY_SCALE: f32 = 1.5;
pub const DEFAULT_DISPLAY_SCALE: f32 = 1.0;
pub const MIN_VIEW_SCALE: f32 = 0.2;
pub const MAX_VIEW_SCALE: f32 = 4.0;

/// Catalog type assigned when none is given.
pub const DEFAULT_TYPE_ID: &str = "round-11";

/// Opacity given to generator-produced guide placeholders.
pub const GUIDE_OPACITY: f32 = 0.35;

// ─── Node meta ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalloonShape {
    #[default]
    Ellipse,
    Round,
    Heart,
}

impl BalloonShape {
    pub fn from_name(name: &str) -> Self {
        match name {
            "round" => Self::Round,
            "heart" => Self::Heart,
            _ => Self::Ellipse,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ellipse => "ellipse",
            Self::Round => "round",
            Self::Heart => "heart",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BalloonMeta {
    pub radius_x: f32,
    pub radius_y: f32,
    pub knot: bool,
    pub shape: BalloonShape,
}

impl Default for BalloonMeta {
    fn default() -> Self {
        Self {
            radius_x: 46.0,
            radius_y: 60.0,
            knot: true,
            shape: BalloonShape::Ellipse,
        }
    }
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

impl TextAlign {
    pub fn from_name(name: &str) -> Self {
        match name {
            "left" => Self::Left,
            "right" => Self::Right,
            _ => Self::Center,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMeta {
    pub text: String,
    pub font: String,
    pub size: f32,
    pub align: TextAlign,
}

impl Default for TextMeta {
    fn default() -> Self {
        Self {
            text: "Texto".into(),
            font: "Inter".into(),
            size: 24.0,
            align: TextAlign::Center,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMeta {
    pub src: String,
    pub width: f32,
    pub height: f32,
}

impl Default for ImageMeta {
    fn default() -> Self {
        Self {
            src: String::new(),
            width: 120.0,
            height: 120.0,
        }
    }
}

// ─── Nodes ───────────────────────────────────────────────────────────────

/// What a node is, with only the fields that kind needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Balloon(BalloonMeta),
    Text(TextMeta),
    Image(ImageMeta),
    /// Visual resolved through the referenced symbol definition.
    SymbolInstance { symbol_id: SymbolId },
}

impl NodeKind {
    /// Wire name used by the design document.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Balloon(_) => "balloon",
            Self::Text(_) => "text",
            Self::Image(_) => "image",
            Self::SymbolInstance { .. } => "symbol",
        }
    }
}

/// A placed element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    /// Catalog type (e.g. `round-11`), used for material counts.
    pub type_id: String,
    pub x: f32,
    pub y: f32,
    /// Degrees.
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub opacity: f32,
    pub color: String,
    pub locked: bool,
    pub visible: bool,
    /// Generator placeholder: never selectable, never counted as material.
    pub guide: bool,
    pub z_index: usize,
    /// Back-reference kept in sync by [`Scene::reconcile_groups`].
    pub group_id: Option<GroupId>,
    pub kind: NodeKind,
}

impl Node {
    /// Base constructor every insertion path goes through.
    pub fn new(id: NodeId, kind: NodeKind, x: f32, y: f32) -> Self {
        Self {
            id,
            name: String::new(),
            type_id: DEFAULT_TYPE_ID.to_string(),
            x,
            y,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            opacity: 1.0,
            color: FALLBACK_SWATCH.to_string(),
            locked: false,
            visible: true,
            guide: false,
            z_index: 0,
            group_id: None,
            kind,
        }
    }

    pub fn balloon(id: NodeId, x: f32, y: f32, meta: BalloonMeta) -> Self {
        Self::new(id, NodeKind::Balloon(meta), x, y)
    }

    pub fn text(id: NodeId, x: f32, y: f32, meta: TextMeta) -> Self {
        let mut node = Self::new(id, NodeKind::Text(meta), x, y);
        node.color = "#111111".into();
        node.type_id = "text".into();
        node
    }

    pub fn image(id: NodeId, x: f32, y: f32, meta: ImageMeta) -> Self {
        let mut node = Self::new(id, NodeKind::Image(meta), x, y);
        node.color = "#ffffff".into();
        node.type_id = "image".into();
        node
    }

    pub fn instance(id: NodeId, x: f32, y: f32, symbol_id: SymbolId) -> Self {
        let mut node = Self::new(id, NodeKind::SymbolInstance { symbol_id }, x, y);
        node.type_id = "symbol".into();
        node
    }

    pub fn is_guide(&self) -> bool {
        self.guide
    }

    /// Guides are unselectable in every scope.
    pub fn is_selectable(&self) -> bool {
        !self.guide
    }

    pub fn symbol_id(&self) -> Option<SymbolId> {
        match self.kind {
            NodeKind::SymbolInstance { symbol_id } => Some(symbol_id),
            _ => None,
        }
    }

    pub fn balloon_meta(&self) -> Option<&BalloonMeta> {
        match &self.kind {
            NodeKind::Balloon(meta) => Some(meta),
            _ => None,
        }
    }

    /// Convert to another kind. Transform, style, and flags survive;
    /// the old meta is dropped rather than merged.
    pub fn retype(&mut self, kind: NodeKind) {
        self.kind = kind;
    }
}

/// Field-level edit applied by `update_node`. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    pub name: Option<String>,
    pub type_id: Option<String>,
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub rotation: Option<f32>,
    pub scale_x: Option<f32>,
    pub scale_y: Option<f32>,
    pub opacity: Option<f32>,
    pub color: Option<String>,
    pub locked: Option<bool>,
    pub visible: Option<bool>,
    pub kind: Option<NodeKind>,
}

impl NodePatch {
    pub fn position(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    /// Apply to `node`, returning whether anything actually changed.
    /// Non-finite numbers are ignored and opacity is clamped to `[0, 1]`.
    pub fn apply(&self, node: &mut Node) -> bool {
        let before = node.clone();
        if let Some(name) = &self.name {
            node.name.clone_from(name);
        }
        if let Some(type_id) = &self.type_id {
            node.type_id.clone_from(type_id);
        }
        set_finite(&mut node.x, self.x);
        set_finite(&mut node.y, self.y);
        set_finite(&mut node.rotation, self.rotation);
        set_finite(&mut node.scale_x, self.scale_x);
        set_finite(&mut node.scale_y, self.scale_y);
        if let Some(opacity) = self.opacity.filter(|o| o.is_finite()) {
            node.opacity = opacity.clamp(0.0, 1.0);
        }
        if let Some(color) = &self.color {
            node.color = crate::color::normalize_or_fallback(color);
        }
        if let Some(locked) = self.locked {
            node.locked = locked;
        }
        if let Some(visible) = self.visible {
            node.visible = visible;
        }
        if let Some(kind) = &self.kind {
            node.retype(kind.clone());
        }
        *node != before
    }
}

fn set_finite(slot: &mut f32, value: Option<f32>) {
    if let Some(v) = value.filter(|v| v.is_finite()) {
        *slot = v;
    }
}

// ─── Groups & symbols ────────────────────────────────────────────────────

/// A named, purely logical aggregation of canvas nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub child_ids: SmallVec<[NodeId; 4]>,
}

impl Group {
    pub fn new(
        id: GroupId,
        name: impl Into<String>,
        child_ids: impl IntoIterator<Item = NodeId>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            child_ids: child_ids.into_iter().collect(),
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.child_ids.contains(&id)
    }
}

/// A reusable collection of nodes in local coordinates (offsets from the
/// symbol origin).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub nodes: Vec<Node>,
}

// ─── View, settings, canvas ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

impl Default for View {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
        }
    }
}

impl View {
    /// Build a view, dropping non-finite components and clamping scale.
    pub fn clamped(x: f32, y: f32, scale: f32) -> Self {
        let d = Self::default();
        Self {
            x: if x.is_finite() { x } else { d.x },
            y: if y.is_finite() { y } else { d.y },
            scale: if scale.is_finite() {
                scale.clamp(MIN_VIEW_SCALE, MAX_VIEW_SCALE)
            } else {
                d.scale
            },
        }
    }
}

/// Which snap features win when several guides are in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GuidePriority {
    #[default]
    CenterFirst,
    EdgesFirst,
}

impl GuidePriority {
    pub fn from_name(name: &str) -> Self {
        match name {
            "edges-first" => Self::EdgesFirst,
            _ => Self::CenterFirst,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CenterFirst => "center-first",
            Self::EdgesFirst => "edges-first",
        }
    }
}

/// Persisted editor toggles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub grid: bool,
    /// Snap to the `snap_step` grid.
    pub snap: bool,
    pub snap_step: f32,
    /// Snap to guides from other nodes and the canvas.
    pub snap_guides: bool,
    /// Canvas pixels.
    pub snap_tolerance: f32,
    pub snap_guide_priority: GuidePriority,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            grid: true,
            snap: false,
            snap_step: 10.0,
            snap_guides: true,
            snap_tolerance: 8.0,
            snap_guide_priority: GuidePriority::CenterFirst,
        }
    }
}

/// Physical canvas description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasSettings {
    pub width_cm: f32,
    pub height_cm: f32,
    pub offset_x_cm: f32,
    pub offset_y_cm: f32,
    pub lock_ratio: bool,
    pub background_color: String,
    pub display_scale: f32,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            width_cm: 160.0,
            height_cm: 90.0,
            offset_x_cm: 0.0,
            offset_y_cm: 0.0,
            lock_ratio: true,
            background_color: "#ffffff".into(),
            display_scale: DEFAULT_DISPLAY_SCALE,
        }
    }
}

fn clamp_cm(v: f32) -> f32 {
    v.clamp(MIN_CANVAS_CM, MAX_CANVAS_CM)
}

impl CanvasSettings {
    /// Set the width; with `lock_ratio` the height follows proportionally.
    pub fn set_width(&mut self, width_cm: f32) -> bool {
        if !width_cm.is_finite() {
            return false;
        }
        let before = (self.width_cm, self.height_cm);
        let width = clamp_cm(width_cm);
        if self.lock_ratio && self.width_cm > 0.0 {
            let ratio = self.height_cm / self.width_cm;
            self.height_cm = clamp_cm(width * ratio);
        }
        self.width_cm = width;
        before != (self.width_cm, self.height_cm)
    }

    /// Set the height; with `lock_ratio` the width follows proportionally.
    pub fn set_height(&mut self, height_cm: f32) -> bool {
        if !height_cm.is_finite() {
            return false;
        }
        let before = (self.width_cm, self.height_cm);
        let height = clamp_cm(height_cm);
        if self.lock_ratio && self.height_cm > 0.0 {
            let ratio = self.width_cm / self.height_cm;
            self.width_cm = clamp_cm(height * ratio);
        }
        self.height_cm = height;
        before != (self.width_cm, self.height_cm)
    }

    /// Set either or both dimensions. When both are given the ratio lock
    /// is bypassed.
    pub fn set_size(&mut self, width_cm: Option<f32>, height_cm: Option<f32>) -> bool {
        match (width_cm, height_cm) {
            (Some(w), Some(h)) => {
                if !w.is_finite() || !h.is_finite() {
                    return false;
                }
                let next = (clamp_cm(w), clamp_cm(h));
                let changed = next != (self.width_cm, self.height_cm);
                (self.width_cm, self.height_cm) = next;
                changed
            }
            (Some(w), None) => self.set_width(w),
            (None, Some(h)) => self.set_height(h),
            (None, None) => false,
        }
    }

    pub fn set_display_scale(&mut self, scale: f32) -> bool {
        if !scale.is_finite() {
            return false;
        }
        let next = scale.clamp(MIN_DISPLAY_SCALE, MAX_DISPLAY_SCALE);
        let changed = next != self.display_scale;
        self.display_scale = next;
        changed
    }

    /// Re-apply every clamp (used after import).
    pub fn clamp_all(&mut self) {
        let d = Self::default();
        self.width_cm = if self.width_cm.is_finite() {
            clamp_cm(self.width_cm)
        } else {
            d.width_cm
        };
        self.height_cm = if self.height_cm.is_finite() {
            clamp_cm(self.height_cm)
        } else {
            d.height_cm
        };
        if !self.offset_x_cm.is_finite() {
            self.offset_x_cm = 0.0;
        }
        if !self.offset_y_cm.is_finite() {
            self.offset_y_cm = 0.0;
        }
        self.display_scale = if self.display_scale.is_finite() {
            self.display_scale.clamp(MIN_DISPLAY_SCALE, MAX_DISPLAY_SCALE)
        } else {
            d.display_scale
        };
    }

    /// Canvas size in canvas pixels.
    pub fn pixel_size(&self) -> (f32, f32) {
        (self.width_cm * PX_PER_CM, self.height_cm * PX_PER_CM)
    }
}

// ─── Scene ───────────────────────────────────────────────────────────────

/// What [`Scene::reconcile_groups`] had to fix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub pruned_members: usize,
    pub dropped_groups: usize,
    pub fixed_backlinks: usize,
    pub reminted_groups: usize,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// The complete editable state of a design.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Scene {
    /// Back-to-front draw order.
    pub nodes: Vec<Node>,
    pub groups: Vec<Group>,
    pub symbols: Vec<Symbol>,
    pub view: View,
    pub settings: Settings,
    pub canvas: CanvasSettings,
    pub stack_grid: StackGrid,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn group_mut(&mut self, id: GroupId) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| g.id == id)
    }

    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.id == id)
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> Option<&mut Symbol> {
        self.symbols.iter_mut().find(|s| s.id == id)
    }

    /// The group that lists `node`, if any.
    pub fn group_of(&self, node: NodeId) -> Option<&Group> {
        self.groups.iter().find(|g| g.contains(node))
    }

    /// True if any node anywhere (canvas or symbol bodies) uses this id.
    pub fn id_in_use(&self, id: NodeId) -> bool {
        self.contains_node(id)
            || self
                .symbols
                .iter()
                .any(|s| s.nodes.iter().any(|n| n.id == id))
    }

    /// A generated node id no node in this scene uses yet.
    pub fn fresh_node_id(&self) -> NodeId {
        loop {
            let id = NodeId::fresh();
            if !self.id_in_use(id) {
                return id;
            }
        }
    }

    /// A generated group id not held by any group in this scene.
    ///
    /// The id counter restarts with the process, so ids loaded from an
    /// earlier session can already carry the next generated name.
    pub fn fresh_group_id(&self) -> GroupId {
        loop {
            let id = GroupId::fresh();
            if self.group(id).is_none() {
                return id;
            }
        }
    }

    /// A generated symbol id not held by any symbol in this scene.
    pub fn fresh_symbol_id(&self) -> SymbolId {
        loop {
            let id = SymbolId::fresh();
            if self.symbol(id).is_none() {
                return id;
            }
        }
    }

    pub fn visible_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.visible)
    }

    /// Make `z_index` the dense 0..N-1 permutation matching array order,
    /// for the canvas and every symbol body.
    pub fn reindex_z(&mut self) {
        crate::zorder::reindex(&mut self.nodes);
        for symbol in &mut self.symbols {
            crate::zorder::reindex(&mut symbol.nodes);
        }
    }

    /// The one place group membership is repaired.
    ///
    /// A group repeating an earlier group's id gets a fresh one. Members
    /// that no longer resolve are dropped, a node listed by several groups
    /// stays with the first, groups left with fewer than two members are
    /// removed, and every node's `group_id` is rewritten from the surviving
    /// groups.
    pub fn reconcile_groups(&mut self) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let mut group_ids = HashSet::new();
        for i in 0..self.groups.len() {
            if !group_ids.insert(self.groups[i].id) {
                let id = self.fresh_group_id();
                log::debug!("group id {} repeated, re-minted as {id}", self.groups[i].id);
                self.groups[i].id = id;
                group_ids.insert(id);
                report.reminted_groups += 1;
            }
        }

        let existing: HashSet<NodeId> = self.nodes.iter().map(|n| n.id).collect();

        for group in &mut self.groups {
            let mut seen = HashSet::new();
            let before = group.child_ids.len();
            group
                .child_ids
                .retain(|id| existing.contains(id) && seen.insert(*id));
            report.pruned_members += before - group.child_ids.len();
        }
        report.dropped_groups += drop_small_groups(&mut self.groups);

        let mut claimed = HashSet::new();
        for group in &mut self.groups {
            let before = group.child_ids.len();
            group.child_ids.retain(|id| claimed.insert(*id));
            report.pruned_members += before - group.child_ids.len();
        }
        report.dropped_groups += drop_small_groups(&mut self.groups);

        let owner: HashMap<NodeId, GroupId> = self
            .groups
            .iter()
            .flat_map(|g| g.child_ids.iter().map(move |id| (*id, g.id)))
            .collect();
        for node in &mut self.nodes {
            let expected = owner.get(&node.id).copied();
            if node.group_id != expected {
                node.group_id = expected;
                report.fixed_backlinks += 1;
            }
        }
        for symbol in &mut self.symbols {
            for node in &mut symbol.nodes {
                if node.group_id.take().is_some() {
                    report.fixed_backlinks += 1;
                }
            }
        }

        if !report.is_clean() {
            log::debug!("reconciled groups: {report:?}");
        }
        report
    }

    /// Deterministic binary encoding of the whole scene. Two scenes with
    /// equal fingerprints are observably identical.
    pub fn fingerprint(&self) -> Vec<u8> {
        rmp_serde::to_vec(self).unwrap_or_default()
    }
}

fn drop_small_groups(groups: &mut Vec<Group>) -> usize {
    let before = groups.len();
    groups.retain(|g| g.child_ids.len() >= 2);
    before - groups.len()
}
