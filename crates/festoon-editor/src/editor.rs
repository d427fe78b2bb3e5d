//! The editing service: owns the scene and every piece of interaction
//! state around it.
//!
//! Mutators are the only way to change the scene. Each one that changes
//! something calls [`Editor::mark_dirty`] once, which schedules both the
//! debounced history commit and the debounced autosave. Multi-step
//! operations run inside [`Editor::batch`] so they land as one undo entry.
//!
//! Node operations live in sibling modules (`nodes`, `groups`, `instances`,
//! `paste`, `stack`) as further `impl Editor` blocks.

use crate::clipboard::{Clipboard, PasteSession};
use crate::config::EditorConfig;
use crate::history::{History, HistoryMode, Snapshot};
use crate::persistence::{Autosave, KeyValueStore, MemoryStore, StorageError};
use crate::render::{ExportOptions, RenderError, Renderer};
use crate::schedule::{Clock, SystemClock};
use crate::selection::{EditScope, Selection};
use festoon_core::document::{export_document, export_string, import_document};
use festoon_core::materials::{
    Catalog, MaterialFilter, MaterialSummary, MaterialsExport, compute_materials,
};
use festoon_core::{
    Bounds, GuidePriority, ImportError, MAX_VIEW_SCALE, MIN_VIEW_SCALE, Node, NodeId, Scene,
    Settings, View, color,
};
use serde_json::Value;

pub struct Editor {
    pub(crate) config: EditorConfig,
    pub(crate) scene: Scene,
    pub(crate) selection: Selection,
    pub(crate) history: History,
    pub(crate) autosave: Autosave,
    pub(crate) clipboard: Option<Clipboard>,
    pub(crate) paste_session: PasteSession,
    store: Box<dyn KeyValueStore>,
    clock: Box<dyn Clock>,
}

impl Editor {
    /// Editor with wall-clock time and an in-memory store.
    pub fn new(config: EditorConfig) -> Self {
        Self::with_backends(config, Box::new(MemoryStore::new()), Box::new(SystemClock))
    }

    pub fn with_backends(
        config: EditorConfig,
        store: Box<dyn KeyValueStore>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let scene = Scene::new();
        let mut history = History::new(config.history_max, config.history_debounce_ms);
        history.reset(&scene, clock.now_ms());
        Self {
            autosave: Autosave::new(config.autosave_debounce_ms),
            paste_session: PasteSession::new(config.paste_timeout_ms),
            clipboard: None,
            selection: Selection::default(),
            config,
            scene,
            history,
            store,
            clock,
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn scope(&self) -> EditScope {
        self.selection.scope
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn autosave(&self) -> &Autosave {
        &self.autosave
    }

    pub fn clipboard(&self) -> Option<&Clipboard> {
        self.clipboard.as_ref()
    }

    pub fn paste_session(&self) -> &PasteSession {
        &self.paste_session
    }

    pub(crate) fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    /// The node list the current scope edits: a symbol's body in symbol
    /// edit mode, the canvas otherwise.
    pub fn active_nodes(&self) -> &[Node] {
        match self.selection.scope {
            EditScope::Symbol { symbol_id, .. } => {
                self.scene.symbol(symbol_id).map_or(&[][..], |s| &s.nodes)
            }
            _ => &self.scene.nodes,
        }
    }

    pub(crate) fn active_nodes_mut(&mut self) -> &mut Vec<Node> {
        if let EditScope::Symbol { symbol_id, .. } = self.selection.scope {
            if let Some(pos) = self.scene.symbols.iter().position(|s| s.id == symbol_id) {
                return &mut self.scene.symbols[pos].nodes;
            }
        }
        &mut self.scene.nodes
    }

    pub(crate) fn active_node(&self, id: NodeId) -> Option<&Node> {
        self.active_nodes().iter().find(|n| n.id == id)
    }

    pub(crate) fn active_node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.active_nodes_mut().iter_mut().find(|n| n.id == id)
    }

    // ─── Dirty tracking & batching ───────────────────────────────────────

    /// Signal one logical change. Ignored while a snapshot is being restored.
    pub fn mark_dirty(&mut self, label: &str) {
        if self.history.mode() == HistoryMode::Restoring {
            return;
        }
        let now = self.now();
        self.autosave.mark_dirty(now);
        self.history.mark_dirty(label, now);
    }

    pub fn begin_batch(&mut self, label: &str) {
        self.history.begin_batch(label);
    }

    pub fn end_batch(&mut self) -> bool {
        let now = self.now();
        self.history.end_batch(&self.scene, now)
    }

    /// Run `f` as one history transaction.
    pub fn batch<R>(&mut self, label: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        self.begin_batch(label);
        let out = f(self);
        self.end_batch();
        out
    }

    /// Fire whatever debounced work is due: the history commit and the
    /// autosave flush. Returns whether a history entry was added.
    pub fn tick(&mut self) -> bool {
        let now = self.now();
        let committed = self.history.tick(&self.scene, now);
        if self.autosave.timer.fire_if_due(now) {
            self.flush_autosave_now();
        }
        committed
    }

    /// Repair everything that can dangle after a structural change: group
    /// membership, z-order, selection and edit scope.
    pub(crate) fn reconcile(&mut self) {
        self.scene.reconcile_groups();
        self.scene.reindex_z();

        let scope_valid = match self.selection.scope {
            EditScope::Canvas => true,
            EditScope::Group(gid) => self.scene.group(gid).is_some(),
            EditScope::Symbol {
                symbol_id,
                instance_id,
            } => {
                self.scene.symbol(symbol_id).is_some()
                    && self
                        .scene
                        .node(instance_id)
                        .is_some_and(|n| n.symbol_id() == Some(symbol_id))
            }
        };
        if !scope_valid {
            self.selection.scope = EditScope::Canvas;
        }
        if let Some(gid) = self.selection.active_group {
            if self.scene.group(gid).is_none() {
                self.selection.active_group = None;
            }
        }
        let valid: Vec<NodeId> = self
            .selection
            .ids()
            .iter()
            .copied()
            .filter(|id| self.is_selectable(*id))
            .collect();
        self.selection.retain(|id| valid.contains(&id));
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// In the active list, not a guide, and inside the active group scope.
    pub fn is_selectable(&self, id: NodeId) -> bool {
        let Some(node) = self.active_node(id) else {
            return false;
        };
        if node.guide {
            return false;
        }
        match self.selection.scope {
            EditScope::Group(gid) => self.scene.group(gid).is_some_and(|g| g.contains(id)),
            _ => true,
        }
    }

    pub fn select(&mut self, id: NodeId, append: bool) -> bool {
        if !self.is_selectable(id) {
            return false;
        }
        self.selection.select(id, append);
        true
    }

    pub fn toggle_select(&mut self, id: NodeId) -> bool {
        if !self.is_selectable(id) {
            return false;
        }
        self.selection.toggle(id);
        true
    }

    /// Replace the selection with the selectable subset of `ids`, in stack
    /// order.
    pub fn set_selection(&mut self, ids: &[NodeId]) {
        let valid: Vec<NodeId> = self
            .active_nodes()
            .iter()
            .map(|n| n.id)
            .filter(|id| ids.contains(id))
            .filter(|id| self.is_selectable(*id))
            .collect();
        self.selection.set(valid);
    }

    pub fn select_all(&mut self) {
        let all: Vec<NodeId> = self.active_nodes().iter().map(|n| n.id).collect();
        self.set_selection(&all);
    }

    /// Select visible nodes whose box touches `rect`. Empty or inverted
    /// rectangles do nothing.
    pub fn box_select(&mut self, rect: Bounds, append: bool) -> bool {
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return false;
        }
        let symbols = &self.scene.symbols;
        let hits: Vec<NodeId> = self
            .active_nodes()
            .iter()
            .filter(|n| n.visible)
            .filter(|n| festoon_core::geometry::node_bounds(n, symbols).intersects(&rect))
            .map(|n| n.id)
            .filter(|id| self.is_selectable(*id))
            .collect();
        if append {
            self.selection.extend(hits);
        } else {
            self.selection.set(hits);
        }
        true
    }

    /// Clear the selection and end any paste session.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
        if self.paste_session.active {
            self.paste_session.end();
        }
    }

    pub fn selected_nodes(&self) -> Vec<&Node> {
        self.active_nodes()
            .iter()
            .filter(|n| self.selection.contains(n.id))
            .collect()
    }

    pub fn primary_node(&self) -> Option<&Node> {
        self.selection.primary().and_then(|id| self.active_node(id))
    }

    // ─── View, settings, canvas ──────────────────────────────────────────

    /// Update the view; `None` and non-finite parts keep their value.
    pub fn set_view(&mut self, x: Option<f32>, y: Option<f32>, scale: Option<f32>) -> bool {
        let cur = self.scene.view;
        let pick = |v: Option<f32>, d: f32| v.filter(|v| v.is_finite()).unwrap_or(d);
        let next = View::clamped(pick(x, cur.x), pick(y, cur.y), pick(scale, cur.scale));
        if next == cur {
            return false;
        }
        self.scene.view = next;
        self.mark_dirty("view");
        true
    }

    pub fn reset_view(&mut self) -> bool {
        if self.scene.view == View::default() {
            return false;
        }
        self.scene.view = View::default();
        self.mark_dirty("view");
        true
    }

    pub fn toggle_grid(&mut self) {
        self.scene.settings.grid = !self.scene.settings.grid;
        self.mark_dirty("grid");
    }

    /// Edit settings in place. Invalid step and tolerance values revert.
    pub fn update_settings(&mut self, edit: impl FnOnce(&mut Settings)) -> bool {
        let before = self.scene.settings;
        let mut next = before;
        edit(&mut next);
        if !(next.snap_step.is_finite() && next.snap_step > 0.0) {
            next.snap_step = before.snap_step;
        }
        if !(next.snap_tolerance.is_finite() && next.snap_tolerance >= 0.0) {
            next.snap_tolerance = before.snap_tolerance;
        }
        if next == before {
            return false;
        }
        self.scene.settings = next;
        self.mark_dirty("settings");
        true
    }

    pub fn set_guide_priority(&mut self, priority: GuidePriority) -> bool {
        self.update_settings(|s| s.snap_guide_priority = priority)
    }

    pub fn set_canvas_size(&mut self, width_cm: Option<f32>, height_cm: Option<f32>) -> bool {
        let changed = self.scene.canvas.set_size(width_cm, height_cm);
        if changed {
            self.mark_dirty("canvas size");
        }
        changed
    }

    pub fn set_canvas_lock_ratio(&mut self, lock: bool) -> bool {
        if self.scene.canvas.lock_ratio == lock {
            return false;
        }
        self.scene.canvas.lock_ratio = lock;
        self.mark_dirty("canvas");
        true
    }

    /// Unparseable colors are refused.
    pub fn set_canvas_background(&mut self, input: &str) -> bool {
        let Some(hex) = color::normalize(input) else {
            return false;
        };
        if self.scene.canvas.background_color == hex {
            return false;
        }
        self.scene.canvas.background_color = hex;
        self.mark_dirty("canvas background");
        true
    }

    pub fn set_display_scale(&mut self, scale: f32) -> bool {
        let changed = self.scene.canvas.set_display_scale(scale);
        if changed {
            self.mark_dirty("display scale");
        }
        changed
    }

    pub fn set_canvas_offset(&mut self, x_cm: f32, y_cm: f32) -> bool {
        if !x_cm.is_finite() || !y_cm.is_finite() {
            return false;
        }
        let canvas = &mut self.scene.canvas;
        if (canvas.offset_x_cm, canvas.offset_y_cm) == (x_cm, y_cm) {
            return false;
        }
        canvas.offset_x_cm = x_cm;
        canvas.offset_y_cm = y_cm;
        self.mark_dirty("canvas offset");
        true
    }

    // ─── History ─────────────────────────────────────────────────────────

    /// Runs inside the history's restoring window: repairs made here are
    /// part of the restored state, not new entries.
    fn after_restore(&mut self) {
        let now = self.now();
        self.selection = Selection::default();
        self.paste_session.end();
        self.reconcile();
        self.autosave.mark_dirty(now);
        self.history.finish_restore();
    }

    pub fn undo(&mut self) -> bool {
        let now = self.now();
        if !self.history.undo(&mut self.scene, now) {
            return false;
        }
        self.after_restore();
        true
    }

    pub fn redo(&mut self) -> bool {
        let now = self.now();
        if !self.history.redo(&mut self.scene, now) {
            return false;
        }
        self.after_restore();
        true
    }

    /// Jump to an index of [`Editor::history_entries`].
    pub fn jump_to_history(&mut self, index: usize) -> bool {
        let now = self.now();
        if !self.history.jump_to(index, &mut self.scene, now) {
            return false;
        }
        self.after_restore();
        true
    }

    pub fn history_entries(&self) -> Vec<&Snapshot> {
        self.history.entries().collect()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ─── Persistence ─────────────────────────────────────────────────────

    /// Turn autosave on, restore the last saved design if there is one,
    /// and start history from the resulting state.
    pub fn init_autosave(&mut self) -> bool {
        self.autosave.enabled = true;
        let restored = self.restore_from_storage();
        if !restored {
            let now = self.now();
            self.history.reset(&self.scene, now);
        }
        restored
    }

    /// Write the design now if autosave is on and there are unsaved
    /// changes. Storage failures are logged and leave the state dirty so
    /// the next flush retries.
    pub fn flush_autosave_now(&mut self) -> bool {
        if !self.autosave.enabled || !self.autosave.dirty {
            return false;
        }
        self.autosave.timer.cancel();
        let now = self.now();
        match self.persist(now) {
            Ok(()) => {
                self.autosave.mark_saved(now);
                true
            }
            Err(e) => {
                log::warn!("autosave failed: {e}");
                false
            }
        }
    }

    /// Synchronous flush for shutdown, regardless of pending timers.
    pub fn on_page_close(&mut self) -> bool {
        self.flush_autosave_now()
    }

    /// Write the current design to the store, stamped `now`.
    pub fn persist(&mut self, now: u64) -> Result<(), StorageError> {
        let json = export_string(&self.scene, now)?;
        self.store.set(&self.config.storage_key, &json)
    }

    pub fn can_restore(&self) -> bool {
        matches!(self.store.get(&self.config.storage_key), Ok(Some(_)))
    }

    /// Load the saved design. Missing, unreadable or invalid data leaves
    /// the current state untouched.
    pub fn restore_from_storage(&mut self) -> bool {
        let raw = match self.store.get(&self.config.storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return false,
            Err(e) => {
                log::warn!("could not read saved design: {e}");
                return false;
            }
        };
        let value: Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("saved design is not valid JSON: {e}");
                return false;
            }
        };
        let scene = match import_document(&value) {
            Ok(scene) => scene,
            Err(e) => {
                log::warn!("saved design rejected: {e}");
                return false;
            }
        };
        let now = self.now();
        self.replace_scene(scene);
        self.autosave.dirty = false;
        self.autosave.timer.cancel();
        let saved_at = value.get("savedAt").and_then(Value::as_u64).unwrap_or(now);
        self.autosave.last_saved_at = Some(saved_at);
        true
    }

    pub fn clear_saved_design(&mut self) -> bool {
        match self.store.remove(&self.config.storage_key) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("could not clear saved design: {e}");
                false
            }
        }
    }

    /// Start over with an empty design. Canvas settings are kept.
    pub fn new_design(&mut self) {
        let mut scene = Scene::new();
        scene.canvas = self.scene.canvas.clone();
        scene.stack_grid.config = self.scene.stack_grid.config.clone();
        scene.settings = Settings {
            grid: true,
            snap: false,
            snap_step: Settings::default().snap_step,
            ..self.scene.settings
        };
        self.replace_scene(scene);
        self.clear_saved_design();
        self.autosave.dirty = false;
        self.autosave.timer.cancel();
        self.autosave.last_saved_at = None;
    }

    fn replace_scene(&mut self, scene: Scene) {
        let now = self.now();
        self.scene = scene;
        self.selection = Selection::default();
        self.paste_session.end();
        self.history.reset(&self.scene, now);
    }

    pub fn export_document(&self) -> festoon_core::DesignDocument {
        export_document(&self.scene, self.now())
    }

    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        export_string(&self.scene, self.now())
    }

    pub fn import_json(&mut self, json: &str) -> Result<(), ImportError> {
        let value: Value = serde_json::from_str(json)?;
        self.import_value(&value)
    }

    /// Replace the design. An invalid document is rejected and nothing
    /// changes. A valid one is saved right away and becomes the new
    /// history baseline.
    pub fn import_value(&mut self, value: &Value) -> Result<(), ImportError> {
        let scene = import_document(value).inspect_err(|e| log::warn!("import rejected: {e}"))?;
        self.replace_scene(scene);
        self.autosave.dirty = false;
        self.autosave.timer.cancel();
        let now = self.now();
        match self.persist(now) {
            Ok(()) => self.autosave.last_saved_at = Some(now),
            Err(e) => log::warn!("could not save imported design: {e}"),
        }
        Ok(())
    }

    pub fn materials(&self, catalog: &Catalog, filter: MaterialFilter) -> MaterialSummary {
        compute_materials(&self.scene, catalog, filter)
    }

    pub fn export_materials(&self, catalog: &Catalog, filter: MaterialFilter) -> MaterialsExport {
        MaterialsExport::new(&self.scene, catalog, filter, self.now())
    }

    pub fn export_materials_json(
        &self,
        catalog: &Catalog,
        filter: MaterialFilter,
    ) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.export_materials(catalog, filter))
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    /// Union of the rendered boxes of visible canvas nodes, padded, with
    /// the top-left clamped at zero and a minimum size of one pixel.
    pub fn content_bounding_box(&self, renderer: &dyn Renderer) -> Option<Bounds> {
        let pad = self.config.content_padding.max(0.0);
        let b = self
            .scene
            .nodes
            .iter()
            .filter(|n| n.visible)
            .filter_map(|n| renderer.node_rect(n.id))
            .reduce(|a, b| a.union(&b))?;
        let min_x = (b.left() - pad).max(0.0);
        let min_y = (b.top() - pad).max(0.0);
        let max_x = b.right() + pad;
        let max_y = b.bottom() + pad;
        Some(Bounds::new(
            min_x,
            min_y,
            (max_x - min_x).max(1.0),
            (max_y - min_y).max(1.0),
        ))
    }

    pub fn export_png(
        &self,
        renderer: &dyn Renderer,
        options: ExportOptions,
    ) -> Result<Vec<u8>, RenderError> {
        let region = if options.crop_to_content {
            Some(
                self.content_bounding_box(renderer)
                    .ok_or(RenderError::NoContent)?,
            )
        } else {
            None
        };
        renderer.rasterize(region, options.pixel_ratio)
    }

    /// Frame all content in a viewport of the given pixel size.
    pub fn fit_content(
        &mut self,
        renderer: &dyn Renderer,
        viewport_w: f32,
        viewport_h: f32,
    ) -> bool {
        if !(viewport_w > 0.0 && viewport_h > 0.0) {
            return false;
        }
        let Some(b) = self.content_bounding_box(renderer) else {
            return false;
        };
        let scale = (viewport_w / b.width)
            .min(viewport_h / b.height)
            .clamp(MIN_VIEW_SCALE, MAX_VIEW_SCALE);
        let (cx, cy) = b.center();
        self.set_view(
            Some(viewport_w / 2.0 - cx * scale),
            Some(viewport_h / 2.0 - cy * scale),
            Some(scale),
        )
    }
}
