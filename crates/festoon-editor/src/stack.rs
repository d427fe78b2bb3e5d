//! Stack-grid placement, guide placeholders and re-flow.

use crate::editor::Editor;
use crate::nodes::BalloonStyle;
use festoon_core::geometry::half_extents;
use festoon_core::stack_grid::preview_layout;
use festoon_core::{GUIDE_OPACITY, NodeId, StackGrid, StackGridConfig};

/// Most guides one call will place.
pub const MAX_GUIDES: usize = 200;

impl Editor {
    pub fn stack_grid(&self) -> &StackGrid {
        &self.scene.stack_grid
    }

    /// Replace the grid settings. The cursor restarts.
    pub fn set_stack_grid_config(&mut self, config: StackGridConfig) -> bool {
        if !self.scene.stack_grid.set_config(config) {
            return false;
        }
        self.mark_dirty("stack grid");
        true
    }

    /// Send the cursor back to the first cell. The cursor is saved with the
    /// design, so a move is an edit.
    pub fn reset_stack_cursor(&mut self) -> bool {
        let before = self.scene.stack_grid.cursor;
        self.scene.stack_grid.reset();
        if self.scene.stack_grid.cursor == before {
            return false;
        }
        self.mark_dirty("reset stack cursor");
        true
    }

    /// Add a balloon at the grid cursor and advance it.
    pub fn add_balloon_stacked(&mut self, style: &BalloonStyle) -> NodeId {
        let cell = StackGrid::cell_for(style.meta.radius_x, style.meta.radius_y);
        let (x, y) = self.scene.stack_grid.next(cell);
        self.add_balloon(x, y, style)
    }

    /// Lay out `count` guide placeholders (clamped to `1..=200`) along the
    /// grid. Guides are locked, faded, never selectable and not counted as
    /// material until converted.
    pub fn place_guides(&mut self, count: usize, style: &BalloonStyle) -> Vec<NodeId> {
        let count = count.clamp(1, MAX_GUIDES);
        let cell = StackGrid::cell_for(style.meta.radius_x, style.meta.radius_y);
        self.batch("guides", |ed| {
            let ids: Vec<NodeId> = (0..count)
                .map(|_| {
                    let (x, y) = ed.scene.stack_grid.next(cell);
                    let mut node = style.build(NodeId::fresh(), x, y);
                    node.guide = true;
                    node.locked = true;
                    node.opacity = GUIDE_OPACITY;
                    ed.push_node(node)
                })
                .collect();
            ed.mark_dirty("guides");
            ids
        })
    }

    /// Turn a guide into a regular balloon and select it.
    pub fn convert_guide(&mut self, id: NodeId) -> bool {
        let Some(node) = self.active_node_mut(id) else {
            return false;
        };
        if !node.guide {
            return false;
        }
        node.guide = false;
        node.locked = false;
        node.opacity = 1.0;
        self.selection.select(id, false);
        self.mark_dirty("convert guide");
        true
    }

    /// Where re-flowing the unlocked selection (in selection order) onto
    /// the grid would put each node. Nothing is moved.
    pub fn preview_stack_layout(&self) -> Vec<(NodeId, f32, f32)> {
        let symbols = &self.scene.symbols;
        let nodes = self.movable_selection();
        let items: Vec<(NodeId, f32, f32)> = self
            .selection
            .ids()
            .iter()
            .filter_map(|id| nodes.iter().find(|n| n.id == *id))
            .map(|n| {
                let (hw, hh) = half_extents(n, symbols);
                (n.id, hw, hh)
            })
            .collect();
        preview_layout(&self.scene.stack_grid.config, &items)
    }

    pub fn apply_stack_layout(&mut self) -> bool {
        let targets = self.preview_stack_layout();
        self.move_nodes("stack layout", &targets)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::EditorConfig;
    use crate::editor::Editor;
    use crate::nodes::BalloonStyle;
    use crate::persistence::MemoryStore;
    use crate::schedule::ManualClock;
    use festoon_core::{BalloonMeta, MaterialFilter, StackGridConfig, materials::Catalog};
    use pretty_assertions::assert_eq;

    fn editor() -> Editor {
        Editor::with_backends(
            EditorConfig::default(),
            Box::new(MemoryStore::new()),
            Box::new(ManualClock::new(0)),
        )
    }

    fn ten() -> BalloonStyle {
        BalloonStyle {
            meta: BalloonMeta {
                radius_x: 10.0,
                radius_y: 10.0,
                ..BalloonMeta::default()
            },
            ..BalloonStyle::default()
        }
    }

    fn grid(count: usize) -> StackGridConfig {
        StackGridConfig {
            count,
            gap_x: 0.0,
            gap_y: 0.0,
            origin_x: 0.0,
            origin_y: 0.0,
            ..StackGridConfig::default()
        }
    }

    #[test]
    fn stacked_balloons_follow_the_cursor() {
        let mut ed = editor();
        ed.set_stack_grid_config(grid(2));
        let xs: Vec<(f32, f32)> = (0..3)
            .map(|_| {
                let id = ed.add_balloon_stacked(&ten());
                let n = ed.scene().node(id).unwrap();
                (n.x, n.y)
            })
            .collect();
        assert_eq!(xs, vec![(0.0, 0.0), (20.0, 0.0), (0.0, 20.0)]);
        ed.reset_stack_cursor();
        let id = ed.add_balloon_stacked(&ten());
        assert_eq!(ed.scene().node(id).unwrap().x, 0.0);
    }

    #[test]
    fn cursor_reset_is_recorded() {
        let clock = ManualClock::new(0);
        let mut ed = Editor::with_backends(
            EditorConfig::default(),
            Box::new(MemoryStore::new()),
            Box::new(clock.clone()),
        );
        ed.add_balloon_stacked(&ten());
        clock.advance(1_000);
        ed.tick();
        assert_eq!(ed.history().past_len(), 2);

        assert!(ed.reset_stack_cursor());
        assert!(ed.history().is_pending());
        clock.advance(1_000);
        ed.tick();
        assert_eq!(ed.history().past_len(), 3);
        assert!(!ed.reset_stack_cursor());
    }

    #[test]
    fn guides_are_inert_until_converted() {
        let mut ed = editor();
        let catalog = Catalog::builtin();
        let guides = ed.place_guides(3, &ten());
        assert_eq!(guides.len(), 3);
        assert!(ed.selection().is_empty());
        assert!(!ed.select(guides[0], false));
        assert_eq!(ed.materials(&catalog, MaterialFilter::default()).total, 0);

        assert!(ed.convert_guide(guides[0]));
        let node = ed.scene().node(guides[0]).unwrap();
        assert!(!node.guide && !node.locked);
        assert_eq!(node.opacity, 1.0);
        assert_eq!(ed.selection().ids(), &[guides[0]]);
        assert_eq!(ed.materials(&catalog, MaterialFilter::default()).total, 1);
    }

    #[test]
    fn reflow_uses_selection_order() {
        let mut ed = editor();
        ed.set_stack_grid_config(grid(5));
        let a = ed.add_balloon(300.0, 300.0, &ten());
        let b = ed.add_balloon(100.0, 100.0, &ten());
        ed.set_selection(&[a, b]);
        ed.selection.toggle(a);
        ed.selection.toggle(a);
        // Selection order is now [b, a].
        let preview = ed.preview_stack_layout();
        assert_eq!(preview, vec![(b, 0.0, 0.0), (a, 20.0, 0.0)]);
        assert_eq!(ed.scene().node(a).unwrap().x, 300.0);
        assert!(ed.apply_stack_layout());
        assert_eq!(ed.scene().node(a).unwrap().x, 20.0);
    }
}
