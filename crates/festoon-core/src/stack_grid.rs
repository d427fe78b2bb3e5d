//! Cursor-driven grid placement for sequential node creation.
//!
//! Placements are node centers. The first cell is centered on the origin;
//! each further cell is one pitch (cell size plus gap) away.

use crate::id::NodeId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackDirection {
    /// Fill a row, then move down.
    #[default]
    Row,
    /// Fill a column, then move right.
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackPattern {
    #[default]
    Normal,
    /// Every other row (or column) runs backwards.
    Snake,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StackGridConfig {
    /// Cells per row (row direction) or per column (column direction).
    pub count: usize,
    pub gap_x: f32,
    pub gap_y: f32,
    pub direction: StackDirection,
    pub pattern: StackPattern,
    pub origin_x: f32,
    pub origin_y: f32,
}

impl Default for StackGridConfig {
    fn default() -> Self {
        Self {
            count: 5,
            gap_x: 4.0,
            gap_y: 4.0,
            direction: StackDirection::Row,
            pattern: StackPattern::Normal,
            origin_x: 200.0,
            origin_y: 200.0,
        }
    }
}

impl StackGridConfig {
    fn per_line(&self) -> usize {
        self.count.max(1)
    }

    /// Visual cell of the `index`-th placement.
    pub fn cursor_at(&self, index: usize) -> StackCursor {
        let per = self.per_line();
        let major = index / per;
        let mut minor = index % per;
        if self.pattern == StackPattern::Snake && major % 2 == 1 {
            minor = per - 1 - minor;
        }
        match self.direction {
            StackDirection::Row => StackCursor { col: minor, row: major },
            StackDirection::Column => StackCursor { col: major, row: minor },
        }
    }

    /// Inverse of [`Self::cursor_at`]. Cells outside the line length clamp.
    pub fn index_of(&self, cursor: StackCursor) -> usize {
        let per = self.per_line();
        let (major, minor) = match self.direction {
            StackDirection::Row => (cursor.row, cursor.col.min(per - 1)),
            StackDirection::Column => (cursor.col, cursor.row.min(per - 1)),
        };
        let minor = if self.pattern == StackPattern::Snake && major % 2 == 1 {
            per - 1 - minor
        } else {
            minor
        };
        major * per + minor
    }
}

/// Visual grid position of the next placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StackCursor {
    pub col: usize,
    pub row: usize,
}

/// Footprint of one placed node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StackCell {
    pub width: f32,
    pub height: f32,
}

impl StackCell {
    pub fn from_half_extents(half_w: f32, half_h: f32) -> Self {
        Self {
            width: half_w.abs() * 2.0,
            height: half_h.abs() * 2.0,
        }
    }
}

/// Center of the `index`-th placement.
pub fn placement_at(config: &StackGridConfig, index: usize, cell: StackCell) -> (f32, f32) {
    position_of(config, config.cursor_at(index), cell)
}

fn position_of(config: &StackGridConfig, cursor: StackCursor, cell: StackCell) -> (f32, f32) {
    (
        config.origin_x + cursor.col as f32 * (cell.width + config.gap_x),
        config.origin_y + cursor.row as f32 * (cell.height + config.gap_y),
    )
}

/// Grid settings plus the persistent cursor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StackGrid {
    pub config: StackGridConfig,
    pub cursor: StackCursor,
}

impl StackGrid {
    pub fn new(config: StackGridConfig) -> Self {
        Self {
            config,
            cursor: StackCursor::default(),
        }
    }

    pub fn cell_for(half_w: f32, half_h: f32) -> StackCell {
        StackCell::from_half_extents(half_w, half_h)
    }

    /// Where the next placement would land, without advancing.
    pub fn peek(&self, cell: StackCell) -> (f32, f32) {
        position_of(&self.config, self.cursor, cell)
    }

    /// Place at the cursor and advance it one cell.
    pub fn next(&mut self, cell: StackCell) -> (f32, f32) {
        let at = self.peek(cell);
        let index = self.config.index_of(self.cursor);
        self.cursor = self.config.cursor_at(index + 1);
        at
    }

    pub fn reset(&mut self) {
        self.cursor = StackCursor::default();
    }

    /// Replace the configuration. The cursor restarts since its meaning
    /// depends on the line length and direction.
    pub fn set_config(&mut self, config: StackGridConfig) -> bool {
        let mut config = config;
        config.count = config.count.max(1);
        if config == self.config {
            return false;
        }
        self.config = config;
        self.reset();
        true
    }
}

/// Re-flow targets for existing nodes, in the order given. All items share
/// one cell sized to the largest footprint so rows stay aligned.
pub fn preview_layout(
    config: &StackGridConfig,
    items: &[(NodeId, f32, f32)],
) -> Vec<(NodeId, f32, f32)> {
    let cell = items.iter().fold(StackCell::default(), |acc, (_, hw, hh)| {
        let c = StackCell::from_half_extents(*hw, *hh);
        StackCell {
            width: acc.width.max(c.width),
            height: acc.height.max(c.height),
        }
    });
    items
        .iter()
        .enumerate()
        .map(|(i, (id, _, _))| {
            let (x, y) = placement_at(config, i, cell);
            (*id, x, y)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn snake_rows() -> StackGridConfig {
        StackGridConfig {
            count: 3,
            gap_x: 0.0,
            gap_y: 0.0,
            direction: StackDirection::Row,
            pattern: StackPattern::Snake,
            origin_x: 0.0,
            origin_y: 0.0,
        }
    }

    #[test]
    fn snake_rows_reverse_every_other_row() {
        let config = snake_rows();
        let cell = StackCell::from_half_extents(10.0, 10.0);
        let points: Vec<_> = (0..6).map(|i| placement_at(&config, i, cell)).collect();
        assert_eq!(
            points,
            vec![(0.0, 0.0), (20.0, 0.0), (40.0, 0.0), (40.0, 20.0), (20.0, 20.0), (0.0, 20.0)]
        );
    }

    #[test]
    fn cursor_walk_matches_indexed_placement() {
        let mut grid = StackGrid::new(snake_rows());
        let cell = StackCell::from_half_extents(10.0, 10.0);
        let walked: Vec<_> = (0..6).map(|_| grid.next(cell)).collect();
        let indexed: Vec<_> = (0..6).map(|i| placement_at(&grid.config, i, cell)).collect();
        assert_eq!(walked, indexed);
        assert_eq!(grid.cursor, StackCursor { col: 0, row: 2 });
        grid.reset();
        assert_eq!(grid.peek(cell), (0.0, 0.0));
    }

    #[test]
    fn column_major_normal_with_gaps() {
        let config = StackGridConfig {
            count: 2,
            gap_x: 5.0,
            gap_y: 1.0,
            direction: StackDirection::Column,
            pattern: StackPattern::Normal,
            origin_x: 10.0,
            origin_y: 10.0,
        };
        let cell = StackCell::from_half_extents(5.0, 5.0);
        let points: Vec<_> = (0..3).map(|i| placement_at(&config, i, cell)).collect();
        assert_eq!(points, vec![(10.0, 10.0), (10.0, 21.0), (25.0, 10.0)]);
    }

    #[test]
    fn preview_uses_largest_cell() {
        let a = NodeId::intern("pv_a");
        let b = NodeId::intern("pv_b");
        let config = StackGridConfig {
            count: 2,
            gap_x: 0.0,
            gap_y: 0.0,
            origin_x: 0.0,
            origin_y: 0.0,
            ..StackGridConfig::default()
        };
        let targets = preview_layout(&config, &[(a, 5.0, 5.0), (b, 20.0, 10.0)]);
        assert_eq!(targets, vec![(a, 0.0, 0.0), (b, 40.0, 0.0)]);
    }

    #[test]
    fn config_change_resets_cursor() {
        let mut grid = StackGrid::default();
        grid.next(StackCell::from_half_extents(1.0, 1.0));
        assert_ne!(grid.cursor, StackCursor::default());
        let mut config = grid.config.clone();
        config.count = 0;
        assert!(grid.set_config(config));
        assert_eq!(grid.config.count, 1);
        assert_eq!(grid.cursor, StackCursor::default());
    }
}
