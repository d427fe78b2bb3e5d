//! Axis-aligned bounds and kind-aware node extents.
//!
//! Rotation is not applied to a node's own box; symbol instances do rotate
//! their children's offsets before the union is taken.

use crate::model::{Node, NodeKind, Symbol};
use crate::symbols;
use serde::{Deserialize, Serialize};

/// Glyph advance approximation, as a fraction of the font size.
const TEXT_ADVANCE: f32 = 0.6;
/// Line height, as a multiple of the font size.
const TEXT_LINE_HEIGHT: f32 = 1.2;

/// Rectangle in canvas pixel space, `x`/`y` at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Box of the given half-extents around a center point.
    pub fn around(cx: f32, cy: f32, half_w: f32, half_h: f32) -> Self {
        Self::new(cx - half_w, cy - half_h, half_w * 2.0, half_h * 2.0)
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    /// AABB overlap. Touching edges count as intersecting.
    pub fn intersects(&self, other: &Bounds) -> bool {
        !(self.right() < other.x
            || self.x > other.right()
            || self.bottom() < other.y
            || self.y > other.bottom())
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Bounds::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    /// Grow by `pad` on every side.
    pub fn inflate(&self, pad: f32) -> Bounds {
        Bounds::new(
            self.x - pad,
            self.y - pad,
            self.width + pad * 2.0,
            self.height + pad * 2.0,
        )
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Bounds {
        Bounds::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// Half width and half height of a node's box around its center.
pub fn half_extents(node: &Node, symbols: &[Symbol]) -> (f32, f32) {
    let sx = node.scale_x.abs();
    let sy = node.scale_y.abs();
    match &node.kind {
        NodeKind::Balloon(meta) => (meta.radius_x * sx, meta.radius_y * sy),
        NodeKind::Image(meta) => (meta.width / 2.0 * sx, meta.height / 2.0 * sy),
        NodeKind::Text(meta) => {
            let lines = meta.text.lines().count().max(1) as f32;
            let longest = meta
                .text
                .lines()
                .map(|l| l.chars().count())
                .max()
                .unwrap_or(0)
                .max(1) as f32;
            (
                longest * meta.size * TEXT_ADVANCE / 2.0 * sx,
                lines * meta.size * TEXT_LINE_HEIGHT / 2.0 * sy,
            )
        }
        NodeKind::SymbolInstance { .. } => {
            let b = node_bounds(node, symbols);
            (b.width / 2.0, b.height / 2.0)
        }
    }
}

/// The node's box in its parent's space.
pub fn node_bounds(node: &Node, symbols: &[Symbol]) -> Bounds {
    match node.kind {
        NodeKind::SymbolInstance { .. } => {
            let leaves = symbols::expand_instance(node, symbols);
            union_bounds(leaves.iter(), symbols)
                .unwrap_or_else(|| Bounds::new(node.x, node.y, 0.0, 0.0))
        }
        _ => {
            let (hw, hh) = half_extents(node, symbols);
            Bounds::around(node.x, node.y, hw, hh)
        }
    }
}

/// Union of several nodes' boxes, `None` when empty.
pub fn union_bounds<'a>(
    nodes: impl IntoIterator<Item = &'a Node>,
    symbols: &[Symbol],
) -> Option<Bounds> {
    nodes
        .into_iter()
        .map(|n| node_bounds(n, symbols))
        .reduce(|acc, b| acc.union(&b))
}

/// Round to the nearest multiple of `step`. Non-positive steps pass through.
pub fn snap_to_step(value: f32, step: f32) -> f32 {
    if step > 0.0 && step.is_finite() {
        (value / step).round() * step
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::NodeId;
    use crate::model::{BalloonMeta, ImageMeta, TextMeta};

    #[test]
    fn balloon_bounds_use_scaled_radii() {
        let mut node = Node::balloon(NodeId::intern("geo_b"), 100.0, 100.0, BalloonMeta::default());
        node.scale_x = -2.0;
        assert_eq!(node_bounds(&node, &[]), Bounds::new(8.0, 40.0, 184.0, 120.0));
    }

    #[test]
    fn image_bounds_use_pixel_size() {
        let meta = ImageMeta {
            src: "a.png".into(),
            width: 40.0,
            height: 20.0,
        };
        let node = Node::image(NodeId::intern("geo_i"), 0.0, 0.0, meta);
        assert_eq!(node_bounds(&node, &[]), Bounds::new(-20.0, -10.0, 40.0, 20.0));
    }

    #[test]
    fn text_bounds_follow_longest_line() {
        let meta = TextMeta {
            text: "ab\nabcd".into(),
            size: 10.0,
            ..TextMeta::default()
        };
        let node = Node::text(NodeId::intern("geo_t"), 0.0, 0.0, meta);
        let (hw, hh) = half_extents(&node, &[]);
        assert!((hw - 12.0).abs() < 1e-4);
        assert!((hh - 12.0).abs() < 1e-4);
    }

    #[test]
    fn touching_rects_intersect() {
        let a = Bounds::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&Bounds::new(10.0, 10.0, 5.0, 5.0)));
        assert!(!a.intersects(&Bounds::new(10.5, 0.0, 5.0, 5.0)));
    }

    #[test]
    fn union_and_inflate() {
        let u = Bounds::new(0.0, 0.0, 10.0, 10.0).union(&Bounds::new(20.0, -5.0, 5.0, 5.0));
        assert_eq!(u, Bounds::new(0.0, -5.0, 25.0, 15.0));
        assert_eq!(u.inflate(1.0), Bounds::new(-1.0, -6.0, 27.0, 17.0));
    }

    #[test]
    fn snaps_to_step() {
        assert_eq!(snap_to_step(14.0, 10.0), 10.0);
        assert_eq!(snap_to_step(15.0, 10.0), 20.0);
        assert_eq!(snap_to_step(14.0, 0.0), 14.0);
    }
}
