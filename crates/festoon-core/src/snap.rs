//! Guide snapping.
//!
//! The moving selection exposes three features per axis. Each feature is
//! tried against every guide on the same axis within tolerance, and the
//! best candidate wins by, in order: feature priority, absolute distance,
//! guide source (nodes before the canvas). Axes are solved independently.

use crate::geometry::{Bounds, node_bounds};
use crate::id::NodeId;
use crate::model::{GuidePriority, PX_PER_CM, Scene, Settings};
use std::cmp::Ordering;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Alignment line of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Left,
    CenterX,
    Right,
    Top,
    CenterY,
    Bottom,
}

impl Feature {
    pub fn is_center(self) -> bool {
        matches!(self, Self::CenterX | Self::CenterY)
    }

    fn value(self, b: &Bounds) -> f32 {
        let (cx, cy) = b.center();
        match self {
            Self::Left => b.left(),
            Self::CenterX => cx,
            Self::Right => b.right(),
            Self::Top => b.top(),
            Self::CenterY => cy,
            Self::Bottom => b.bottom(),
        }
    }

    /// Lower ranks first.
    fn weight(self, priority: GuidePriority) -> u8 {
        match (priority, self.is_center()) {
            (GuidePriority::CenterFirst, true) | (GuidePriority::EdgesFirst, false) => 0,
            _ => 1,
        }
    }
}

const X_FEATURES: [Feature; 3] = [Feature::Left, Feature::CenterX, Feature::Right];
const Y_FEATURES: [Feature; 3] = [Feature::Top, Feature::CenterY, Feature::Bottom];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideSource {
    Node(NodeId),
    Canvas,
}

impl GuideSource {
    fn weight(self) -> u8 {
        match self {
            Self::Node(_) => 0,
            Self::Canvas => 1,
        }
    }
}

/// A candidate alignment line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Guide {
    pub axis: Axis,
    pub value: f32,
    pub source: GuideSource,
    /// Which feature of the source produced the line.
    pub feature: Feature,
}

impl Guide {
    pub fn node(axis: Axis, value: f32, id: NodeId, feature: Feature) -> Self {
        Self {
            axis,
            value,
            source: GuideSource::Node(id),
            feature,
        }
    }

    pub fn canvas(axis: Axis, value: f32, feature: Feature) -> Self {
        Self {
            axis,
            value,
            source: GuideSource::Canvas,
            feature,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuideSet {
    pub xs: Vec<Guide>,
    pub ys: Vec<Guide>,
}

impl GuideSet {
    fn push_box(&mut self, b: &Bounds, source: GuideSource) {
        for feature in X_FEATURES {
            self.xs.push(Guide {
                axis: Axis::X,
                value: feature.value(b),
                source,
                feature,
            });
        }
        for feature in Y_FEATURES {
            self.ys.push(Guide {
                axis: Axis::Y,
                value: feature.value(b),
                source,
                feature,
            });
        }
    }
}

/// Guides from every visible, non-guide canvas node not in `exclude`, plus
/// the canvas edges and center.
pub fn collect_guides(scene: &Scene, exclude: &HashSet<NodeId>) -> GuideSet {
    let mut set = GuideSet::default();
    for node in scene.nodes.iter() {
        if !node.visible || node.guide || exclude.contains(&node.id) {
            continue;
        }
        set.push_box(&node_bounds(node, &scene.symbols), GuideSource::Node(node.id));
    }
    let (w, h) = scene.canvas.pixel_size();
    let canvas = Bounds::new(
        scene.canvas.offset_x_cm * PX_PER_CM,
        scene.canvas.offset_y_cm * PX_PER_CM,
        w,
        h,
    );
    set.push_box(&canvas, GuideSource::Canvas);
    set
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapOptions {
    pub enabled: bool,
    pub tolerance: f32,
    pub priority: GuidePriority,
}

impl SnapOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            enabled: settings.snap_guides,
            tolerance: settings.snap_tolerance,
            priority: settings.snap_guide_priority,
        }
    }
}

/// Per-axis shift that lands the box on the winning guides.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SnapResult {
    pub dx: f32,
    pub dy: f32,
    pub guide_x: Option<Guide>,
    pub guide_y: Option<Guide>,
}

impl SnapResult {
    pub fn is_snapped(&self) -> bool {
        self.guide_x.is_some() || self.guide_y.is_some()
    }
}

struct Candidate {
    weight: u8,
    distance: f32,
    source: u8,
    delta: f32,
    guide: Guide,
}

impl Candidate {
    fn rank(&self, other: &Candidate) -> Ordering {
        self.weight
            .cmp(&other.weight)
            .then(self.distance.total_cmp(&other.distance))
            .then(self.source.cmp(&other.source))
    }
}

fn best_on_axis(
    b: &Bounds,
    features: &[Feature; 3],
    guides: &[Guide],
    options: &SnapOptions,
) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for &feature in features {
        let value = feature.value(b);
        for guide in guides {
            let delta = guide.value - value;
            let distance = delta.abs();
            if distance > options.tolerance {
                continue;
            }
            let cand = Candidate {
                weight: feature.weight(options.priority),
                distance,
                source: guide.source.weight(),
                delta,
                guide: *guide,
            };
            // Strictly better only: the first of equals is kept.
            if best
                .as_ref()
                .is_none_or(|cur| cand.rank(cur) == Ordering::Less)
            {
                best = Some(cand);
            }
        }
    }
    best
}

/// Find the best X and Y snap for a moving box.
pub fn snap_box(b: &Bounds, guides: &GuideSet, options: &SnapOptions) -> SnapResult {
    if !options.enabled {
        return SnapResult::default();
    }
    let x = best_on_axis(b, &X_FEATURES, &guides.xs, options);
    let y = best_on_axis(b, &Y_FEATURES, &guides.ys, options);
    let result = SnapResult {
        dx: x.as_ref().map_or(0.0, |c| c.delta),
        dy: y.as_ref().map_or(0.0, |c| c.delta),
        guide_x: x.map(|c| c.guide),
        guide_y: y.map(|c| c.guide),
    };
    if result.is_snapped() {
        log::trace!(
            "snap dx={} dy={} via {:?} / {:?}",
            result.dx,
            result.dy,
            result.guide_x,
            result.guide_y
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(priority: GuidePriority) -> SnapOptions {
        SnapOptions {
            enabled: true,
            tolerance: 8.0,
            priority,
        }
    }

    #[test]
    fn closer_node_guide_wins_edges_first() {
        let guides = GuideSet {
            xs: vec![
                Guide::node(Axis::X, 98.0, NodeId::intern("snap_n"), Feature::Right),
                Guide::canvas(Axis::X, 102.0, Feature::Left),
            ],
            ys: vec![],
        };
        let b = Bounds::new(100.0, 0.0, 50.0, 50.0);
        let result = snap_box(&b, &guides, &options(GuidePriority::EdgesFirst));
        assert_eq!(result.dx, -2.0);
        assert_eq!(result.guide_x.map(|g| g.value), Some(98.0));
        assert_eq!(result.dy, 0.0);
        assert!(result.guide_y.is_none());
    }

    #[test]
    fn priority_beats_distance() {
        // Left edge is 1px off one guide, center is 5px off another.
        let guides = GuideSet {
            xs: vec![
                Guide::canvas(Axis::X, 99.0, Feature::Left),
                Guide::canvas(Axis::X, 130.0, Feature::CenterX),
            ],
            ys: vec![],
        };
        let b = Bounds::new(100.0, 0.0, 50.0, 50.0);
        let center = snap_box(&b, &guides, &options(GuidePriority::CenterFirst));
        assert_eq!(center.dx, 5.0);
        let edges = snap_box(&b, &guides, &options(GuidePriority::EdgesFirst));
        assert_eq!(edges.dx, -1.0);
    }

    #[test]
    fn equal_distance_prefers_node_source() {
        let id = NodeId::intern("snap_tie");
        let guides = GuideSet {
            xs: vec![],
            ys: vec![
                Guide::canvas(Axis::Y, 3.0, Feature::Top),
                Guide::node(Axis::Y, 3.0, id, Feature::Top),
            ],
        };
        let b = Bounds::new(0.0, 0.0, 10.0, 100.0);
        let result = snap_box(&b, &guides, &options(GuidePriority::EdgesFirst));
        assert_eq!(result.dy, 3.0);
        assert_eq!(result.guide_y.map(|g| g.source), Some(GuideSource::Node(id)));
    }

    #[test]
    fn out_of_tolerance_and_disabled() {
        let guides = GuideSet {
            xs: vec![Guide::canvas(Axis::X, 120.0, Feature::Left)],
            ys: vec![],
        };
        let b = Bounds::new(100.0, 0.0, 5.0, 5.0);
        assert_eq!(
            snap_box(&b, &guides, &options(GuidePriority::CenterFirst)),
            SnapResult::default()
        );

        let mut off = options(GuidePriority::CenterFirst);
        off.enabled = false;
        let near = GuideSet {
            xs: vec![Guide::canvas(Axis::X, 101.0, Feature::Left)],
            ys: vec![],
        };
        assert_eq!(snap_box(&b, &near, &off), SnapResult::default());
    }

    #[test]
    fn collects_node_and_canvas_guides() {
        let mut scene = Scene::new();
        let keep = NodeId::intern("cg_keep");
        let skip = NodeId::intern("cg_skip");
        scene.nodes.push(crate::model::Node::balloon(keep, 50.0, 50.0, Default::default()));
        scene.nodes.push(crate::model::Node::balloon(skip, 90.0, 90.0, Default::default()));
        let mut guide =
            crate::model::Node::balloon(NodeId::intern("cg_guide"), 0.0, 0.0, Default::default());
        guide.guide = true;
        scene.nodes.push(guide);

        let set = collect_guides(&scene, &HashSet::from([skip]));
        assert_eq!(set.xs.len(), 6);
        assert_eq!(set.ys.len(), 6);
        assert_eq!(set.xs[0].source, GuideSource::Node(keep));
        assert_eq!(set.xs[5].value, 1600.0);
    }
}
