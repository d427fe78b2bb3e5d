//! Align and distribute target computation.

use crate::geometry::node_bounds;
use crate::id::NodeId;
use crate::model::{Node, Symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignMode {
    Left,
    Right,
    CenterX,
    Top,
    Bottom,
    CenterY,
}

impl AlignMode {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "left" => Self::Left,
            "right" => Self::Right,
            "center-x" => Self::CenterX,
            "top" => Self::Top,
            "bottom" => Self::Bottom,
            "center-y" => Self::CenterY,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributeAxis {
    X,
    Y,
}

/// New center for each node so its box lines up with the others'.
/// Fewer than two nodes yields nothing.
pub fn align_targets(
    nodes: &[&Node],
    symbols: &[Symbol],
    mode: AlignMode,
) -> Vec<(NodeId, f32, f32)> {
    if nodes.len() < 2 {
        return Vec::new();
    }
    let boxes: Vec<_> = nodes.iter().map(|n| (*n, node_bounds(n, symbols))).collect();
    let min_left = boxes.iter().map(|(_, b)| b.left()).fold(f32::INFINITY, f32::min);
    let max_right = boxes.iter().map(|(_, b)| b.right()).fold(f32::NEG_INFINITY, f32::max);
    let min_top = boxes.iter().map(|(_, b)| b.top()).fold(f32::INFINITY, f32::min);
    let max_bottom = boxes.iter().map(|(_, b)| b.bottom()).fold(f32::NEG_INFINITY, f32::max);
    let center_x = (min_left + max_right) / 2.0;
    let center_y = (min_top + max_bottom) / 2.0;

    boxes
        .into_iter()
        .map(|(node, b)| {
            let (bcx, bcy) = b.center();
            let (dx, dy) = match mode {
                AlignMode::Left => (min_left - b.left(), 0.0),
                AlignMode::Right => (max_right - b.right(), 0.0),
                AlignMode::CenterX => (center_x - bcx, 0.0),
                AlignMode::Top => (0.0, min_top - b.top()),
                AlignMode::Bottom => (0.0, max_bottom - b.bottom()),
                AlignMode::CenterY => (0.0, center_y - bcy),
            };
            (node.id, node.x + dx, node.y + dy)
        })
        .collect()
}

/// Even spacing of centers along `axis` between the two extreme nodes,
/// which stay put. Only the interior nodes are returned; fewer than three
/// nodes yields nothing.
pub fn distribute_targets(nodes: &[&Node], axis: DistributeAxis) -> Vec<(NodeId, f32)> {
    if nodes.len() < 3 {
        return Vec::new();
    }
    let coord = |n: &Node| match axis {
        DistributeAxis::X => n.x,
        DistributeAxis::Y => n.y,
    };
    let mut sorted: Vec<&Node> = nodes.to_vec();
    sorted.sort_by(|a, b| coord(a).total_cmp(&coord(b)));

    let start = coord(sorted[0]);
    let end = coord(sorted[sorted.len() - 1]);
    let gap = (end - start) / (sorted.len() - 1) as f32;
    sorted[1..sorted.len() - 1]
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id, start + gap * (i + 1) as f32))
        .collect()
}
