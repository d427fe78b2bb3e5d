//! Stacking order operations on an ordered node list.
//!
//! The list order is the draw order (index 0 is at the back). Every
//! operation returns whether the order changed; callers reindex.

use crate::id::NodeId;
use crate::model::Node;
use std::collections::HashSet;

/// Make `z_index` match array position.
pub fn reindex(nodes: &mut [Node]) {
    for (i, node) in nodes.iter_mut().enumerate() {
        node.z_index = i;
    }
}

fn order(nodes: &[Node]) -> Vec<NodeId> {
    nodes.iter().map(|n| n.id).collect()
}

/// Move the selection to the top, keeping its relative order.
pub fn bring_to_front(nodes: &mut Vec<Node>, selected: &HashSet<NodeId>) -> bool {
    let before = order(nodes);
    let (mut rest, picked): (Vec<Node>, Vec<Node>) =
        nodes.drain(..).partition(|n| !selected.contains(&n.id));
    rest.extend(picked);
    *nodes = rest;
    before != order(nodes)
}

/// Move the selection to the bottom, keeping its relative order.
pub fn send_to_back(nodes: &mut Vec<Node>, selected: &HashSet<NodeId>) -> bool {
    let before = order(nodes);
    let (mut picked, rest): (Vec<Node>, Vec<Node>) =
        nodes.drain(..).partition(|n| selected.contains(&n.id));
    picked.extend(rest);
    *nodes = picked;
    before != order(nodes)
}

/// Step every selected node one place up. A selected node only swaps with
/// an unselected neighbor, so a selected block moves as a unit.
pub fn bring_forward(nodes: &mut [Node], selected: &HashSet<NodeId>) -> bool {
    let mut changed = false;
    for i in (0..nodes.len().saturating_sub(1)).rev() {
        if selected.contains(&nodes[i].id) && !selected.contains(&nodes[i + 1].id) {
            nodes.swap(i, i + 1);
            changed = true;
        }
    }
    changed
}

/// Step every selected node one place down; see [`bring_forward`].
pub fn send_backward(nodes: &mut [Node], selected: &HashSet<NodeId>) -> bool {
    let mut changed = false;
    for i in 1..nodes.len() {
        if selected.contains(&nodes[i].id) && !selected.contains(&nodes[i - 1].id) {
            nodes.swap(i, i - 1);
            changed = true;
        }
    }
    changed
}

/// Put the listed ids first (back-most), in the given order, followed by
/// every other node in its current order. Unknown ids are skipped.
pub fn reorder_by_ids(nodes: &mut Vec<Node>, ordered: &[NodeId]) -> bool {
    let before = order(nodes);
    let mut remaining: Vec<Option<Node>> = nodes.drain(..).map(Some).collect();
    let mut next = Vec::with_capacity(remaining.len());
    for id in ordered {
        if let Some(slot) = remaining
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|n| n.id == *id))
        {
            next.extend(slot.take());
        }
    }
    next.extend(remaining.into_iter().flatten());
    *nodes = next;
    before != order(nodes)
}

/// Re-stack a group's members in the given front-to-back order, keeping the
/// block where its front-most member currently sits.
pub fn reorder_group_block(nodes: &mut Vec<Node>, front_to_back: &[NodeId]) -> bool {
    let members: HashSet<NodeId> = front_to_back.iter().copied().collect();
    let front: Vec<NodeId> = nodes.iter().rev().map(|n| n.id).collect();

    let insert_at = front
        .iter()
        .position(|id| members.contains(id))
        .unwrap_or(front.len());
    let mut next_front: Vec<NodeId> = front
        .iter()
        .copied()
        .filter(|id| !members.contains(id))
        .collect();
    let insert_at = insert_at.min(next_front.len());
    next_front.splice(insert_at..insert_at, front_to_back.iter().copied());

    let back_to_front: Vec<NodeId> = next_front.into_iter().rev().collect();
    reorder_by_ids(nodes, &back_to_front)
}
