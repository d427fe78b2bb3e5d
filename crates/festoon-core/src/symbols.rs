//! Symbol instance expansion and the symbol reference graph.

use crate::geometry::{self, Bounds};
use crate::id::SymbolId;
use crate::model::{Node, NodeKind, Symbol};
use petgraph::algo::{has_path_connecting, is_cyclic_directed};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// Nesting levels followed before expansion is truncated.
pub const MAX_SYMBOL_DEPTH: usize = 8;

/// Nodes visited by one expansion before the rest is dropped. Bounds the
/// fan-out of wide reference cycles, which the depth limit alone lets
/// grow as width^depth.
pub const MAX_EXPANDED_NODES: usize = 10_000;

/// Flatten an instance into leaf nodes in its parent's space.
///
/// Each child's offset is scaled and rotated by the instance transform;
/// rotations add, scales and opacities multiply. Nested instances are
/// followed up to [`MAX_SYMBOL_DEPTH`] levels and at most
/// [`MAX_EXPANDED_NODES`] nodes are visited; content past either limit is
/// dropped. A non-instance node expands to itself.
pub fn expand_instance(instance: &Node, symbols: &[Symbol]) -> Vec<Node> {
    let mut expansion = Expansion {
        symbols,
        budget: MAX_EXPANDED_NODES,
        out: Vec::new(),
    };
    expansion.visit(instance, 0);
    if expansion.budget == 0 {
        log::debug!("symbol expansion of {} hit the node budget", instance.id);
    }
    expansion.out
}

struct Expansion<'a> {
    symbols: &'a [Symbol],
    budget: usize,
    out: Vec<Node>,
}

impl Expansion<'_> {
    fn visit(&mut self, node: &Node, depth: usize) {
        if self.budget == 0 {
            return;
        }
        self.budget -= 1;
        let NodeKind::SymbolInstance { symbol_id } = node.kind else {
            self.out.push(node.clone());
            return;
        };
        if depth >= MAX_SYMBOL_DEPTH {
            log::trace!("symbol expansion truncated at {} (depth {depth})", node.id);
            return;
        }
        let symbols = self.symbols;
        let Some(symbol) = symbols.iter().find(|s| s.id == symbol_id) else {
            return;
        };
        for child in &symbol.nodes {
            if self.budget == 0 {
                return;
            }
            self.visit(&compose(node, child), depth + 1);
        }
    }
}

/// Apply `parent`'s transform to `child` (whose position is local).
pub fn compose(parent: &Node, child: &Node) -> Node {
    let (sin, cos) = parent.rotation.to_radians().sin_cos();
    let lx = child.x * parent.scale_x;
    let ly = child.y * parent.scale_y;

    let mut placed = child.clone();
    placed.x = parent.x + lx * cos - ly * sin;
    placed.y = parent.y + lx * sin + ly * cos;
    placed.rotation = parent.rotation + child.rotation;
    placed.scale_x = parent.scale_x * child.scale_x;
    placed.scale_y = parent.scale_y * child.scale_y;
    placed.opacity = parent.opacity * child.opacity;
    placed.visible = parent.visible && child.visible;
    placed.locked = parent.locked || child.locked;
    placed.guide = parent.guide || child.guide;
    placed.group_id = None;
    placed
}

/// Union of a symbol's content in its own local space.
pub fn symbol_local_bounds(symbol: &Symbol, symbols: &[Symbol]) -> Option<Bounds> {
    geometry::union_bounds(symbol.nodes.iter(), symbols)
}

/// Edge `a -> b` when symbol `a` contains an instance of symbol `b`.
pub fn reference_graph(
    symbols: &[Symbol],
) -> (DiGraph<SymbolId, ()>, HashMap<SymbolId, NodeIndex>) {
    let mut graph = DiGraph::new();
    let mut index = HashMap::new();
    for symbol in symbols {
        index
            .entry(symbol.id)
            .or_insert_with(|| graph.add_node(symbol.id));
    }
    for symbol in symbols {
        let from = index[&symbol.id];
        for referenced in symbol.nodes.iter().filter_map(Node::symbol_id) {
            if let Some(&to) = index.get(&referenced) {
                graph.update_edge(from, to, ());
            }
        }
    }
    (graph, index)
}

/// Would placing an instance of `referenced` inside `container` close a loop?
pub fn would_create_cycle(symbols: &[Symbol], container: SymbolId, referenced: SymbolId) -> bool {
    if container == referenced {
        return true;
    }
    let (graph, index) = reference_graph(symbols);
    match (index.get(&referenced), index.get(&container)) {
        (Some(&from), Some(&to)) => has_path_connecting(&graph, from, to, None),
        _ => false,
    }
}

/// True when the library already contains a reference cycle.
pub fn has_cycle(symbols: &[Symbol]) -> bool {
    let (graph, _) = reference_graph(symbols);
    is_cyclic_directed(&graph)
}
