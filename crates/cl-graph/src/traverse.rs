//! Cycle-safe path enumeration.
//!
//! Paths never revisit a node. The visited set belongs to the path being
//! extended (marked on descent, cleared on backtrack), so a node used by one
//! path stays available to every other path.

use cl_core::{EdgeId, VarId};

use crate::graph::CausalGraph;

/// Bounds on a path search.
#[derive(Debug, Clone, Copy)]
pub struct PathLimits {
    /// Maximum number of edges in a path.
    pub max_depth: usize,
    /// Stop after this many complete paths.
    pub max_paths: usize,
}

impl Default for PathLimits {
    fn default() -> Self {
        Self {
            max_depth: 6,
            max_paths: 10_000,
        }
    }
}

/// All simple paths `from -> ... -> to` as edge sequences, in depth-first
/// order over ascending edge ids.
///
/// Self loops are never part of a path. `from == to` yields no paths.
pub fn simple_paths(
    graph: &CausalGraph,
    from: VarId,
    to: VarId,
    limits: PathLimits,
) -> Vec<Vec<EdgeId>> {
    let mut found = Vec::new();
    if from == to || graph.node(from).is_none() || graph.node(to).is_none() {
        return found;
    }

    let mut on_path = vec![false; graph.nodes().len()];
    let mut stack = Vec::with_capacity(limits.max_depth);
    on_path[from.slot()] = true;
    extend(graph, from, to, limits, &mut on_path, &mut stack, &mut found);
    found
}

fn extend(
    graph: &CausalGraph,
    at: VarId,
    to: VarId,
    limits: PathLimits,
    on_path: &mut [bool],
    stack: &mut Vec<EdgeId>,
    found: &mut Vec<Vec<EdgeId>>,
) {
    if stack.len() >= limits.max_depth {
        return;
    }
    for &edge_id in graph.outgoing(at) {
        if found.len() >= limits.max_paths {
            return;
        }
        let Some(edge) = graph.edge(edge_id) else {
            continue;
        };
        let next = edge.target;
        if on_path[next.slot()] {
            continue;
        }
        stack.push(edge_id);
        if next == to {
            found.push(stack.clone());
        } else {
            on_path[next.slot()] = true;
            extend(graph, next, to, limits, on_path, stack, found);
            on_path[next.slot()] = false;
        }
        stack.pop();
    }
}
