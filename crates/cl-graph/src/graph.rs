//! Core graph data structures.

use cl_core::{EdgeId, Real, VarId};
use cl_model::{ComponentKind, InfluenceSign, ResponseFunction};
use std::collections::HashMap;

/// A variable of the model (`entity.component`).
#[derive(Debug, Clone, PartialEq)]
pub struct VarNode {
    pub id: VarId,
    /// Full `entity.component` id.
    pub name: String,
    pub entity: String,
    pub component: String,
    pub kind: ComponentKind,
    pub initial: Real,
    pub min: Option<Real>,
    pub max: Option<Real>,
}

impl VarNode {
    /// Human-facing label: `Entity component`, underscores as spaces.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.entity, self.component).replace('_', " ")
    }

    pub fn bounds(&self) -> Option<(Real, Real)> {
        Some((self.min?, self.max?))
    }

    pub fn bound_range(&self) -> Option<Real> {
        self.bounds().map(|(lo, hi)| hi - lo)
    }
}

/// An enabled influence `source -> target`.
#[derive(Debug, Clone, PartialEq)]
pub struct InfluenceEdge {
    pub id: EdgeId,
    pub source: VarId,
    pub target: VarId,
    pub sign: InfluenceSign,
    pub coefficient: Real,
    pub response: ResponseFunction,
}

impl InfluenceEdge {
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// The causal graph: a validated, immutable set of variables and influences.
///
/// Edges are stored once; per-node incoming and outgoing edge lists are
/// compact offset arrays (sorted by edge id for determinism). Cycles are
/// allowed.
#[derive(Debug, Clone)]
pub struct CausalGraph {
    pub(crate) nodes: Vec<VarNode>,
    pub(crate) edges: Vec<InfluenceEdge>,
    pub(crate) by_name: HashMap<String, VarId>,

    /// node i's outgoing edges are out_edges[out_offsets[i]..out_offsets[i+1]].
    pub(crate) out_offsets: Vec<usize>,
    pub(crate) out_edges: Vec<EdgeId>,

    /// node i's incoming edges are in_edges[in_offsets[i]..in_offsets[i+1]].
    pub(crate) in_offsets: Vec<usize>,
    pub(crate) in_edges: Vec<EdgeId>,
}

impl CausalGraph {
    /// Return all nodes.
    pub fn nodes(&self) -> &[VarNode] {
        &self.nodes
    }

    /// Return all edges.
    pub fn edges(&self) -> &[InfluenceEdge] {
        &self.edges
    }

    /// Get a node by ID (returns None if ID out of bounds).
    pub fn node(&self, id: VarId) -> Option<&VarNode> {
        self.nodes.get(id.slot())
    }

    /// Get an edge by ID (returns None if ID out of bounds).
    pub fn edge(&self, id: EdgeId) -> Option<&InfluenceEdge> {
        self.edges.get(id.slot())
    }

    /// Resolve a variable id to its node.
    pub fn find(&self, name: &str) -> Option<VarId> {
        self.by_name.get(name).copied()
    }

    /// Variable id of a node, or an empty string for an unknown node.
    pub fn name(&self, id: VarId) -> &str {
        self.node(id).map_or("", |n| n.name.as_str())
    }

    /// Edges leaving a node.
    pub fn outgoing(&self, id: VarId) -> &[EdgeId] {
        slice_of(&self.out_offsets, &self.out_edges, id)
    }

    /// Edges entering a node.
    pub fn incoming(&self, id: VarId) -> &[EdgeId] {
        slice_of(&self.in_offsets, &self.in_edges, id)
    }

    pub fn in_degree(&self, id: VarId) -> usize {
        self.incoming(id).len()
    }

    /// Whether no influence points into this node.
    pub fn is_root(&self, id: VarId) -> bool {
        self.incoming(id).is_empty()
    }

    /// Incoming edges excluding self loops.
    pub fn external_incoming(&self, id: VarId) -> impl Iterator<Item = &InfluenceEdge> {
        self.incoming(id)
            .iter()
            .filter_map(|e| self.edge(*e))
            .filter(|e| !e.is_self_loop())
    }
}

fn slice_of<'a>(offsets: &[usize], flat: &'a [EdgeId], id: VarId) -> &'a [EdgeId] {
    let idx = id.slot();
    if idx + 1 >= offsets.len() {
        return &[];
    }
    &flat[offsets[idx]..offsets[idx + 1]]
}
