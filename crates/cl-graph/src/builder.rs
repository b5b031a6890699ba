//! Incremental graph builder.

use cl_core::{EdgeId, Real, VarId};
use cl_model::{ComponentKind, InfluenceSign, Model, ResponseFunction, validate_model};
use std::collections::HashMap;

use crate::error::{GraphError, GraphResult};
use crate::graph::{CausalGraph, InfluenceEdge, VarNode};
use crate::validate;

/// Builder for constructing a causal graph incrementally.
///
/// Use `add_variable` and `add_influence` to build up the graph,
/// then call `build()` to validate and freeze it into an immutable
/// `CausalGraph`. `from_model` does all of this for a declarative model.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<VarNode>,
    edges: Vec<InfluenceEdge>,
    next_node_id: u32,
    next_edge_id: u32,
}

impl GraphBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the causal graph of a model.
    ///
    /// One node per variable (in `entity.component` order) and one edge per
    /// enabled influence. Disabled influences are left out entirely.
    pub fn from_model(model: &Model) -> GraphResult<CausalGraph> {
        validate_model(model)?;

        let mut builder = GraphBuilder::new();
        let mut ids: HashMap<String, VarId> = HashMap::with_capacity(model.variable_count());
        for var in model.variables() {
            let id = builder.add_variable(
                var.entity,
                var.component,
                var.def.kind,
                var.def.initial,
                var.def.min,
                var.def.max,
            );
            ids.insert(var.id(), id);
        }

        // Nodes were added in this same order, so the position is the id.
        for (index, var) in model.variables().enumerate() {
            let target_name = var.id();
            let target = VarId::from_index(index as u32);
            for influence in var.def.enabled_influences() {
                let source_name =
                    model.resolve_source(var.entity, var.component, &influence.source);
                let source = *ids
                    .get(&source_name)
                    .ok_or_else(|| GraphError::UnknownVariable {
                        name: source_name.clone(),
                        context: format!("influences of {target_name}"),
                    })?;
                builder.add_influence(
                    source,
                    target,
                    influence.sign,
                    influence.coefficient,
                    influence.response,
                );
            }
        }

        builder.build()
    }

    /// Add a variable node and return its ID.
    pub fn add_variable(
        &mut self,
        entity: impl Into<String>,
        component: impl Into<String>,
        kind: ComponentKind,
        initial: Real,
        min: Option<Real>,
        max: Option<Real>,
    ) -> VarId {
        let id = VarId::from_index(self.next_node_id);
        self.next_node_id += 1;
        let entity = entity.into();
        let component = component.into();
        self.nodes.push(VarNode {
            id,
            name: cl_model::variable_id(&entity, &component),
            entity,
            component,
            kind,
            initial,
            min,
            max,
        });
        id
    }

    /// Add an influence edge `source -> target` and return its ID.
    pub fn add_influence(
        &mut self,
        source: VarId,
        target: VarId,
        sign: InfluenceSign,
        coefficient: Real,
        response: ResponseFunction,
    ) -> EdgeId {
        let id = EdgeId::from_index(self.next_edge_id);
        self.next_edge_id += 1;
        self.edges.push(InfluenceEdge {
            id,
            source,
            target,
            sign,
            coefficient,
            response,
        });
        id
    }

    /// Build and validate the graph, returning an immutable `CausalGraph`.
    pub fn build(self) -> GraphResult<CausalGraph> {
        let by_name = validate::validate_structure(&self.nodes, &self.edges)?;

        let (out_offsets, out_edges) =
            Self::build_adjacency(self.nodes.len(), &self.edges, |e| e.source);
        let (in_offsets, in_edges) =
            Self::build_adjacency(self.nodes.len(), &self.edges, |e| e.target);

        Ok(CausalGraph {
            nodes: self.nodes,
            edges: self.edges,
            by_name,
            out_offsets,
            out_edges,
            in_offsets,
            in_edges,
        })
    }

    /// Build compact adjacency lists keyed by the endpoint `key` picks.
    fn build_adjacency(
        node_count: usize,
        edges: &[InfluenceEdge],
        key: impl Fn(&InfluenceEdge) -> VarId,
    ) -> (Vec<usize>, Vec<EdgeId>) {
        // Group edges by node
        let mut per_node: Vec<Vec<EdgeId>> = vec![Vec::new(); node_count];
        for edge in edges {
            per_node[key(edge).slot()].push(edge.id);
        }

        // Build offsets and flat list (edge ids ascend within each node)
        let mut offsets = Vec::with_capacity(node_count + 1);
        let mut flat = Vec::with_capacity(edges.len());
        offsets.push(0);
        for list in &mut per_node {
            list.sort_by_key(|e| e.index());
            flat.extend_from_slice(list);
            offsets.push(flat.len());
        }

        (offsets, flat)
    }
}
