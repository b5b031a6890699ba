//! Graph validation logic.

use cl_core::VarId;
use std::collections::HashMap;

use crate::error::{GraphError, GraphResult};
use crate::graph::{InfluenceEdge, VarNode};

/// Validate the graph structure and return the name index.
///
/// Checks that ids are contiguous, names unique, edge endpoints exist and
/// coefficients are finite.
pub(crate) fn validate_structure(
    nodes: &[VarNode],
    edges: &[InfluenceEdge],
) -> GraphResult<HashMap<String, VarId>> {
    let mut by_name = HashMap::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        if node.id.slot() != i {
            return Err(GraphError::IdNotFound { what: "node" });
        }
        if by_name.insert(node.name.clone(), node.id).is_some() {
            return Err(GraphError::DuplicateVariable {
                name: node.name.clone(),
            });
        }
    }

    for (i, edge) in edges.iter().enumerate() {
        if edge.id.slot() != i {
            return Err(GraphError::IdNotFound { what: "edge" });
        }
        for endpoint in [edge.source, edge.target] {
            if endpoint.slot() >= nodes.len() {
                return Err(GraphError::InvalidNodeRef {
                    edge: edge.id,
                    node: endpoint,
                });
            }
        }
        if !edge.coefficient.is_finite() {
            return Err(GraphError::NonFiniteCoefficient { edge: edge.id });
        }
    }

    Ok(by_name)
}
