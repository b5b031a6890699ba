//! Primary outcome resolution.

use cl_core::VarId;
use cl_graph::CausalGraph;
use cl_model::ComponentKind;

use crate::error::{ExplainError, ExplainResult};

/// Component name treated as the system's own health proxy.
pub const VIABILITY_COMPONENT: &str = "viability";

/// Pick the variable the explanation is about.
///
/// Order: explicit override, a component named `viability`, the first
/// computed variable, the variable with the most incoming influences (ties
/// by name), the first variable. `None` only for an empty graph.
pub fn resolve_outcome(
    graph: &CausalGraph,
    override_name: Option<&str>,
) -> ExplainResult<Option<VarId>> {
    if let Some(name) = override_name {
        return graph
            .find(name)
            .map(Some)
            .ok_or_else(|| ExplainError::UnknownVariable {
                name: name.to_string(),
            });
    }

    let nodes = graph.nodes();
    let by_name = nodes
        .iter()
        .find(|n| n.component == VIABILITY_COMPONENT)
        .or_else(|| nodes.iter().find(|n| n.kind == ComponentKind::Computed))
        .map(|n| n.id);
    if by_name.is_some() {
        return Ok(by_name);
    }

    // Model graphs list nodes by name, so the first maximum wins ties.
    let mut best: Option<(usize, VarId)> = None;
    for node in nodes {
        let degree = graph.external_incoming(node.id).count();
        if degree > 0 && best.is_none_or(|(d, _)| degree > d) {
            best = Some((degree, node.id));
        }
    }
    Ok(best.map(|(_, id)| id).or_else(|| nodes.first().map(|n| n.id)))
}
