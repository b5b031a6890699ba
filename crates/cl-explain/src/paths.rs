//! Critical causal chains into the outcome.

use cl_core::{EdgeId, Real, VarId};
use cl_graph::{CausalGraph, PathLimits, simple_paths};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::config::PathConfig;
use crate::sensitivity::Sensitivity;
use crate::series::SeriesTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathNature {
    Risk,
    Opportunity,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalPath {
    /// Variable ids from source to outcome.
    pub variables: Vec<String>,
    /// e.g. `Funding level (+)→ Teachers retention`.
    pub description: String,
    /// Σ |coef| * |Δsource| over the edges.
    pub impact: Real,
    pub coefficient_product: Real,
    /// Product of edge signs: -1, 0 or +1.
    pub net_sign: i8,
    pub nature: PathNature,
}

impl CriticalPath {
    pub fn len(&self) -> usize {
        self.variables.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Highest-impact simple paths from the path sources to `outcome`.
///
/// Sources are levers whose |elasticity| exceeds the configured minimum, or
/// every root node when no lever qualifies.
pub fn extract_critical_paths(
    graph: &CausalGraph,
    table: &SeriesTable,
    outcome: VarId,
    sensitivities: &[Sensitivity],
    cfg: &PathConfig,
) -> Vec<CriticalPath> {
    let mut sources: Vec<VarId> = sensitivities
        .iter()
        .filter(|s| s.is_lever && s.elasticity.abs() > cfg.min_source_elasticity)
        .filter_map(|s| graph.find(&s.variable))
        .collect();
    if sources.is_empty() {
        sources = graph
            .nodes()
            .iter()
            .filter(|n| n.id != outcome && graph.is_root(n.id))
            .map(|n| n.id)
            .collect();
    }
    sources.sort();

    let mut remaining = cfg.max_explored_paths;
    let mut found = Vec::new();
    for source in sources {
        if remaining == 0 {
            break;
        }
        let limits = PathLimits {
            max_depth: cfg.max_depth,
            max_paths: remaining,
        };
        let paths = simple_paths(graph, source, outcome, limits);
        remaining = remaining.saturating_sub(paths.len());
        found.extend(paths.iter().map(|p| describe(graph, table, source, p, cfg)));
    }

    found.sort_by(|a, b| {
        b.impact
            .total_cmp(&a.impact)
            .then_with(|| b.coefficient_product.total_cmp(&a.coefficient_product))
            .then_with(|| a.variables.cmp(&b.variables))
    });
    found.truncate(cfg.top_n);
    found
}

fn describe(
    graph: &CausalGraph,
    table: &SeriesTable,
    source: VarId,
    path: &[EdgeId],
    cfg: &PathConfig,
) -> CriticalPath {
    let mut variables = vec![graph.name(source).to_string()];
    let mut description = String::new();
    let mut impact = 0.0;
    let mut coefficient_product = 1.0;
    let mut net_sign: i8 = 1;

    for edge in path.iter().filter_map(|e| graph.edge(*e)) {
        let sign = edge.nominal_sign();
        impact += edge.coefficient.abs() * table.delta(edge.source).abs();
        coefficient_product *= edge.coefficient.abs();
        net_sign *= sign;
        let mark = match sign.cmp(&0) {
            Ordering::Greater => "+",
            Ordering::Less => "−",
            Ordering::Equal => "0",
        };
        let from = graph.node(edge.source).map(|n| n.display_name()).unwrap_or_default();
        description.push_str(&format!("{from} ({mark})→ "));
        variables.push(graph.name(edge.target).to_string());
    }
    if let Some(last) = path.last().and_then(|e| graph.edge(*e)) {
        description.push_str(&graph.node(last.target).map(|n| n.display_name()).unwrap_or_default());
    }

    let significant = impact > cfg.significance;
    let nature = match net_sign {
        s if s < 0 && significant => PathNature::Risk,
        s if s > 0 && significant => PathNature::Opportunity,
        _ => PathNature::Neutral,
    };
    CriticalPath {
        variables,
        description,
        impact,
        coefficient_product,
        net_sign,
        nature,
    }
}
