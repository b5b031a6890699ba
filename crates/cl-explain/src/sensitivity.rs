//! Lever elasticities and control levels.
//!
//! A lever's perturbation is pushed along every simple path to the outcome
//! by differencing each edge's influence term at the final operating point.
//! The central difference of the two pushes gives the outcome response.

use cl_core::{EdgeId, Real, VarId, is_negligible, safe_ratio};
use cl_graph::{CausalGraph, PathLimits, VarNode, simple_paths};
use cl_model::ComponentKind;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SensitivityConfig;
use crate::series::SeriesTable;

/// How directly an operator can set a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlLevel {
    /// Settable with nothing driving it.
    High,
    /// Settable but also driven by influences.
    Medium,
    /// Derived from other variables.
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensitivity {
    pub variable: String,
    pub display_name: String,
    pub elasticity: Real,
    pub control_level: ControlLevel,
    pub is_lever: bool,
    /// Final trace value.
    pub current_value: Real,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Real>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Real>,
    /// Lever value projected to reach the outcome target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_value: Option<Real>,
    pub low_confidence: bool,
}

/// Bounded settable variables.
pub fn is_lever(node: &VarNode) -> bool {
    node.kind.is_settable() && node.bounds().is_some()
}

pub fn control_level(graph: &CausalGraph, node: &VarNode) -> ControlLevel {
    match node.kind {
        ComponentKind::Computed => ControlLevel::Low,
        ComponentKind::Constant => ControlLevel::High,
        ComponentKind::State => {
            if graph.external_incoming(node.id).next().is_none() {
                ControlLevel::High
            } else {
                ControlLevel::Medium
            }
        }
    }
}

/// Sensitivities of every lever and computed variable against `outcome`,
/// ordered by |elasticity| descending, ties by name.
pub fn estimate_sensitivities(
    graph: &CausalGraph,
    table: &SeriesTable,
    outcome: VarId,
    outcome_target: Option<Real>,
    cfg: &SensitivityConfig,
) -> Vec<Sensitivity> {
    let limits = PathLimits {
        max_depth: cfg.max_depth,
        max_paths: cfg.max_paths,
    };
    let candidates: Vec<&VarNode> = graph
        .nodes()
        .iter()
        .filter(|n| n.id != outcome && (is_lever(n) || n.kind == ComponentKind::Computed))
        .collect();

    let mut out: Vec<Sensitivity> = candidates
        .par_iter()
        .map(|node| {
            let (elasticity, low_confidence) =
                elasticity(graph, table, node, outcome, cfg.perturbation_fraction, limits);
            let lever = is_lever(node);
            let current = table.final_value(node.id);
            let suggested_value = outcome_target
                .filter(|_| lever && !is_negligible(elasticity))
                .and_then(|target| {
                    suggest_value(node, current, table.final_value(outcome), target, elasticity)
                });
            Sensitivity {
                variable: node.name.clone(),
                display_name: node.display_name(),
                elasticity,
                control_level: control_level(graph, node),
                is_lever: lever,
                current_value: current,
                min: node.min,
                max: node.max,
                suggested_value,
                low_confidence,
            }
        })
        .collect();

    out.sort_by(|a, b| {
        b.elasticity
            .abs()
            .total_cmp(&a.elasticity.abs())
            .then_with(|| a.variable.cmp(&b.variable))
    });
    out
}

/// Elasticity of `outcome` with respect to `lever` and whether it rests on
/// a degenerate denominator.
pub fn elasticity(
    graph: &CausalGraph,
    table: &SeriesTable,
    lever: &VarNode,
    outcome: VarId,
    fraction: Real,
    limits: PathLimits,
) -> (Real, bool) {
    let current = table.final_value(lever.id);
    let range = lever
        .bound_range()
        .filter(|r| *r > 0.0)
        .unwrap_or_else(|| current.abs().max(1.0));
    let h = fraction * range;

    let paths = simple_paths(graph, lever.id, outcome, limits);
    let push = |delta: Real| -> Real {
        paths
            .iter()
            .map(|p| propagate(graph, table, p, delta))
            .sum()
    };
    let d_outcome = (push(h) - push(-h)) / 2.0;

    // Magnitudes only: the sign is the direction of the outcome's response.
    let relative_outcome = safe_ratio(d_outcome, table.final_value(outcome).abs());
    let relative_lever = safe_ratio(h, current.abs());
    match (relative_outcome, relative_lever) {
        (Some(num), Some(den)) => match safe_ratio(num, den) {
            Some(e) => (e, false),
            None => {
                debug!(lever = %lever.name, "zero lever step, elasticity set to 0");
                (0.0, true)
            }
        },
        _ => {
            debug!(
                lever = %lever.name,
                outcome = graph.name(outcome),
                "zero denominator in elasticity, set to 0"
            );
            (0.0, true)
        }
    }
}

/// Push a change of the path's first source along its edges.
fn propagate(graph: &CausalGraph, table: &SeriesTable, path: &[EdgeId], delta: Real) -> Real {
    let mut d = delta;
    for edge in path.iter().filter_map(|e| graph.edge(*e)) {
        let xs = table.final_value(edge.source);
        let xt = table.final_value(edge.target);
        d = edge.term(xs + d, xt) - edge.term(xs, xt);
    }
    if d.is_finite() { d } else { 0.0 }
}

/// Linear inversion of the elasticity, clamped to the lever's bounds.
fn suggest_value(
    node: &VarNode,
    lever: Real,
    outcome: Real,
    target: Real,
    elasticity: Real,
) -> Option<Real> {
    let needed = safe_ratio(target - outcome, outcome.abs())?;
    let mut value = lever + lever.abs() * needed / elasticity;
    if !value.is_finite() {
        return None;
    }
    if let Some(lo) = node.min {
        value = value.max(lo);
    }
    if let Some(hi) = node.max {
        value = value.min(hi);
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cl_graph::GraphBuilder;
    use cl_model::{InfluenceSign, ResponseFunction};
    use cl_trace::{Snapshot, Trace};

    fn table_for(graph: &CausalGraph, rows: &[&[f64]]) -> SeriesTable {
        let times = (0..rows.len()).map(|i| i as f64).collect();
        let history = rows
            .iter()
            .map(|row| {
                graph
                    .nodes()
                    .iter()
                    .zip(row.iter())
                    .map(|(n, v)| (n.name.clone(), *v))
                    .collect::<Snapshot>()
            })
            .collect();
        SeriesTable::new(graph, &Trace::new(times, history).unwrap()).unwrap()
    }

    #[test]
    fn linear_chain_elasticity() {
        let mut b = GraphBuilder::new();
        let lever = b.add_variable("A", "lever", ComponentKind::State, 1.0, Some(0.0), Some(2.0));
        let out = b.add_variable("B", "out", ComponentKind::State, 1.0, None, None);
        b.add_influence(lever, out, InfluenceSign::Positive, 0.5, ResponseFunction::Linear);
        let g = b.build().unwrap();
        let table = table_for(&g, &[&[1.0, 1.0], &[1.0, 2.0]]);

        let s = estimate_sensitivities(&g, &table, out, Some(3.0), &SensitivityConfig::default());
        assert_eq!(s.len(), 1);
        // d_out = 0.5 * h, h = 0.02: (0.01 / 2) / (0.02 / 1) = 0.25
        assert!((s[0].elasticity - 0.25).abs() < 1e-9);
        assert_eq!(s[0].control_level, ControlLevel::High);
        assert!(!s[0].low_confidence);
        // 1 * (1 + 0.5 / 0.25) = 3, clamped to 2
        assert_eq!(s[0].suggested_value, Some(2.0));
    }

    #[test]
    fn negative_and_unreachable() {
        let mut b = GraphBuilder::new();
        let lever = b.add_variable("A", "lever", ComponentKind::State, 1.0, Some(0.0), Some(2.0));
        b.add_variable("A", "idle", ComponentKind::State, 1.0, Some(0.0), Some(2.0));
        let out = b.add_variable("B", "out", ComponentKind::Computed, 1.0, None, None);
        b.add_influence(lever, out, InfluenceSign::Negative, 0.5, ResponseFunction::Linear);
        let g = b.build().unwrap();
        let table = table_for(&g, &[&[1.0, 1.0, 1.0]]);
        let s = estimate_sensitivities(&g, &table, out, None, &SensitivityConfig::default());
        assert_eq!(s[0].variable, "A.lever");
        assert!(s[0].elasticity < 0.0);
        assert_eq!(s[1].variable, "A.idle");
        assert_eq!(s[1].elasticity, 0.0);
        assert_eq!(s[1].suggested_value, None);
    }

    #[test]
    fn negative_outcome_keeps_the_response_sign() {
        let mut b = GraphBuilder::new();
        let lever = b.add_variable("A", "lever", ComponentKind::State, 1.0, Some(0.0), Some(2.0));
        let out = b.add_variable("B", "out", ComponentKind::State, -2.0, None, None);
        b.add_influence(lever, out, InfluenceSign::Positive, 0.5, ResponseFunction::Linear);
        let g = b.build().unwrap();
        let table = table_for(&g, &[&[1.0, -2.0]]);

        let s = estimate_sensitivities(&g, &table, out, Some(-1.0), &SensitivityConfig::default());
        // (0.01 / |-2|) / (0.02 / 1) = 0.25
        assert!((s[0].elasticity - 0.25).abs() < 1e-9);
        // Raising the lever raises the outcome toward -1: 1 + 0.5 / 0.25 = 3, clamped.
        assert_eq!(s[0].suggested_value, Some(2.0));
    }

    #[test]
    fn zero_outcome_is_low_confidence() {
        let mut b = GraphBuilder::new();
        let lever = b.add_variable("A", "lever", ComponentKind::State, 1.0, Some(0.0), Some(2.0));
        let out = b.add_variable("B", "out", ComponentKind::State, 0.0, None, None);
        b.add_influence(lever, out, InfluenceSign::Positive, 0.5, ResponseFunction::Linear);
        let g = b.build().unwrap();
        let table = table_for(&g, &[&[1.0, 0.0]]);
        let s = estimate_sensitivities(&g, &table, out, None, &SensitivityConfig::default());
        assert_eq!(s[0].elasticity, 0.0);
        assert!(s[0].low_confidence);
    }

    #[test]
    fn control_levels() {
        let mut b = GraphBuilder::new();
        let k = b.add_variable("A", "k", ComponentKind::Constant, 1.0, Some(0.0), Some(2.0));
        let s = b.add_variable("A", "s", ComponentKind::State, 1.0, Some(0.0), Some(2.0));
        let c = b.add_variable("A", "c", ComponentKind::Computed, 1.0, None, None);
        b.add_influence(k, s, InfluenceSign::Positive, 1.0, ResponseFunction::Linear);
        b.add_influence(c, c, InfluenceSign::Decay, -0.1, ResponseFunction::Linear);
        let g = b.build().unwrap();
        let level = |id| control_level(&g, g.node(id).unwrap());
        assert_eq!(level(k), ControlLevel::High);
        assert_eq!(level(s), ControlLevel::Medium);
        assert_eq!(level(c), ControlLevel::Low);
    }
}
