//! Attribution of a variable's net change to its causes.
//!
//! Each direct influence contributes `gain(source_0, target_0) * Δsource`.
//! The first-order residual `Δtotal - Σterm` is spread over contributors in
//! proportion to `|term|`, so adjusted shares always add up to `Δtotal`.

use cl_core::{Real, VarId, is_negligible};
use cl_graph::CausalGraph;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::result::Direction;
use crate::series::SeriesTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    pub variable: String,
    pub display_name: String,
    /// First-order term before residual allocation.
    pub raw: Real,
    /// Term after residual allocation.
    pub adjusted: Real,
    /// Share of the target's net change, in percent.
    pub percentage: Real,
    /// Sign of the raw term.
    pub sign: Direction,
    /// What raising this source does to the target at the final operating
    /// point, independent of how the source moved.
    pub effect: Direction,
}

/// Upstream cause reached through one or more direct contributors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndirectContributor {
    pub variable: String,
    pub display_name: String,
    /// Intermediate variables, nearest to the target first.
    pub via: Vec<String>,
    /// Edges between this cause and the target.
    pub depth: usize,
    pub percentage: Real,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub target: String,
    pub display_name: String,
    pub initial: Real,
    pub final_value: Real,
    pub total_change: Real,
    /// `total_change` minus the sum of raw terms.
    pub residual: Real,
    pub contributors: Vec<Contributor>,
    /// Informational; not part of the 100% total.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indirect: Vec<IndirectContributor>,
    /// No net change or no incoming influences.
    pub inconclusive: bool,
    /// A gain was undefined and treated as zero.
    pub low_confidence: bool,
}

impl Contribution {
    pub fn percentage_sum(&self) -> Real {
        self.contributors.iter().map(|c| c.percentage).sum()
    }
}

/// Direct and indirect decomposition of `target`.
pub fn decompose(
    graph: &CausalGraph,
    table: &SeriesTable,
    target: VarId,
    indirect_depth: usize,
) -> Contribution {
    let (mut contribution, sources) = decompose_direct(graph, table, target);
    if indirect_depth >= 2 && !contribution.inconclusive {
        let mut visited = vec![target];
        for (source, c) in sources.iter().zip(&contribution.contributors) {
            if *source == target {
                continue;
            }
            visited.push(*source);
            let mut via = vec![c.variable.clone()];
            collect_indirect(
                graph,
                table,
                *source,
                c.percentage,
                2,
                indirect_depth,
                &mut visited,
                &mut via,
                &mut contribution.indirect,
            );
            visited.pop();
        }
    }
    contribution
}

/// Direct decomposition plus the source id of each contributor.
fn decompose_direct(
    graph: &CausalGraph,
    table: &SeriesTable,
    target: VarId,
) -> (Contribution, Vec<VarId>) {
    let initial = table.initial(target);
    let final_value = table.final_value(target);
    let total_change = final_value - initial;
    let mut low_confidence = false;

    // One entry per source; parallel influences are summed.
    let mut terms: Vec<(VarId, Real)> = Vec::new();
    let mut effects: Vec<(VarId, Real)> = Vec::new();
    for edge in graph.incoming(target).iter().filter_map(|e| graph.edge(*e)) {
        let gain = match edge.gain(table.initial(edge.source), initial) {
            Some(g) if g.is_finite() => g,
            _ => {
                debug!(
                    source = graph.name(edge.source),
                    target = graph.name(target),
                    "undefined gain, contribution set to 0"
                );
                low_confidence = true;
                0.0
            }
        };
        let mut term = gain * table.delta(edge.source);
        if !term.is_finite() {
            low_confidence = true;
            term = 0.0;
        }
        match terms.iter_mut().find(|(s, _)| *s == edge.source) {
            Some((_, t)) => *t += term,
            None => terms.push((edge.source, term)),
        }
        let effect = edge
            .gain(table.final_value(edge.source), final_value)
            .filter(|g| g.is_finite())
            .unwrap_or_else(|| Real::from(edge.nominal_sign()));
        match effects.iter_mut().find(|(s, _)| *s == edge.source) {
            Some((_, e)) => *e += effect,
            None => effects.push((edge.source, effect)),
        }
    }

    let raw_sum: Real = terms.iter().map(|(_, t)| t).sum();
    let residual = total_change - raw_sum;
    let inconclusive = terms.is_empty() || is_negligible(total_change);
    if inconclusive && !terms.is_empty() {
        debug!(target = graph.name(target), "no net change, shares set to 0");
    }

    let abs_sum: Real = terms.iter().map(|(_, t)| t.abs()).sum();
    let n = terms.len() as Real;
    let contributors = terms
        .iter()
        .zip(&effects)
        .map(|((source, raw), (_, effect))| {
            let (adjusted, percentage) = if inconclusive {
                (*raw, 0.0)
            } else {
                let weight = if is_negligible(abs_sum) {
                    1.0 / n
                } else {
                    raw.abs() / abs_sum
                };
                let adjusted = raw + residual * weight;
                (adjusted, adjusted / total_change * 100.0)
            };
            Contributor {
                variable: graph.name(*source).to_string(),
                display_name: graph.node(*source).map(|n| n.display_name()).unwrap_or_default(),
                raw: *raw,
                adjusted,
                percentage,
                sign: Direction::of(*raw),
                effect: Direction::of(*effect),
            }
        })
        .collect();

    let contribution = Contribution {
        target: graph.name(target).to_string(),
        display_name: graph.node(target).map(|n| n.display_name()).unwrap_or_default(),
        initial,
        final_value,
        total_change,
        residual,
        contributors,
        indirect: Vec::new(),
        inconclusive,
        low_confidence,
    };
    (contribution, terms.into_iter().map(|(s, _)| s).collect())
}

#[allow(clippy::too_many_arguments)]
fn collect_indirect(
    graph: &CausalGraph,
    table: &SeriesTable,
    node: VarId,
    share: Real,
    depth: usize,
    max_depth: usize,
    visited: &mut Vec<VarId>,
    via: &mut Vec<String>,
    out: &mut Vec<IndirectContributor>,
) {
    let (sub, sources) = decompose_direct(graph, table, node);
    if sub.inconclusive {
        return;
    }
    for (source, c) in sources.iter().zip(&sub.contributors) {
        if visited.contains(source) {
            continue;
        }
        let percentage = share * c.percentage / 100.0;
        out.push(IndirectContributor {
            variable: c.variable.clone(),
            display_name: c.display_name.clone(),
            via: via.clone(),
            depth,
            percentage,
        });
        if depth < max_depth {
            visited.push(*source);
            via.push(c.variable.clone());
            collect_indirect(
                graph,
                table,
                *source,
                percentage,
                depth + 1,
                max_depth,
                visited,
                via,
                out,
            );
            via.pop();
            visited.pop();
        }
    }
}
