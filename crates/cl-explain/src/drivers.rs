//! Top drivers of the primary outcome.

use cl_core::{Real, is_negligible};
use serde::{Deserialize, Serialize};

use crate::contribution::Contribution;
use crate::result::Direction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    /// 1-based.
    pub rank: usize,
    pub variable: String,
    pub display_name: String,
    /// Share relative to the largest contributor, 0..=100.
    pub impact: Real,
    /// Effect of raising the driver on the outcome, not the way it moved.
    pub direction: Direction,
    pub percentage: Real,
}

/// Rank contributors by |percentage| (ties by name) and keep the top `k`.
/// An inconclusive decomposition has no drivers.
pub fn rank_drivers(contribution: &Contribution, k: usize) -> Vec<Driver> {
    if contribution.inconclusive {
        return Vec::new();
    }
    let mut ordered: Vec<_> = contribution.contributors.iter().collect();
    ordered.sort_by(|a, b| {
        b.percentage
            .abs()
            .total_cmp(&a.percentage.abs())
            .then_with(|| a.variable.cmp(&b.variable))
    });
    ordered.truncate(k);

    let max = ordered.first().map_or(0.0, |c| c.percentage.abs());
    ordered
        .into_iter()
        .enumerate()
        .map(|(i, c)| Driver {
            rank: i + 1,
            variable: c.variable.clone(),
            display_name: c.display_name.clone(),
            impact: if is_negligible(max) {
                0.0
            } else {
                c.percentage.abs() / max * 100.0
            },
            direction: c.effect,
            percentage: c.percentage,
        })
        .collect()
}
