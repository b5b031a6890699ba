//! Aggregate 0-100 health score.

use cl_core::{Real, VarId};
use cl_graph::CausalGraph;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::config::ViabilityConfig;
use crate::result::Direction;
use crate::series::SeriesTable;
use crate::timeline::{EventKind, Severity, TimelineEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    pub fn from_score(score: Real) -> Self {
        if score >= 70.0 {
            RiskLevel::Low
        } else if score >= 50.0 {
            RiskLevel::Medium
        } else if score >= 30.0 {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilityLevel {
    Good,
    Moderate,
    Unstable,
}

impl StabilityLevel {
    pub fn label(self) -> &'static str {
        match self {
            StabilityLevel::Good => "good",
            StabilityLevel::Moderate => "moderate",
            StabilityLevel::Unstable => "unstable",
        }
    }

    pub fn from_fraction(fraction: Real) -> Self {
        if fraction >= 0.6 {
            StabilityLevel::Good
        } else if fraction >= 0.3 {
            StabilityLevel::Moderate
        } else {
            StabilityLevel::Unstable
        }
    }
}

/// One scoring term and the points it added or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViabilityFactor {
    pub name: String,
    pub impact: Real,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viability {
    pub score: Real,
    pub trend: Trend,
    pub risk_level: RiskLevel,
    pub stability: StabilityLevel,
    pub within_bounds_fraction: Real,
    pub stable_fraction: Real,
    pub factors: Vec<ViabilityFactor>,
}

/// Score the run from the final state, the timeline and the outcome's net
/// direction.
pub fn score_viability(
    graph: &CausalGraph,
    table: &SeriesTable,
    outcome: Option<VarId>,
    timeline: &[TimelineEvent],
    previous_score: Option<Real>,
    cfg: &ViabilityConfig,
) -> Viability {
    let nodes = graph.nodes();

    let bounded: Vec<_> = nodes
        .iter()
        .filter(|n| n.min.is_some() || n.max.is_some())
        .collect();
    let within_bounds_fraction = if bounded.is_empty() {
        1.0
    } else {
        let inside = bounded
            .iter()
            .filter(|n| {
                let v = table.final_value(n.id);
                n.min.is_none_or(|lo| v >= lo) && n.max.is_none_or(|hi| v <= hi)
            })
            .count();
        inside as Real / bounded.len() as Real
    };

    let stable_fraction = if table.len() < 3 || nodes.is_empty() {
        1.0
    } else {
        let stable: BTreeSet<&str> = timeline
            .iter()
            .filter(|e| e.event == EventKind::Stability)
            .map(|e| e.variable.as_str())
            .collect();
        nodes.iter().filter(|n| stable.contains(n.name.as_str())).count() as Real
            / nodes.len() as Real
    };

    let direction = outcome.map_or(Direction::Neutral, |id| {
        let initial = table.initial(id);
        let change = table.final_value(id) - initial;
        let deadband = cfg.direction_deadband * initial.abs();
        if change > deadband && change > 0.0 {
            Direction::Positive
        } else if change < -deadband && change < 0.0 {
            Direction::Negative
        } else {
            Direction::Neutral
        }
    });
    let direction_points = match direction {
        Direction::Positive => cfg.direction_weight,
        Direction::Negative => -cfg.direction_weight,
        Direction::Neutral => 0.0,
    };

    let criticals = timeline.iter().filter(|e| e.severity == Severity::Critical).count();
    let warnings = timeline.iter().filter(|e| e.severity == Severity::Warning).count();
    let penalty = (cfg.critical_penalty * criticals as Real + cfg.warning_penalty * warnings as Real)
        .min(cfg.max_penalty);

    let bounds_points = cfg.bounds_weight * within_bounds_fraction;
    let stability_points = cfg.stability_weight * stable_fraction;
    let raw = cfg.base + bounds_points + stability_points + direction_points - penalty;
    let score = if raw.is_finite() { raw.clamp(0.0, 100.0) } else { 0.0 };

    let trend = match previous_score {
        Some(prev) if score - prev > cfg.trend_deadband => Trend::Up,
        Some(prev) if prev - score > cfg.trend_deadband => Trend::Down,
        _ => Trend::Stable,
    };

    let factors = vec![
        factor("Baseline", cfg.base),
        factor("Variables within bounds", bounds_points),
        factor("Stable variables", stability_points),
        factor("Outcome direction", direction_points),
        factor("Timeline alerts", -penalty),
    ];

    Viability {
        score,
        trend,
        risk_level: RiskLevel::from_score(score),
        stability: StabilityLevel::from_fraction(stable_fraction),
        within_bounds_fraction,
        stable_fraction,
        factors,
    }
}

fn factor(name: &str, impact: Real) -> ViabilityFactor {
    ViabilityFactor {
        name: name.to_string(),
        impact,
        direction: Direction::of(impact),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cl_graph::GraphBuilder;
    use cl_model::ComponentKind;
    use cl_trace::{Snapshot, Trace};

    /// A.x and C.z bounded to [0, 1], B.y free; three rows.
    fn fixture(last: [f64; 3]) -> (CausalGraph, SeriesTable) {
        let mut b = GraphBuilder::new();
        b.add_variable("A", "x", ComponentKind::State, 0.5, Some(0.0), Some(1.0));
        b.add_variable("B", "y", ComponentKind::State, 1.0, None, None);
        b.add_variable("C", "z", ComponentKind::State, 0.5, Some(0.0), Some(1.0));
        let g = b.build().unwrap();
        let rows = [[0.5, 1.0, 0.5], [0.5, 1.5, 1.0], last];
        let history = rows
            .iter()
            .map(|row| {
                ["A.x", "B.y", "C.z"]
                    .iter()
                    .zip(row)
                    .map(|(n, v)| (n.to_string(), *v))
                    .collect::<Snapshot>()
            })
            .collect();
        let trace = Trace::new(vec![0.0, 1.0, 2.0], history).unwrap();
        let table = SeriesTable::new(&g, &trace).unwrap();
        (g, table)
    }

    fn event(variable: &str, event: EventKind, severity: Severity) -> TimelineEvent {
        TimelineEvent {
            time: 1.0,
            index: 1,
            variable: variable.into(),
            display_name: variable.into(),
            event,
            severity,
            value: 0.0,
            description: String::new(),
        }
    }

    fn impact(v: &Viability, name: &str) -> Real {
        v.factors.iter().find(|f| f.name == name).unwrap().impact
    }

    #[test]
    fn score_adds_up_its_factors() {
        let (g, table) = fixture([0.5, 2.0, 2.0]);
        let outcome = g.find("B.y");
        let timeline = [
            event("A.x", EventKind::Stability, Severity::Info),
            event("C.z", EventKind::ThresholdCross, Severity::Critical),
            event("B.y", EventKind::Peak, Severity::Warning),
        ];
        let v = score_viability(&g, &table, outcome, &timeline, None, &ViabilityConfig::default());

        // 20 + 40 * 1/2 + 30 * 1/3 + 10 - (8 + 2)
        assert!((v.score - 50.0).abs() < 1e-9);
        assert_eq!(v.within_bounds_fraction, 0.5);
        assert!((v.stable_fraction - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(impact(&v, "Baseline"), 20.0);
        assert_eq!(impact(&v, "Variables within bounds"), 20.0);
        assert!((impact(&v, "Stable variables") - 10.0).abs() < 1e-9);
        assert_eq!(impact(&v, "Outcome direction"), 10.0);
        assert_eq!(impact(&v, "Timeline alerts"), -10.0);
        let sum: Real = v.factors.iter().map(|f| f.impact).sum();
        assert!((sum - v.score).abs() < 1e-9);
        assert_eq!(v.risk_level, RiskLevel::Medium);
        assert_eq!(v.stability, StabilityLevel::Moderate);
        assert_eq!(v.trend, Trend::Stable);
    }

    #[test]
    fn alert_penalty_is_capped() {
        let (g, table) = fixture([0.5, 2.0, 2.0]);
        let timeline: Vec<_> = (0..5)
            .map(|_| event("C.z", EventKind::ThresholdCross, Severity::Critical))
            .collect();
        let v = score_viability(&g, &table, g.find("B.y"), &timeline, None, &ViabilityConfig::default());
        assert_eq!(impact(&v, "Timeline alerts"), -30.0);
        // 20 + 20 + 0 + 10 - 30
        assert!((v.score - 20.0).abs() < 1e-9);
        assert_eq!(v.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn falling_outcome_costs_points() {
        let (g, table) = fixture([0.5, 0.5, 0.5]);
        let v = score_viability(&g, &table, g.find("B.y"), &[], None, &ViabilityConfig::default());
        assert_eq!(impact(&v, "Outcome direction"), -10.0);
        assert_eq!(v.factors[3].direction, Direction::Negative);
        // 20 + 40 + 0 - 10
        assert!((v.score - 50.0).abs() < 1e-9);
    }

    #[test]
    fn trend_compares_with_previous_score() {
        let (g, table) = fixture([0.5, 2.0, 2.0]);
        let cfg = ViabilityConfig::default();
        let outcome = g.find("B.y");
        // Score is 20 + 20 + 0 + 10 = 50.
        let trend = |prev| score_viability(&g, &table, outcome, &[], prev, &cfg).trend;
        assert_eq!(trend(Some(45.0)), Trend::Up);
        assert_eq!(trend(Some(55.0)), Trend::Down);
        assert_eq!(trend(Some(48.5)), Trend::Stable);
        assert_eq!(trend(Some(52.0)), Trend::Stable);
        assert_eq!(trend(None), Trend::Stable);
    }

    #[test]
    fn risk_bands() {
        assert_eq!(RiskLevel::from_score(70.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(69.9), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(30.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(29.9), RiskLevel::Critical);
        assert_eq!(StabilityLevel::from_fraction(0.6), StabilityLevel::Good);
        assert_eq!(StabilityLevel::from_fraction(0.3), StabilityLevel::Moderate);
        assert_eq!(StabilityLevel::from_fraction(0.0), StabilityLevel::Unstable);
    }
}
