//! Tunables for every analysis.
//!
//! All sections deserialize with defaults, so a config file only needs the
//! values it changes.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainConfig {
    pub sensitivity: SensitivityConfig,
    pub contribution: ContributionConfig,
    pub drivers: DriverConfig,
    pub paths: PathConfig,
    pub timeline: TimelineConfig,
    pub viability: ViabilityConfig,
    pub scenario: ScenarioConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityConfig {
    /// Perturbation as a fraction of the lever's bound range.
    pub perturbation_fraction: f64,
    /// Longest lever -> outcome path followed.
    pub max_depth: usize,
    pub max_paths: usize,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            perturbation_fraction: 0.01,
            max_depth: 6,
            max_paths: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContributionConfig {
    /// Depth (in edges from the target) of reported indirect causes.
    pub indirect_depth: usize,
}

impl Default for ContributionConfig {
    fn default() -> Self {
        Self { indirect_depth: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub top_k: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    pub max_depth: usize,
    /// Cap on complete paths enumerated across all sources.
    pub max_explored_paths: usize,
    pub top_n: usize,
    /// Sources must have |elasticity| above this.
    pub min_source_elasticity: f64,
    /// Impact above which a path is a risk or an opportunity.
    pub significance: f64,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            max_explored_paths: 10_000,
            top_n: 3,
            min_source_elasticity: 0.0,
            significance: 0.01,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Peak/trough prominence as a fraction of the observed range.
    pub prominence_fraction: f64,
    /// Minimum second-difference swing as a fraction of the observed range.
    pub inflection_fraction: f64,
    /// Trailing window as a fraction of the trace length (at least 2 points).
    pub stability_window_fraction: f64,
    /// Maximum standard deviation of a stable window, relative to scale.
    pub stability_epsilon: f64,
    pub divergence_multiple: f64,
    /// Distance to a bound, as a fraction of the bound range, that warns.
    pub bound_margin_fraction: f64,
    /// Same-kind events of one variable closer than this fraction of the
    /// duration collapse to one.
    pub dedup_window_fraction: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            prominence_fraction: 0.02,
            inflection_fraction: 0.01,
            stability_window_fraction: 0.10,
            stability_epsilon: 0.01,
            divergence_multiple: 3.0,
            bound_margin_fraction: 0.05,
            dedup_window_fraction: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViabilityConfig {
    pub base: f64,
    pub bounds_weight: f64,
    pub stability_weight: f64,
    pub direction_weight: f64,
    /// Relative outcome change below which the direction is flat.
    pub direction_deadband: f64,
    pub critical_penalty: f64,
    pub warning_penalty: f64,
    pub max_penalty: f64,
    /// Score change vs the previous score below which the trend is stable.
    pub trend_deadband: f64,
}

impl Default for ViabilityConfig {
    fn default() -> Self {
        Self {
            base: 20.0,
            bounds_weight: 40.0,
            stability_weight: 30.0,
            direction_weight: 10.0,
            direction_deadband: 0.01,
            critical_penalty: 8.0,
            warning_penalty: 2.0,
            max_penalty: 30.0,
            trend_deadband: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Time allowed for one re-simulation, in milliseconds.
    pub runner_timeout_ms: u64,
}

impl ScenarioConfig {
    pub fn runner_timeout(&self) -> Duration {
        Duration::from_millis(self.runner_timeout_ms)
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            runner_timeout_ms: 2_000,
        }
    }
}
