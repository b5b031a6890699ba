//! The explainability record.

use chrono::{DateTime, Utc};
use cl_core::{Real, signum0};
use serde::{Deserialize, Serialize};

use crate::contribution::Contribution;
use crate::drivers::Driver;
use crate::narrator::Insight;
use crate::paths::CriticalPath;
use crate::scenario::ScenarioResult;
use crate::sensitivity::Sensitivity;
use crate::timeline::TimelineEvent;
use crate::viability::Viability;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Positive,
    Negative,
    Neutral,
}

impl Direction {
    pub fn of(value: Real) -> Self {
        match signum0(value) {
            1 => Direction::Positive,
            -1 => Direction::Negative,
            _ => Direction::Neutral,
        }
    }
}

/// Everything one pass computed. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainableResult {
    /// Token of the pass that produced this record.
    pub generation: u64,
    /// Primary outcome variable; `None` for an empty model.
    pub outcome: Option<String>,
    pub main_drivers: Vec<Driver>,
    pub sensitivities: Vec<Sensitivity>,
    /// Primary outcome first, then the requested extra targets.
    pub contributions: Vec<Contribution>,
    pub critical_paths: Vec<CriticalPath>,
    pub scenarios: Vec<ScenarioResult>,
    pub timeline: Vec<TimelineEvent>,
    pub viability: Viability,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insight: Option<Insight>,
    pub computed_at: DateTime<Utc>,
}

impl ExplainableResult {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// JSON of everything except `computed_at`. Equal inputs give equal
    /// strings.
    pub fn content_json(&self) -> serde_json::Result<String> {
        let mut value = serde_json::to_value(self)?;
        if let Some(map) = value.as_object_mut() {
            map.remove("computed_at");
        }
        serde_json::to_string(&value)
    }

    pub fn contribution_for(&self, variable: &str) -> Option<&Contribution> {
        self.contributions.iter().find(|c| c.target == variable)
    }

    pub fn sensitivity_for(&self, variable: &str) -> Option<&Sensitivity> {
        self.sensitivities.iter().find(|s| s.variable == variable)
    }
}
