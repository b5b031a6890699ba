//! What-if projections.
//!
//! A scenario is re-simulated through a [`ScenarioRunner`] when one is
//! available. The runner call is bounded by a timeout; on timeout or error
//! the projection falls back to the elasticity-based linear estimate and is
//! flagged approximate.
//!
//! Threads cannot be cancelled: a runner that times out keeps running
//! detached until `simulate` returns, and its result is dropped. Runners
//! that may take long should check their own deadline.

use cl_core::{Real, VarId, safe_ratio};
use cl_graph::CausalGraph;
use cl_trace::Trace;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::sensitivity::Sensitivity;
use crate::series::SeriesTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterChange {
    pub variable: String,
    pub new_value: Real,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    pub name: String,
    pub changes: Vec<ParameterChange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionMethod {
    Simulation,
    LinearApproximation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub baseline: Real,
    pub projected: Real,
    pub delta: Real,
    /// 0 when the baseline is 0.
    pub delta_percent: Real,
    pub parameters: Vec<ParameterChange>,
    pub method: ProjectionMethod,
    pub approximate: bool,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Scenario runner failed: {message}")]
pub struct RunnerError {
    pub message: String,
}

impl RunnerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Re-simulates the model with parameter changes applied.
///
/// Called on its own thread; the call is abandoned, not stopped, when it
/// outlives the projector's timeout.
pub trait ScenarioRunner: Send + Sync {
    fn simulate(&self, changes: &[ParameterChange]) -> Result<Trace, RunnerError>;
}

/// Baseline state a projection starts from.
#[derive(Clone, Copy)]
pub struct Baseline<'a> {
    pub graph: &'a CausalGraph,
    pub table: &'a SeriesTable,
    pub outcome: VarId,
    pub sensitivities: &'a [Sensitivity],
}

#[derive(Clone)]
pub struct ScenarioProjector {
    runner: Option<Arc<dyn ScenarioRunner>>,
    timeout: Duration,
}

impl ScenarioProjector {
    pub fn new(runner: Option<Arc<dyn ScenarioRunner>>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    /// Project every scenario, in order.
    pub fn compare(
        &self,
        base: Baseline<'_>,
        scenarios: &[ScenarioDefinition],
    ) -> Vec<ScenarioResult> {
        scenarios.iter().map(|s| self.project(base, s)).collect()
    }

    pub fn project(&self, base: Baseline<'_>, scenario: &ScenarioDefinition) -> ScenarioResult {
        let baseline = base.table.final_value(base.outcome);
        let simulated = self.runner.as_ref().and_then(|runner| {
            match self.run_bounded(Arc::clone(runner), scenario.changes.clone()) {
                Ok(trace) => {
                    let outcome = base.graph.name(base.outcome);
                    let value = trace
                        .final_state()
                        .and_then(|s| s.get(outcome))
                        .copied()
                        .filter(|v| v.is_finite());
                    if value.is_none() {
                        debug!(scenario = %scenario.name, outcome, "runner trace lacks the outcome");
                    }
                    value
                }
                Err(e) => {
                    warn!(scenario = %scenario.name, error = %e, "falling back to linear projection");
                    None
                }
            }
        });

        let (projected, method) = match simulated {
            Some(v) => (v, ProjectionMethod::Simulation),
            None => (
                linear_projection(base, baseline, &scenario.changes),
                ProjectionMethod::LinearApproximation,
            ),
        };
        let delta = projected - baseline;
        ScenarioResult {
            name: scenario.name.clone(),
            baseline,
            projected,
            delta,
            delta_percent: safe_ratio(delta, baseline.abs()).map_or(0.0, |r| r * 100.0),
            parameters: scenario.changes.clone(),
            method,
            approximate: method == ProjectionMethod::LinearApproximation,
        }
    }

    fn run_bounded(
        &self,
        runner: Arc<dyn ScenarioRunner>,
        changes: Vec<ParameterChange>,
    ) -> Result<Trace, RunnerError> {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("scenario-runner".into())
            .spawn(move || {
                // The receiver is gone after a timeout.
                let _ = tx.send(runner.simulate(&changes));
            })
            .map_err(|e| RunnerError::new(e.to_string()))?;
        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(RunnerError::new(format!(
                "no result within {} ms",
                self.timeout.as_millis()
            ))),
            Err(RecvTimeoutError::Disconnected) => {
                Err(RunnerError::new("runner stopped without a result"))
            }
        }
    }
}

/// `baseline + |baseline| * Σ e_i * (new_i - cur_i) / |cur_i|`.
pub fn linear_projection(base: Baseline<'_>, baseline: Real, changes: &[ParameterChange]) -> Real {
    let relative: Real = changes
        .iter()
        .map(|change| {
            let elasticity = base
                .sensitivities
                .iter()
                .find(|s| s.variable == change.variable)
                .map_or(0.0, |s| s.elasticity);
            let Some(id) = base.graph.find(&change.variable) else {
                return 0.0;
            };
            let current = base.table.final_value(id);
            match safe_ratio(change.new_value - current, current.abs()) {
                Some(r) => elasticity * r,
                None => {
                    debug!(variable = %change.variable, "zero current value, change ignored");
                    0.0
                }
            }
        })
        .sum();
    let projected = baseline + baseline.abs() * relative;
    if projected.is_finite() { projected } else { baseline }
}
