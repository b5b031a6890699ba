//! Scenario re-simulation through the reference integrator.

use cl_explain::{ParameterChange, RunnerError, ScenarioRunner};
use cl_model::Model;
use cl_sim::{RunInputs, SimOptions, run_sim};
use cl_trace::Trace;
use std::collections::BTreeMap;

/// Re-runs a model with scenario changes layered over the baseline inputs.
#[derive(Debug, Clone)]
pub struct SimScenarioRunner {
    model: Model,
    options: SimOptions,
    baseline: RunInputs,
}

impl SimScenarioRunner {
    pub fn new(model: Model, options: SimOptions, baseline: RunInputs) -> Self {
        Self {
            model,
            options,
            baseline,
        }
    }

    fn inputs_for(&self, changes: &[ParameterChange]) -> RunInputs {
        let mut inputs = self.baseline.clone();
        let overrides: BTreeMap<String, f64> = changes
            .iter()
            .map(|c| (c.variable.clone(), c.new_value))
            .collect();
        inputs.parameter_changes.extend(overrides);
        inputs
    }
}

impl ScenarioRunner for SimScenarioRunner {
    fn simulate(&self, changes: &[ParameterChange]) -> Result<Trace, RunnerError> {
        run_sim(&self.model, &self.options, &self.inputs_for(changes))
            .map_err(|e| RunnerError::new(e.to_string()))
    }
}
