//! Explain passes with graph caching and stale-result discarding.

use cl_explain::{ExplainConfig, ExplainRequest, ExplainableResult, Explainer, GenerationCounter};
use cl_model::Model;
use cl_sim::{RunInputs, SimOptions};
use cl_trace::Trace;
use std::sync::Arc;

use crate::error::AppResult;
use crate::graph_cache::GraphCache;
use crate::sim_runner::SimScenarioRunner;

/// How scenarios are projected.
#[derive(Debug, Clone, Default)]
pub enum ScenarioMode {
    /// Elasticity-based estimate only.
    #[default]
    Linear,
    /// Re-simulate with the reference integrator, linear on failure.
    Simulate { options: SimOptions, baseline: RunInputs },
}

/// Long-lived explain state for one frontend: config, graph cache and the
/// generation counter. A pass whose token is no longer the latest when it
/// finishes is reported as [`crate::AppError::Superseded`].
#[derive(Debug, Default)]
pub struct ExplainSession {
    config: ExplainConfig,
    graphs: GraphCache,
    generations: GenerationCounter,
}

impl ExplainSession {
    pub fn new(config: ExplainConfig) -> Self {
        Self {
            config,
            graphs: GraphCache::new(),
            generations: GenerationCounter::new(),
        }
    }

    pub fn config(&self) -> &ExplainConfig {
        &self.config
    }

    pub fn cached_graphs(&self) -> usize {
        self.graphs.len()
    }

    /// Tag a new pass. Issuing a token supersedes every earlier one.
    pub fn begin(&self) -> u64 {
        self.generations.next()
    }

    /// Run a full pass under a fresh token.
    pub fn explain(
        &self,
        model: &Model,
        trace: &Trace,
        request: &ExplainRequest,
        scenarios: &ScenarioMode,
    ) -> AppResult<ExplainableResult> {
        let token = self.begin();
        self.explain_as(token, model, trace, request, scenarios)
    }

    /// Run a pass under `token`, accepted only if no newer pass began.
    pub fn explain_as(
        &self,
        token: u64,
        model: &Model,
        trace: &Trace,
        request: &ExplainRequest,
        scenarios: &ScenarioMode,
    ) -> AppResult<ExplainableResult> {
        let graph = self.graphs.get_or_build(model)?;
        let mut explainer = Explainer::new(self.config.clone());
        if let ScenarioMode::Simulate { options, baseline } = scenarios {
            explainer = explainer.with_runner(Arc::new(SimScenarioRunner::new(
                model.clone(),
                *options,
                baseline.clone(),
            )));
        }
        let result = explainer.explain(&graph, trace, request, token)?;
        Ok(self.generations.accept(token, result)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppError;
    use cl_explain::{ParameterChange, ProjectionMethod, ScenarioDefinition};
    use cl_sim::run_sim;

    fn model() -> Model {
        serde_yaml::from_str(
            r#"
entities:
  Funding:
    components:
      level: { type: state, initial: 0.6, min: 0.3, max: 1.0 }
  Teachers:
    components:
      retention:
        type: state
        initial: 0.5
        min: 0.0
        max: 1.0
        influences:
          - { from: Funding.level, coef: 0.5, kind: positive }
          - { from: self, coef: -0.1, kind: decay }
simulation: { dt: 0.1, steps: 40 }
"#,
        )
        .unwrap()
    }

    #[test]
    fn superseded_pass_is_rejected() {
        let session = ExplainSession::default();
        let m = model();
        let opts = SimOptions::from(&m.simulation);
        let trace = run_sim(&m, &opts, &RunInputs::default()).unwrap();

        let old = session.begin();
        let _newer = session.begin();
        let stale = session.explain_as(
            old,
            &m,
            &trace,
            &ExplainRequest::default(),
            &ScenarioMode::Linear,
        );
        assert!(matches!(stale, Err(AppError::Superseded { .. })));

        let fresh = session
            .explain(&m, &trace, &ExplainRequest::default(), &ScenarioMode::Linear)
            .unwrap();
        assert_eq!(fresh.outcome.as_deref(), Some("Teachers.retention"));
        assert_eq!(session.cached_graphs(), 1);
    }

    #[test]
    fn simulated_scenarios_are_exact() {
        let session = ExplainSession::default();
        let m = model();
        let opts = SimOptions::from(&m.simulation);
        let trace = run_sim(&m, &opts, &RunInputs::default()).unwrap();
        let request = ExplainRequest {
            scenarios: vec![ScenarioDefinition {
                name: "full funding".into(),
                changes: vec![ParameterChange {
                    variable: "Funding.level".into(),
                    new_value: 1.0,
                }],
            }],
            ..ExplainRequest::default()
        };
        let mode = ScenarioMode::Simulate {
            options: opts,
            baseline: RunInputs::default(),
        };
        let result = session.explain(&m, &trace, &request, &mode).unwrap();
        let scenario = &result.scenarios[0];
        assert_eq!(scenario.method, ProjectionMethod::Simulation);
        assert!(!scenario.approximate);
        assert!(scenario.delta > 0.0);
    }
}
