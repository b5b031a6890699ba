//! One explainability pass.

use chrono::Utc;
use cl_core::{Real, VarId};
use cl_graph::{CausalGraph, GraphBuilder};
use cl_model::Model;
use cl_trace::Trace;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::config::ExplainConfig;
use crate::contribution::decompose;
use crate::drivers::rank_drivers;
use crate::error::{ExplainError, ExplainResult};
use crate::narrator::narrate;
use crate::outcome::resolve_outcome;
use crate::paths::extract_critical_paths;
use crate::result::ExplainableResult;
use crate::scenario::{Baseline, ScenarioDefinition, ScenarioProjector, ScenarioRunner};
use crate::sensitivity::estimate_sensitivities;
use crate::series::SeriesTable;
use crate::timeline::detect_events;
use crate::viability::score_viability;

/// Caller-supplied inputs of a pass besides the model and trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainRequest {
    /// Overrides primary outcome resolution.
    pub outcome: Option<String>,
    /// Variables decomposed in addition to the outcome.
    pub extra_targets: Vec<String>,
    /// Desired outcome value; enables suggested lever values.
    pub outcome_target: Option<Real>,
    /// Score of the previous pass, for the trend.
    pub previous_score: Option<Real>,
    pub scenarios: Vec<ScenarioDefinition>,
    pub skip_insight: bool,
}

/// Runs passes with one configuration and an optional scenario runner.
#[derive(Clone, Default)]
pub struct Explainer {
    config: ExplainConfig,
    runner: Option<Arc<dyn ScenarioRunner>>,
}

impl Explainer {
    pub fn new(config: ExplainConfig) -> Self {
        Self {
            config,
            runner: None,
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn ScenarioRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn config(&self) -> &ExplainConfig {
        &self.config
    }

    /// Build the graph of `model` and explain `trace`.
    pub fn explain_model(
        &self,
        model: &Model,
        trace: &Trace,
        request: &ExplainRequest,
        generation: u64,
    ) -> ExplainResult<ExplainableResult> {
        let graph = GraphBuilder::from_model(model)?;
        self.explain(&graph, trace, request, generation)
    }

    /// Explain `trace` against an already built graph.
    #[instrument(skip_all, fields(generation = generation))]
    pub fn explain(
        &self,
        graph: &CausalGraph,
        trace: &Trace,
        request: &ExplainRequest,
        generation: u64,
    ) -> ExplainResult<ExplainableResult> {
        let cfg = &self.config;
        let table = SeriesTable::new(graph, trace)?;
        let outcome = resolve_outcome(graph, request.outcome.as_deref())?;
        let extra_targets = request
            .extra_targets
            .iter()
            .map(|name| lookup(graph, name))
            .collect::<ExplainResult<Vec<_>>>()?;
        for change in request.scenarios.iter().flat_map(|s| &s.changes) {
            lookup(graph, &change.variable)?;
        }

        let (timeline, sensitivities) = rayon::join(
            || detect_events(graph, &table, &cfg.timeline),
            || {
                outcome.map_or_else(Vec::new, |o| {
                    estimate_sensitivities(graph, &table, o, request.outcome_target, &cfg.sensitivity)
                })
            },
        );

        let mut targets: Vec<VarId> = outcome.into_iter().collect();
        for id in extra_targets {
            if !targets.contains(&id) {
                targets.push(id);
            }
        }
        let depth = cfg.contribution.indirect_depth;
        let contributions: Vec<_> = targets
            .iter()
            .map(|t| decompose(graph, &table, *t, depth))
            .collect();

        let main_drivers = match (outcome, contributions.first()) {
            (Some(_), Some(c)) => rank_drivers(c, cfg.drivers.top_k),
            _ => Vec::new(),
        };

        let critical_paths = outcome.map_or_else(Vec::new, |o| {
            extract_critical_paths(graph, &table, o, &sensitivities, &cfg.paths)
        });

        let viability = score_viability(
            graph,
            &table,
            outcome,
            &timeline,
            request.previous_score,
            &cfg.viability,
        );

        let scenarios = match outcome {
            Some(o) if !request.scenarios.is_empty() => {
                let projector =
                    ScenarioProjector::new(self.runner.clone(), cfg.scenario.runner_timeout());
                let base = Baseline {
                    graph,
                    table: &table,
                    outcome: o,
                    sensitivities: &sensitivities,
                };
                projector.compare(base, &request.scenarios)
            }
            _ => Vec::new(),
        };

        let insight =
            (!request.skip_insight).then(|| narrate(&viability, &main_drivers, &timeline));

        info!(
            outcome = outcome.map(|o| graph.name(o)),
            drivers = main_drivers.len(),
            events = timeline.len(),
            paths = critical_paths.len(),
            score = viability.score,
            "explain pass complete"
        );

        Ok(ExplainableResult {
            generation,
            outcome: outcome.map(|o| graph.name(o).to_string()),
            main_drivers,
            sensitivities,
            contributions,
            critical_paths,
            scenarios,
            timeline,
            viability,
            insight,
            computed_at: Utc::now(),
        })
    }
}

/// Explain with the default configuration and no scenario runner.
pub fn explain(
    model: &Model,
    trace: &Trace,
    request: &ExplainRequest,
) -> ExplainResult<ExplainableResult> {
    Explainer::default().explain_model(model, trace, request, 0)
}

fn lookup(graph: &CausalGraph, name: &str) -> ExplainResult<VarId> {
    graph.find(name).ok_or_else(|| ExplainError::UnknownVariable {
        name: name.to_string(),
    })
}
