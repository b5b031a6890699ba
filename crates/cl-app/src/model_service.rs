//! Loading and validating models, configs and traces.

use cl_explain::ExplainConfig;
use cl_model::{ComponentKind, Model};
use cl_trace::Trace;
use std::path::Path;

use crate::error::{AppError, AppResult};

/// Counts shown after validating a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSummary {
    pub entity_count: usize,
    pub variable_count: usize,
    pub influence_count: usize,
    pub disabled_influence_count: usize,
    pub state_count: usize,
    pub computed_count: usize,
    pub constant_count: usize,
}

/// Load a model from YAML or JSON (by extension) and validate it.
pub fn load_model(path: &Path) -> AppResult<Model> {
    Ok(cl_model::load_model(path)?)
}

/// Validate a model and build its graph, returning a summary.
pub fn validate_model(model: &Model) -> AppResult<ModelSummary> {
    let graph = cl_graph::GraphBuilder::from_model(model)?;
    let count = |kind: ComponentKind| model.variables().filter(|v| v.def.kind == kind).count();
    let total_influences: usize = model.variables().map(|v| v.def.influences.len()).sum();
    Ok(ModelSummary {
        entity_count: model.entities.len(),
        variable_count: graph.nodes().len(),
        influence_count: graph.edges().len(),
        disabled_influence_count: total_influences - graph.edges().len(),
        state_count: count(ComponentKind::State),
        computed_count: count(ComponentKind::Computed),
        constant_count: count(ComponentKind::Constant),
    })
}

/// Load an engine config from YAML or JSON. `None` gives the defaults.
pub fn load_config(path: Option<&Path>) -> AppResult<ExplainConfig> {
    let Some(path) = path else {
        return Ok(ExplainConfig::default());
    };
    let content = std::fs::read_to_string(path).map_err(|e| AppError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let parsed = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&content).map_err(|e| e.to_string()),
        _ => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
    };
    parsed.map_err(|message| AppError::Config {
        path: path.to_path_buf(),
        message,
    })
}

/// Load a trace JSON file (`{ "time_points": [...], "history": [...] }`).
pub fn load_trace(path: &Path) -> AppResult<Trace> {
    Ok(cl_trace::load_trace_file(path)?)
}
