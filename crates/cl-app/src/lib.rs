//! Shared application service layer for causalens.
//!
//! Centralizes what a frontend needs: loading models, configs and traces,
//! running and caching simulations, and explain passes with graph caching
//! and stale-result discarding.

pub mod error;
pub mod explain_service;
pub mod graph_cache;
pub mod model_service;
pub mod progress;
pub mod query;
pub mod run_service;
pub mod sim_runner;

// Re-export key types for convenience
pub use error::{AppError, AppResult};
pub use explain_service::{ExplainSession, ScenarioMode};
pub use graph_cache::GraphCache;
pub use model_service::{ModelSummary, load_config, load_model, load_trace, validate_model};
pub use progress::{RunProgressEvent, RunStage};
pub use query::{
    RunSummary, export_series_csv, export_trace_csv, extract_entity_series, extract_variable_series,
    get_run_summary, list_variable_ids,
};
pub use run_service::{
    RunOptions, RunRequest, RunResponse, ensure_run, ensure_run_with_progress, list_runs, load_run,
};
pub use sim_runner::SimScenarioRunner;
