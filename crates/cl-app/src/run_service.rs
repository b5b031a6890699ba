//! Run execution and caching service.

use cl_model::{Model, SimulationSettings};
use cl_sim::{RUNNER_VERSION, RunInputs, SimOptions, SimProgress};
use cl_trace::{RunManifest, RunStore, Trace};
use std::path::Path;
use std::time::Instant;
use tracing::info;

use crate::error::AppResult;
use crate::model_service;
use crate::progress::{RunProgressEvent, RunStage};

/// Options for running simulations.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub use_cache: bool,
    /// Overrides the model's `simulation.dt`.
    pub dt: Option<f64>,
    /// Overrides the model's `simulation.steps`.
    pub steps: Option<usize>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            dt: None,
            steps: None,
        }
    }
}

/// Request to execute a run.
pub struct RunRequest<'a> {
    pub model_path: &'a Path,
    pub inputs: RunInputs,
    pub options: RunOptions,
    /// Run store root; defaults to `.causalens/runs` next to the model.
    pub store_dir: Option<&'a Path>,
}

/// Response from a run execution.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub trace: Trace,
    /// Model with the request's influence changes applied.
    pub model: Model,
    pub settings: SimulationSettings,
    pub loaded_from_cache: bool,
    pub elapsed_s: f64,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    started: Instant,
    message: &str,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent::stage(
            stage,
            started.elapsed().as_secs_f64(),
            Some(message.to_string()),
        ));
    }
}

fn open_store(request: &RunRequest) -> AppResult<RunStore> {
    Ok(match request.store_dir {
        Some(dir) => RunStore::new(dir.to_path_buf())?,
        None => RunStore::for_model_file(request.model_path)?,
    })
}

/// Execute or load a run based on request.
pub fn ensure_run(request: &RunRequest) -> AppResult<RunResponse> {
    ensure_run_with_progress(request, None)
}

/// Execute or load a run and stream progress events.
pub fn ensure_run_with_progress(
    request: &RunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();

    emit_progress(&mut progress_cb, RunStage::LoadingModel, started, "Loading model");
    let loaded = model_service::load_model(request.model_path)?;

    // Influence changes become part of the model, so the model digest
    // covers them.
    let model = request.inputs.apply_influences(&loaded)?;
    let parameter_changes = request.inputs.parameter_changes.clone();
    let settings = SimulationSettings {
        dt: request.options.dt.unwrap_or(model.simulation.dt),
        steps: request.options.steps.unwrap_or(model.simulation.steps),
    };

    emit_progress(&mut progress_cb, RunStage::CheckingCache, started, "Checking run cache");
    let run_id = cl_trace::compute_run_id(&model, &settings, &parameter_changes, RUNNER_VERSION);
    let store = open_store(request)?;

    if request.options.use_cache && store.has_run(&run_id) {
        emit_progress(
            &mut progress_cb,
            RunStage::LoadingCachedResult,
            started,
            "Loading cached run",
        );
        let manifest = store.load_manifest(&run_id)?;
        let trace = store.load_trace(&run_id)?;
        emit_progress(&mut progress_cb, RunStage::Completed, started, "Loaded from cache");
        info!(run_id = %run_id, "run loaded from cache");
        return Ok(RunResponse {
            run_id,
            manifest,
            trace,
            model,
            settings,
            loaded_from_cache: true,
            elapsed_s: started.elapsed().as_secs_f64(),
        });
    }

    emit_progress(&mut progress_cb, RunStage::Simulating, started, "Simulating");
    let opts = SimOptions::from(&settings);
    let inputs = RunInputs::with_parameters(parameter_changes.clone());
    let trace = {
        let mut forward = |p: SimProgress| {
            if let Some(cb) = progress_cb.as_deref_mut() {
                cb(RunProgressEvent {
                    stage: RunStage::Simulating,
                    elapsed_wall_s: started.elapsed().as_secs_f64(),
                    message: None,
                    simulation: Some(p),
                });
            }
        };
        cl_sim::run_sim_with_progress(&model, &opts, &inputs, Some(&mut forward))?
    };

    emit_progress(&mut progress_cb, RunStage::SavingResults, started, "Saving results");
    let manifest = RunManifest::stamped(
        run_id.clone(),
        cl_trace::model_digest(&model),
        &settings,
        parameter_changes,
        RUNNER_VERSION,
    );
    store.save_run(&manifest, &trace)?;

    emit_progress(&mut progress_cb, RunStage::Completed, started, "Run complete");
    info!(run_id = %run_id, points = trace.len(), "run stored");
    Ok(RunResponse {
        run_id,
        manifest,
        trace,
        model,
        settings,
        loaded_from_cache: false,
        elapsed_s: started.elapsed().as_secs_f64(),
    })
}

/// Stored runs of a model, oldest first.
pub fn list_runs(store: &RunStore, model: &Model) -> AppResult<Vec<RunManifest>> {
    Ok(store.list_runs(&cl_trace::model_digest(model))?)
}

pub fn load_run(store: &RunStore, run_id: &str) -> AppResult<(RunManifest, Trace)> {
    Ok((store.load_manifest(run_id)?, store.load_trace(run_id)?))
}
