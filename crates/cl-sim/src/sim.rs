//! Simulation runner producing traces.

use cl_model::{Model, SimulationSettings};
use cl_trace::{Snapshot, Trace};
use tracing::{debug, info};

use crate::error::{SimError, SimResult};
use crate::integrator::CompiledSystem;
use crate::overrides::RunInputs;

/// Identifies the integrator in run manifests.
pub const RUNNER_VERSION: &str = concat!("cl-sim/", env!("CARGO_PKG_VERSION"), "/euler");

/// Options for simulation runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimOptions {
    /// Fixed time step
    pub dt: f64,
    /// Number of steps after the initial point
    pub steps: usize,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self::from(&SimulationSettings::default())
    }
}

impl From<&SimulationSettings> for SimOptions {
    fn from(s: &SimulationSettings) -> Self {
        Self {
            dt: s.dt,
            steps: s.steps,
        }
    }
}

/// Progress report passed to the callback after every step.
#[derive(Clone, Copy, Debug)]
pub struct SimProgress {
    pub step: usize,
    pub steps: usize,
    pub time: f64,
}

impl SimProgress {
    pub fn fraction(&self) -> f64 {
        if self.steps == 0 {
            1.0
        } else {
            self.step as f64 / self.steps as f64
        }
    }
}

/// Run a model and return its trace (`steps + 1` points starting at 0).
pub fn run_sim(model: &Model, opts: &SimOptions, inputs: &RunInputs) -> SimResult<Trace> {
    run_sim_with_progress(model, opts, inputs, None)
}

/// Run a model, reporting progress after every step.
pub fn run_sim_with_progress(
    model: &Model,
    opts: &SimOptions,
    inputs: &RunInputs,
    mut progress: Option<&mut dyn FnMut(SimProgress)>,
) -> SimResult<Trace> {
    if !(opts.dt > 0.0) || !opts.dt.is_finite() {
        return Err(SimError::InvalidArg {
            what: "dt must be positive and finite",
        });
    }

    let model = inputs.apply_influences(model)?;
    let system = CompiledSystem::compile(&model)?;
    let mut x = system.initial_state(&inputs.parameter_changes)?;
    debug!(
        variables = x.len(),
        influences = system.graph().edges().len(),
        dt = opts.dt,
        steps = opts.steps,
        "starting simulation"
    );

    let mut time_points = Vec::with_capacity(opts.steps + 1);
    let mut history = Vec::with_capacity(opts.steps + 1);
    time_points.push(0.0);
    history.push(snapshot(&system, &x));

    for step in 1..=opts.steps {
        x = system.step(&x, opts.dt);
        if let Some(i) = x.iter().position(|v| !v.is_finite()) {
            return Err(SimError::NonFinite {
                variable: system.graph().nodes()[i].name.clone(),
                step,
            });
        }
        let time = step as f64 * opts.dt;
        time_points.push(time);
        history.push(snapshot(&system, &x));
        if let Some(cb) = progress.as_deref_mut() {
            cb(SimProgress {
                step,
                steps: opts.steps,
                time,
            });
        }
    }

    info!(points = time_points.len(), "simulation complete");
    Ok(Trace::new(time_points, history)?)
}

fn snapshot(system: &CompiledSystem, x: &[f64]) -> Snapshot {
    system
        .graph()
        .nodes()
        .iter()
        .zip(x)
        .map(|(node, v)| (node.name.clone(), *v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_follow_model_settings() {
        let s = SimulationSettings { dt: 0.5, steps: 4 };
        let opts = SimOptions::from(&s);
        assert_eq!(opts, SimOptions { dt: 0.5, steps: 4 });
        assert_eq!(SimOptions::default().steps, 300);
    }

    #[test]
    fn rejects_bad_dt() {
        let model: Model = serde_yaml::from_str("entities: {}").unwrap();
        let opts = SimOptions { dt: 0.0, steps: 3 };
        assert!(matches!(
            run_sim(&model, &opts, &RunInputs::default()),
            Err(SimError::InvalidArg { .. })
        ));
    }

    #[test]
    fn progress_called_every_step() {
        let model: Model = serde_yaml::from_str(
            "entities:\n  A:\n    components:\n      x: { type: state, initial: 1.0 }\n",
        )
        .unwrap();
        let opts = SimOptions { dt: 0.1, steps: 5 };
        let mut seen = Vec::new();
        let mut cb = |p: SimProgress| seen.push(p.step);
        let trace =
            run_sim_with_progress(&model, &opts, &RunInputs::default(), Some(&mut cb)).unwrap();
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
        assert_eq!(trace.len(), 6);
        assert!((trace.time_points[5] - 0.5).abs() < 1e-12);
    }
}
