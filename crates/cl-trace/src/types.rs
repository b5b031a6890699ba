//! Trace and run data types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{TraceError, TraceResult};

pub type RunId = String;

/// One variable snapshot: variable id -> value.
pub type Snapshot = BTreeMap<String, f64>;

/// Output of a simulation run: strictly increasing time points and one
/// snapshot per point.
///
/// Serialized in the `{ "time_points": [...], "history": [...] }` layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub time_points: Vec<f64>,
    pub history: Vec<Snapshot>,
}

impl Trace {
    /// Build a trace and check its invariants.
    pub fn new(time_points: Vec<f64>, history: Vec<Snapshot>) -> TraceResult<Self> {
        let trace = Self {
            time_points,
            history,
        };
        trace.validate()?;
        Ok(trace)
    }

    /// Check: at least one point, matching lengths, strictly increasing
    /// time, identical variable set in every snapshot.
    pub fn validate(&self) -> TraceResult<()> {
        if self.time_points.is_empty() || self.history.is_empty() {
            return Err(TraceError::Empty);
        }
        if self.time_points.len() != self.history.len() {
            return Err(TraceError::LengthMismatch {
                times: self.time_points.len(),
                snapshots: self.history.len(),
            });
        }
        for (i, w) in self.time_points.windows(2).enumerate() {
            // `!(a < b)` also rejects NaN times.
            if !(w[0] < w[1]) {
                return Err(TraceError::NonIncreasingTime {
                    index: i + 1,
                    previous: w[0],
                    current: w[1],
                });
            }
        }
        let first = &self.history[0];
        for (i, snap) in self.history.iter().enumerate().skip(1) {
            if snap.len() != first.len() || !snap.keys().eq(first.keys()) {
                return Err(TraceError::VariableSetMismatch { index: i });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.time_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_points.is_empty()
    }

    /// Variable ids present in the trace (sorted).
    pub fn variables(&self) -> Vec<&str> {
        self.history
            .first()
            .map(|s| s.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, variable: &str) -> bool {
        self.history
            .first()
            .is_some_and(|s| s.contains_key(variable))
    }

    /// Time span covered by the trace.
    pub fn duration(&self) -> f64 {
        match (self.time_points.first(), self.time_points.last()) {
            (Some(a), Some(b)) => b - a,
            _ => 0.0,
        }
    }

    /// Values of one variable over time.
    pub fn series(&self, variable: &str) -> TraceResult<Vec<f64>> {
        if !self.contains(variable) {
            return Err(TraceError::UnknownVariable {
                name: variable.to_string(),
            });
        }
        Ok(self
            .history
            .iter()
            .map(|s| s.get(variable).copied().unwrap_or(f64::NAN))
            .collect())
    }

    /// `(time, value)` pairs of one variable.
    pub fn series_with_time(&self, variable: &str) -> TraceResult<Vec<(f64, f64)>> {
        let values = self.series(variable)?;
        Ok(self.time_points.iter().copied().zip(values).collect())
    }

    /// Series of every component of an entity, keyed by component name.
    pub fn entity_series(&self, entity: &str) -> BTreeMap<String, Vec<f64>> {
        let prefix = format!("{entity}{}", cl_model::VARIABLE_SEPARATOR);
        self.variables()
            .into_iter()
            .filter_map(|v| {
                let component = v.strip_prefix(&prefix)?;
                let series = self.series(v).ok()?;
                Some((component.to_string(), series))
            })
            .collect()
    }

    pub fn initial_state(&self) -> Option<&Snapshot> {
        self.history.first()
    }

    pub fn final_state(&self) -> Option<&Snapshot> {
        self.history.last()
    }
}

/// Metadata describing one stored run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub model_digest: String,
    pub timestamp: String,
    pub dt: f64,
    pub steps: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameter_changes: BTreeMap<String, f64>,
    pub runner_version: String,
}

impl RunManifest {
    /// Manifest stamped with the current UTC time.
    pub fn stamped(
        run_id: RunId,
        model_digest: String,
        settings: &cl_model::SimulationSettings,
        parameter_changes: BTreeMap<String, f64>,
        runner_version: impl Into<String>,
    ) -> Self {
        Self {
            run_id,
            model_digest,
            timestamp: chrono::Utc::now().to_rfc3339(),
            dt: settings.dt,
            steps: settings.steps,
            parameter_changes,
            runner_version: runner_version.into(),
        }
    }
}
