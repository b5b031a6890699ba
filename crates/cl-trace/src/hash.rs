//! Content-based hashing for model digests and run IDs.

use cl_model::{Model, SimulationSettings};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Stable digest of a model, usable as a graph cache key.
///
/// Entities and components are ordered maps, so equal models serialize to
/// equal JSON.
pub fn model_digest(model: &Model) -> String {
    let mut hasher = Sha256::new();
    let model_json = serde_json::to_string(model).unwrap_or_default();
    hasher.update(model_json.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn compute_run_id(
    model: &Model,
    settings: &SimulationSettings,
    parameter_changes: &BTreeMap<String, f64>,
    runner_version: &str,
) -> String {
    let mut hasher = Sha256::new();

    hasher.update(model_digest(model).as_bytes());

    let settings_json = serde_json::to_string(settings).unwrap_or_default();
    hasher.update(settings_json.as_bytes());

    let changes_json = serde_json::to_string(parameter_changes).unwrap_or_default();
    hasher.update(changes_json.as_bytes());

    hasher.update(runner_version.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}
