//! Parameter and influence overrides applied before a run.

use cl_model::Model;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{SimError, SimResult};

/// Change to one influence of `target`, matched by its resolved source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluenceChange {
    pub target: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coefficient: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Everything a caller may vary for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunInputs {
    /// Starting values, clamped to the variable's bounds.
    #[serde(default)]
    pub parameter_changes: BTreeMap<String, f64>,
    #[serde(default)]
    pub influence_changes: Vec<InfluenceChange>,
}

impl RunInputs {
    pub fn with_parameters(parameter_changes: BTreeMap<String, f64>) -> Self {
        Self {
            parameter_changes,
            influence_changes: Vec::new(),
        }
    }

    /// Copy of `model` with the influence changes applied.
    pub fn apply_influences(&self, model: &Model) -> SimResult<Model> {
        let mut out = model.clone();
        for change in &self.influence_changes {
            let (entity, component) = cl_model::split_variable_id(&change.target)
                .ok_or_else(|| SimError::UnknownVariable {
                    name: change.target.clone(),
                })?;
            let wanted = model.resolve_source(entity, component, &change.source);
            let def = out
                .component_mut(&change.target)
                .ok_or_else(|| SimError::UnknownVariable {
                    name: change.target.clone(),
                })?;
            let influence = def
                .influences
                .iter_mut()
                .find(|i| model.resolve_source(entity, component, &i.source) == wanted)
                .ok_or_else(|| SimError::UnknownInfluence {
                    source_var: change.source.clone(),
                    target: change.target.clone(),
                })?;
            if let Some(c) = change.coefficient {
                influence.coefficient = c;
            }
            if let Some(e) = change.enabled {
                influence.enabled = e;
            }
        }
        Ok(out)
    }
}
