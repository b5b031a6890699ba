//! Model schema definitions.
//!
//! A model is a set of entities, each holding named components. A component
//! is addressed as `entity.component` everywhere outside this module.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Separator between entity and component in a variable id.
pub const VARIABLE_SEPARATOR: char = '.';

/// Literal source name for a self influence.
pub const SELF_SOURCE: &str = "self";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Model {
    pub entities: BTreeMap<String, EntityDef>,
    #[serde(default)]
    pub simulation: SimulationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EntityDef {
    #[serde(default)]
    pub components: BTreeMap<String, ComponentDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentDef {
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    pub initial: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub influences: Vec<InfluenceDef>,
}

impl ComponentDef {
    /// Both bounds, when the component declares them.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        Some((self.min?, self.max?))
    }

    /// Width of the bound interval, if both bounds exist.
    pub fn bound_range(&self) -> Option<f64> {
        self.bounds().map(|(lo, hi)| hi - lo)
    }

    /// Clamp a value into whichever bounds are present.
    pub fn clamp(&self, value: f64) -> f64 {
        let mut v = value;
        if let Some(lo) = self.min {
            v = v.max(lo);
        }
        if let Some(hi) = self.max {
            v = v.min(hi);
        }
        v
    }

    /// Whether `value` satisfies the declared bounds.
    pub fn within_bounds(&self, value: f64) -> bool {
        self.min.is_none_or(|lo| value >= lo) && self.max.is_none_or(|hi| value <= hi)
    }

    pub fn enabled_influences(&self) -> impl Iterator<Item = &InfluenceDef> {
        self.influences.iter().filter(|i| i.enabled)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Integrated over time.
    State,
    /// Updated algebraically from its influences each step.
    Computed,
    /// Fixed parameter.
    Constant,
}

impl ComponentKind {
    /// Whether an operator can assign this variable directly.
    pub fn is_settable(self) -> bool {
        matches!(self, ComponentKind::State | ComponentKind::Constant)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InfluenceDef {
    #[serde(rename = "from")]
    pub source: String,
    #[serde(rename = "coef")]
    pub coefficient: f64,
    #[serde(rename = "kind")]
    pub sign: InfluenceSign,
    #[serde(rename = "function", default)]
    pub response: ResponseFunction,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum InfluenceSign {
    Positive,
    Negative,
    Decay,
    Ratio,
}

impl InfluenceSign {
    pub const ALL: [InfluenceSign; 4] = [
        InfluenceSign::Positive,
        InfluenceSign::Negative,
        InfluenceSign::Decay,
        InfluenceSign::Ratio,
    ];

    pub fn label(self) -> &'static str {
        match self {
            InfluenceSign::Positive => "positive",
            InfluenceSign::Negative => "negative",
            InfluenceSign::Decay => "decay",
            InfluenceSign::Ratio => "ratio",
        }
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFunction {
    #[default]
    Linear,
    Sigmoid,
    Threshold,
    Division,
    Square,
    Sqrt,
    Exponential,
    Logarithmic,
}

impl ResponseFunction {
    pub const ALL: [ResponseFunction; 8] = [
        ResponseFunction::Linear,
        ResponseFunction::Sigmoid,
        ResponseFunction::Threshold,
        ResponseFunction::Division,
        ResponseFunction::Square,
        ResponseFunction::Sqrt,
        ResponseFunction::Exponential,
        ResponseFunction::Logarithmic,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ResponseFunction::Linear => "linear",
            ResponseFunction::Sigmoid => "sigmoid",
            ResponseFunction::Threshold => "threshold",
            ResponseFunction::Division => "division",
            ResponseFunction::Square => "square",
            ResponseFunction::Sqrt => "sqrt",
            ResponseFunction::Exponential => "exponential",
            ResponseFunction::Logarithmic => "logarithmic",
        }
    }
}

/// Settings consumed by the reference integrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationSettings {
    #[serde(default = "default_dt")]
    pub dt: f64,
    #[serde(default = "default_steps")]
    pub steps: usize,
}

fn default_dt() -> f64 {
    0.1
}

fn default_steps() -> usize {
    300
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            dt: default_dt(),
            steps: default_steps(),
        }
    }
}

/// Build the `entity.component` id of a variable.
pub fn variable_id(entity: &str, component: &str) -> String {
    format!("{entity}{VARIABLE_SEPARATOR}{component}")
}

/// Split a variable id into `(entity, component)`.
pub fn split_variable_id(id: &str) -> Option<(&str, &str)> {
    id.split_once(VARIABLE_SEPARATOR)
}

/// A component viewed with its owning entity.
#[derive(Debug, Clone, Copy)]
pub struct VariableView<'a> {
    pub entity: &'a str,
    pub component: &'a str,
    pub def: &'a ComponentDef,
}

impl VariableView<'_> {
    pub fn id(&self) -> String {
        variable_id(self.entity, self.component)
    }
}

impl Model {
    /// Iterate all variables in `entity.component` order.
    pub fn variables(&self) -> impl Iterator<Item = VariableView<'_>> {
        self.entities.iter().flat_map(|(entity, def)| {
            def.components
                .iter()
                .map(move |(component, c)| VariableView {
                    entity: entity.as_str(),
                    component: component.as_str(),
                    def: c,
                })
        })
    }

    pub fn variable_ids(&self) -> Vec<String> {
        self.variables().map(|v| v.id()).collect()
    }

    pub fn variable_count(&self) -> usize {
        self.entities.values().map(|e| e.components.len()).sum()
    }

    /// Look up a component by its variable id.
    pub fn component(&self, id: &str) -> Option<&ComponentDef> {
        let (entity, component) = split_variable_id(id)?;
        self.entities.get(entity)?.components.get(component)
    }

    pub fn component_mut(&mut self, id: &str) -> Option<&mut ComponentDef> {
        let (entity, component) = split_variable_id(id)?;
        self.entities.get_mut(entity)?.components.get_mut(component)
    }

    /// Initial values of every variable.
    pub fn initial_state(&self) -> BTreeMap<String, f64> {
        self.variables().map(|v| (v.id(), v.def.initial)).collect()
    }

    /// Resolve an influence source written inside `entity.component` to a
    /// full variable id.
    ///
    /// Accepts a full id, `self`, the component's own name, or a bare
    /// component name of the same entity.
    pub fn resolve_source(&self, entity: &str, component: &str, source: &str) -> String {
        if source == SELF_SOURCE || source == component {
            return variable_id(entity, component);
        }
        if source.contains(VARIABLE_SEPARATOR) {
            return source.to_string();
        }
        variable_id(entity, source)
    }
}
