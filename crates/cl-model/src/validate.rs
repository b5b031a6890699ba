//! Model validation logic.

use crate::schema::{Model, VARIABLE_SEPARATOR};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid name: '{name}' in {context} ({reason})")]
    InvalidName {
        name: String,
        context: String,
        reason: String,
    },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

pub fn validate_model(model: &Model) -> Result<(), ValidationError> {
    if !(model.simulation.dt.is_finite() && model.simulation.dt > 0.0) {
        return Err(ValidationError::InvalidValue {
            field: "simulation.dt".to_string(),
            value: model.simulation.dt.to_string(),
            reason: "must be positive and finite".to_string(),
        });
    }

    for (entity, def) in &model.entities {
        validate_name(entity, "entities")?;
        for component in def.components.keys() {
            validate_name(component, &format!("entity '{entity}' components"))?;
        }
    }

    let known: HashSet<String> = model.variable_ids().into_iter().collect();

    for var in model.variables() {
        let id = var.id();
        let c = var.def;

        if !c.initial.is_finite() {
            return Err(ValidationError::InvalidValue {
                field: format!("{id}.initial"),
                value: c.initial.to_string(),
                reason: "must be finite".to_string(),
            });
        }
        for (label, bound) in [("min", c.min), ("max", c.max)] {
            if let Some(b) = bound
                && !b.is_finite()
            {
                return Err(ValidationError::InvalidValue {
                    field: format!("{id}.{label}"),
                    value: b.to_string(),
                    reason: "must be finite".to_string(),
                });
            }
        }
        if let Some((lo, hi)) = c.bounds()
            && lo > hi
        {
            return Err(ValidationError::InvalidValue {
                field: format!("{id}.min"),
                value: lo.to_string(),
                reason: format!("exceeds max {hi}"),
            });
        }

        for influence in &c.influences {
            if !influence.coefficient.is_finite() {
                return Err(ValidationError::InvalidValue {
                    field: format!("{id} influence from {}", influence.source),
                    value: influence.coefficient.to_string(),
                    reason: "coefficient must be finite".to_string(),
                });
            }
            // Disabled influences are checked too.
            let source = model.resolve_source(var.entity, var.component, &influence.source);
            if !known.contains(&source) {
                return Err(ValidationError::MissingReference {
                    id: source,
                    context: format!("influences of {id}"),
                });
            }
        }
    }

    Ok(())
}

fn validate_name(name: &str, context: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::InvalidName {
            name: name.to_string(),
            context: context.to_string(),
            reason: "empty".to_string(),
        });
    }
    if name.contains(VARIABLE_SEPARATOR) {
        return Err(ValidationError::InvalidName {
            name: name.to_string(),
            context: context.to_string(),
            reason: format!("must not contain '{VARIABLE_SEPARATOR}'"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Model {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn accepts_valid_model() {
        let model = parse(
            r#"
entities:
  A:
    components:
      x: { type: state, initial: 1.0, min: 0.0, max: 2.0 }
      y:
        type: computed
        initial: 0.0
        influences: [ { from: x, coef: 1.0, kind: positive } ]
"#,
        );
        assert!(validate_model(&model).is_ok());
    }

    #[test]
    fn rejects_unknown_source() {
        let model = parse(
            r#"
entities:
  A:
    components:
      y:
        type: state
        initial: 0.0
        influences: [ { from: B.z, coef: 1.0, kind: positive } ]
"#,
        );
        let err = validate_model(&model).unwrap_err();
        assert!(matches!(err, ValidationError::MissingReference { ref id, .. } if id == "B.z"));
    }

    #[test]
    fn rejects_inverted_bounds() {
        let model = parse(
            r#"
entities:
  A:
    components:
      x: { type: state, initial: 1.0, min: 3.0, max: 2.0 }
"#,
        );
        assert!(matches!(
            validate_model(&model),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn out_of_range_initial_is_allowed() {
        let model = parse(
            r#"
entities:
  A:
    components:
      x: { type: state, initial: 5.0, min: 0.0, max: 2.0 }
"#,
        );
        assert!(validate_model(&model).is_ok());
    }

    #[test]
    fn rejects_dotted_names() {
        let mut model = parse("entities: {}");
        model
            .entities
            .insert("A.B".to_string(), Default::default());
        assert!(matches!(
            validate_model(&model),
            Err(ValidationError::InvalidName { .. })
        ));
    }
}
