//! cl-model: declarative causal model format and validation.

pub mod schema;
pub mod validate;

pub use schema::*;
pub use validate::{ValidationError, validate_model};

use std::path::Path;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Unsupported model file format: {path}")]
    UnsupportedFormat { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_yaml(path: &Path) -> ModelResult<Model> {
    let content = std::fs::read_to_string(path)?;
    let model: Model = serde_yaml::from_str(&content)?;
    validate_model(&model)?;
    Ok(model)
}

pub fn save_yaml(path: &Path, model: &Model) -> ModelResult<()> {
    validate_model(model)?;
    let content = serde_yaml::to_string(model)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> ModelResult<Model> {
    let content = std::fs::read_to_string(path)?;
    let model: Model = serde_json::from_str(&content)?;
    validate_model(&model)?;
    Ok(model)
}

pub fn save_json(path: &Path, model: &Model) -> ModelResult<()> {
    validate_model(model)?;
    let content = serde_json::to_string_pretty(model)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load a model, picking the format from the file extension.
pub fn load_model(path: &Path) -> ModelResult<Model> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => load_yaml(path),
        Some("json") => load_json(path),
        _ => Err(ModelError::UnsupportedFormat {
            path: path.display().to_string(),
        }),
    }
}
