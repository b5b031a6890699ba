//! Error types for simulation operations.

use thiserror::Error;

/// Errors encountered while integrating a model.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Unknown variable: {name}")]
    UnknownVariable { name: String },

    #[error("No influence from {source_var} to {target}")]
    UnknownInfluence { source_var: String, target: String },

    #[error("Non-finite value for {variable} at step {step}")]
    NonFinite { variable: String, step: usize },

    #[error("Backend error: {message}")]
    Backend { message: String },
}

pub type SimResult<T> = Result<T, SimError>;

impl From<cl_graph::GraphError> for SimError {
    fn from(e: cl_graph::GraphError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}

impl From<cl_trace::TraceError> for SimError {
    fn from(e: cl_trace::TraceError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}
