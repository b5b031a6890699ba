//! Error types for explainability passes.

use thiserror::Error;

/// Fatal errors of an explain pass. Degenerate numerics are never errors;
/// they zero the affected metric and set its confidence flag.
#[derive(Error, Debug)]
pub enum ExplainError {
    #[error("Invalid model: {reason}")]
    InvalidModel { reason: String },

    #[error("Trace has no points")]
    EmptyTrace,

    #[error("Trace does not match the model: {reason}")]
    TraceMismatch { reason: String },

    #[error("Unknown variable: {name}")]
    UnknownVariable { name: String },

    #[error("Result of generation {token} discarded, latest is {latest}")]
    StaleResultDiscarded { token: u64, latest: u64 },
}

pub type ExplainResult<T> = Result<T, ExplainError>;

impl From<cl_graph::GraphError> for ExplainError {
    fn from(e: cl_graph::GraphError) -> Self {
        ExplainError::InvalidModel {
            reason: e.to_string(),
        }
    }
}

impl From<cl_trace::TraceError> for ExplainError {
    fn from(e: cl_trace::TraceError) -> Self {
        match e {
            cl_trace::TraceError::Empty => ExplainError::EmptyTrace,
            other => ExplainError::TraceMismatch {
                reason: other.to_string(),
            },
        }
    }
}
