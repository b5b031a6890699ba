//! Graph-specific error types.

use cl_core::{EdgeId, VarId};

pub type GraphResult<T> = Result<T, GraphError>;

/// Graph construction and validation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    /// An influence names a variable that the model does not define.
    UnknownVariable { name: String, context: String },

    /// The model failed validation for another reason.
    InvalidModel { reason: String },

    /// Two nodes share one variable id.
    DuplicateVariable { name: String },

    /// An edge refers to a node that doesn't exist.
    InvalidNodeRef { edge: EdgeId, node: VarId },

    /// An edge carries a NaN or infinite coefficient.
    NonFiniteCoefficient { edge: EdgeId },

    /// ID not found in the graph.
    IdNotFound { what: &'static str },
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::UnknownVariable { name, context } => {
                write!(f, "Unknown variable '{}' referenced by {}", name, context)
            }
            GraphError::InvalidModel { reason } => {
                write!(f, "Invalid model: {}", reason)
            }
            GraphError::DuplicateVariable { name } => {
                write!(f, "Variable '{}' is defined twice", name)
            }
            GraphError::InvalidNodeRef { edge, node } => {
                write!(f, "Edge {} refers to non-existent node {}", edge, node)
            }
            GraphError::NonFiniteCoefficient { edge } => {
                write!(f, "Edge {} has a non-finite coefficient", edge)
            }
            GraphError::IdNotFound { what } => {
                write!(f, "{} not found in graph", what)
            }
        }
    }
}

impl std::error::Error for GraphError {}

impl From<cl_model::ValidationError> for GraphError {
    fn from(err: cl_model::ValidationError) -> Self {
        match err {
            cl_model::ValidationError::MissingReference { id, context } => {
                GraphError::UnknownVariable { name: id, context }
            }
            other => GraphError::InvalidModel {
                reason: other.to_string(),
            },
        }
    }
}
