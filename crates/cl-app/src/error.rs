//! Error types for the cl-app service layer.

use std::path::PathBuf;

/// Application error type that wraps errors from the backend crates and
/// gives the CLI one error surface.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Model error: {0}")]
    Model(String),

    #[error("Failed to read {path}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Trace error: {0}")]
    Trace(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Explain error: {0}")]
    Explain(String),

    #[error("Result of generation {token} was superseded")]
    Superseded { token: u64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cl-app operations.
pub type AppResult<T> = Result<T, AppError>;

// Conversions from backend error types
impl From<cl_model::ModelError> for AppError {
    fn from(err: cl_model::ModelError) -> Self {
        AppError::Model(err.to_string())
    }
}

impl From<cl_graph::GraphError> for AppError {
    fn from(err: cl_graph::GraphError) -> Self {
        AppError::Graph(err.to_string())
    }
}

impl From<cl_trace::TraceError> for AppError {
    fn from(err: cl_trace::TraceError) -> Self {
        AppError::Trace(err.to_string())
    }
}

impl From<cl_sim::SimError> for AppError {
    fn from(err: cl_sim::SimError) -> Self {
        AppError::Simulation(err.to_string())
    }
}

impl From<cl_explain::ExplainError> for AppError {
    fn from(err: cl_explain::ExplainError) -> Self {
        match err {
            cl_explain::ExplainError::StaleResultDiscarded { token, .. } => {
                AppError::Superseded { token }
            }
            other => AppError::Explain(other.to_string()),
        }
    }
}
