//! cl-trace: simulation traces, run store and export.

pub mod export;
pub mod hash;
pub mod store;
pub mod types;

pub use export::{series_csv, trace_csv};
pub use hash::{compute_run_id, model_digest};
pub use store::{RunStore, load_trace_file, save_trace_file};
pub use types::*;

pub type TraceResult<T> = Result<T, TraceError>;

#[derive(thiserror::Error, Debug)]
pub enum TraceError {
    #[error("Trace has no time points")]
    Empty,

    #[error("Trace has {times} time points but {snapshots} snapshots")]
    LengthMismatch { times: usize, snapshots: usize },

    #[error("Time points must strictly increase (index {index}: {previous} -> {current})")]
    NonIncreasingTime {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("Snapshot {index} has a different variable set than the first snapshot")]
    VariableSetMismatch { index: usize },

    #[error("Unknown variable: {name}")]
    UnknownVariable { name: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("Invalid path: {message}")]
    InvalidPath { message: String },
}
