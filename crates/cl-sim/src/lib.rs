//! Reference time integration for causal models.
//!
//! Provides:
//! - Forward-Euler stepping of state variables, algebraic update of
//!   computed variables, fixed constants
//! - Parameter and influence overrides applied before a run
//! - Progress callbacks

pub mod error;
pub mod integrator;
pub mod overrides;
pub mod sim;

pub use error::{SimError, SimResult};
pub use integrator::CompiledSystem;
pub use overrides::{InfluenceChange, RunInputs};
pub use sim::{RUNNER_VERSION, SimOptions, SimProgress, run_sim, run_sim_with_progress};
