//! cl-explain: explainability analytics over simulation traces.
//!
//! A pass takes a causal graph and a finished trace and returns one
//! [`ExplainableResult`]:
//! - ranked drivers and contribution decompositions
//! - lever elasticities with control levels
//! - critical causal paths (cycle safe, depth bounded)
//! - a deduplicated event timeline
//! - a viability score with trend and risk
//! - scenario projections and a narrated insight
//!
//! ```no_run
//! use cl_explain::{ExplainRequest, explain};
//! # fn run(model: &cl_model::Model, trace: &cl_trace::Trace) -> cl_explain::ExplainResult<()> {
//! let result = explain(model, trace, &ExplainRequest::default())?;
//! for driver in &result.main_drivers {
//!     println!("{} {:.0}%", driver.variable, driver.percentage);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod contribution;
pub mod drivers;
pub mod engine;
pub mod error;
pub mod generation;
pub mod narrator;
pub mod outcome;
pub mod paths;
pub mod result;
pub mod scenario;
pub mod sensitivity;
pub mod series;
pub mod timeline;
pub mod viability;

pub use config::{
    ContributionConfig, DriverConfig, ExplainConfig, PathConfig, ScenarioConfig,
    SensitivityConfig, TimelineConfig, ViabilityConfig,
};
pub use contribution::{Contribution, Contributor, IndirectContributor};
pub use drivers::Driver;
pub use engine::{ExplainRequest, Explainer, explain};
pub use error::{ExplainError, ExplainResult};
pub use generation::GenerationCounter;
pub use narrator::{Insight, InsightKind};
pub use paths::{CriticalPath, PathNature};
pub use result::{Direction, ExplainableResult};
pub use scenario::{
    ParameterChange, ProjectionMethod, RunnerError, ScenarioDefinition, ScenarioResult,
    ScenarioRunner,
};
pub use sensitivity::{ControlLevel, Sensitivity};
pub use timeline::{EventKind, Severity, TimelineEvent};
pub use viability::{RiskLevel, StabilityLevel, Trend, Viability, ViabilityFactor};
