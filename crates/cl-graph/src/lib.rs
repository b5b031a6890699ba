//! cl-graph: causal graph layer for causalens.
//!
//! Provides:
//! - Graph data structures (variable nodes, influence edges)
//! - Builder from a declarative model, with validation
//! - Response-function lookup table (value + derivative)
//! - Cycle-safe, depth-bounded simple-path traversal
//!
//! # Example
//!
//! ```
//! use cl_graph::GraphBuilder;
//! use cl_model::{ComponentKind, InfluenceSign, ResponseFunction};
//!
//! let mut builder = GraphBuilder::new();
//! let a = builder.add_variable("A", "x", ComponentKind::State, 1.0, None, None);
//! let b = builder.add_variable("B", "y", ComponentKind::State, 0.0, None, None);
//! builder.add_influence(a, b, InfluenceSign::Positive, 0.5, ResponseFunction::Linear);
//! let graph = builder.build().unwrap();
//!
//! assert_eq!(graph.nodes().len(), 2);
//! assert_eq!(graph.edges().len(), 1);
//! assert_eq!(graph.incoming(b).len(), 1);
//! ```

pub mod builder;
pub mod error;
pub mod graph;
pub mod response;
pub mod traverse;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use builder::GraphBuilder;
pub use error::{GraphError, GraphResult};
pub use graph::{CausalGraph, InfluenceEdge, VarNode};
pub use response::{response_derivative, response_value};
pub use traverse::{PathLimits, simple_paths};
