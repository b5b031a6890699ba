//! cl-core: numeric guards and graph ids shared by every causalens crate.

pub mod ids;
pub mod numeric;

pub use ids::*;
pub use numeric::*;
