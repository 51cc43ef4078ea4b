//! Geographic primitives shared by the ingest, cluster and favorites crates.

pub mod bounds;
pub mod geo;
pub mod ids;
pub mod math;

pub use bounds::*;
pub use geo::*;
pub use ids::*;
