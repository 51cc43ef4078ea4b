//! Live point set and viewport-driven marker clustering.
//!
//! [`SpatialClusterIndex`] owns the ingested points. Clusters are derived on
//! demand for a viewport and zoom and carry no identity across calls.

pub mod cluster;
mod grid;
pub mod index;
pub mod service;
pub mod shared;
pub mod viewport;

pub use cluster::*;
pub use index::*;
pub use service::*;
pub use shared::*;
pub use viewport::*;
