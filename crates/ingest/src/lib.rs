//! Chunked ingestion of geo-located point records.
//!
//! A [`PointSource`] yields raw records lazily; the [`ChunkedProcessor`] pulls them
//! in fixed-size groups, validates them into [`Point`]s, and yields to the
//! scheduler between groups so a large load never monopolizes the executor.

pub mod driver;
pub mod error;
pub mod point;
pub mod processor;
pub mod source;
pub mod sources;

pub use driver::*;
pub use error::*;
pub use point::*;
pub use processor::*;
pub use source::*;
pub use sources::*;
