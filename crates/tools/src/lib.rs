//! Wiring for the `markers` command: configuration, the ingest-and-cluster run,
//! and the favorite toggle walkthrough.

pub mod config;
pub mod run;
pub mod toggle;
