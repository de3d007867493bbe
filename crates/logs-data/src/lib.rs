//! Data layer for the curriculum log reports.
//!
//! Loads the joined log table from MySQL or the local CSV cache, cleans and
//! enriches it, computes the aggregate views and runs the top-level report
//! pipeline.

pub mod aggregator;
pub mod analysis;
pub mod loader;
pub mod wrangle;

pub use logs_core as core;

pub use aggregator::{q1, q3, q4, q5};
pub use loader::{acquire, Loader};
pub use wrangle::wrangle;
