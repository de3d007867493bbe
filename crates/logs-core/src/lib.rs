//! Shared types for the curriculum log reports.
//!
//! Holds the error taxonomy, raw and enriched record models, timestamp
//! parsing, command-line settings with database credentials, and the number
//! formatting used when printing report tables.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{LogsError, Result};
