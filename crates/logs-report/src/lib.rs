//! Presentation layer for the curriculum log reports.
//!
//! Renders report bundles as aligned plain-text tables or as a single JSON
//! document.

pub mod bundle_view;
pub mod table_view;

pub use bundle_view::{render_bundle, OutputFormat};
pub use logs_core as core;
