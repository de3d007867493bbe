use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the curriculum log pipeline.
#[derive(Error, Debug)]
pub enum LogsError {
    /// The external store could not be reached or rejected the credentials.
    #[error("Failed to connect to the log database: {0}")]
    Connection(String),

    /// The join query failed after a connection was established, or a
    /// returned column could not be decoded.
    #[error("Log query failed: {0}")]
    Query(String),

    /// The cache file exists but could not be read back as a log table.
    #[error("Failed to parse cache file {path}: {source}")]
    CacheParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The cache file header lacks columns the log table requires.
    #[error("Cache file {path} is missing columns: {}", .missing.join(", "))]
    CacheSchema { path: PathBuf, missing: Vec<String> },

    /// Freshly fetched records could not be written to the cache file.
    #[error("Failed to write cache file {path}: {source}")]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A date column held a value that is not a recognised calendar timestamp.
    #[error("Invalid timestamp in column {column}: {value:?}")]
    TimestampParse { column: &'static str, value: String },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON document (credentials file, rendered report) failed to (de)serialize.
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, LogsError>;
