//! Log table acquisition with a local CSV cache.
//!
//! [`Loader::acquire`] returns the cached table when the cache file exists
//! and otherwise runs the logs/cohorts join against MySQL, writes the result
//! to the cache and returns it.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use logs_core::error::{LogsError, Result};
use logs_core::models::RawLogRecord;
use logs_core::settings::{DbCredentials, DATABASE_NAME, DEFAULT_CACHE_FILE};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Connection, Row};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// The join whose result set is cached.
pub const LOGS_QUERY: &str = "SELECT * FROM logs LEFT JOIN cohorts ON logs.cohort_id = cohorts.id";

// ── Loader ────────────────────────────────────────────────────────────────────

/// Cache-first source of raw log records.
#[derive(Debug, Clone)]
pub struct Loader {
    /// Required only when the cache is missing or a refresh is forced.
    credentials: Option<DbCredentials>,
    cache_path: PathBuf,
}

impl Loader {
    pub fn new(credentials: Option<DbCredentials>, cache_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials,
            cache_path: cache_path.into(),
        }
    }

    /// Loader using `curriculum_logs.csv` in the working directory.
    pub fn with_default_cache(credentials: Option<DbCredentials>) -> Self {
        Self::new(credentials, DEFAULT_CACHE_FILE)
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Return the cached table if present, otherwise fetch and cache it.
    ///
    /// The cache is returned verbatim; its contents are not re-validated
    /// beyond the presence of every column.
    pub fn acquire(&self) -> Result<Vec<RawLogRecord>> {
        if self.cache_path.is_file() {
            info!("Reading cached logs from {}", self.cache_path.display());
            return read_cache(&self.cache_path);
        }

        info!(
            "No cache at {}; querying the database",
            self.cache_path.display()
        );
        self.refresh()
    }

    /// Fetch from the database regardless of the cache and overwrite it.
    pub fn refresh(&self) -> Result<Vec<RawLogRecord>> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            LogsError::Config(format!(
                "database credentials are required because {} does not exist",
                self.cache_path.display()
            ))
        })?;

        let records = fetch_logs(credentials)?;
        write_cache(&self.cache_path, &records)?;
        Ok(records)
    }
}

/// Acquire the log table through the default cache file.
pub fn acquire(credentials: DbCredentials) -> Result<Vec<RawLogRecord>> {
    Loader::with_default_cache(Some(credentials)).acquire()
}

// ── Cache file ────────────────────────────────────────────────────────────────

/// Read a cache file written by [`write_cache`] (or any CSV with the same
/// header).
///
/// Column order is free and extra columns are ignored, but every column of
/// [`RawLogRecord::COLUMNS`] must be present.
pub fn read_cache(path: &Path) -> Result<Vec<RawLogRecord>> {
    let parse_err = |source: csv::Error| LogsError::CacheParse {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(parse_err)?;

    let headers = reader.headers().map_err(parse_err)?.clone();
    let missing: Vec<String> = RawLogRecord::COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|h| h == **column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LogsError::CacheSchema {
            path: path.to_path_buf(),
            missing,
        });
    }

    let records = reader
        .deserialize::<RawLogRecord>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(parse_err)?;

    debug!(
        "Read {} cached log rows from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

/// Write `records` as CSV with a header row and no index column.
///
/// The table is staged in a temporary file next to `path` and renamed over
/// it only once every row is flushed, so a failed write never leaves a
/// truncated cache behind.
pub fn write_cache(path: &Path, records: &[RawLogRecord]) -> Result<()> {
    let write_err = |source: csv::Error| LogsError::CacheWrite {
        path: path.to_path_buf(),
        source,
    };
    let io_err = |e: std::io::Error| write_err(csv::Error::from(e));

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staged = NamedTempFile::new_in(dir).map_err(io_err)?;

    // Header written explicitly so an empty table still round-trips.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(staged);
    writer
        .write_record(RawLogRecord::COLUMNS)
        .map_err(write_err)?;
    for record in records {
        writer.serialize(record).map_err(write_err)?;
    }
    let staged = writer
        .into_inner()
        .map_err(|e| io_err(e.into_error()))?;
    staged.as_file().sync_all().map_err(io_err)?;
    staged.persist(path).map_err(|e| io_err(e.error))?;

    info!("Cached {} log rows to {}", records.len(), path.display());
    Ok(())
}

// ── Database fetch ────────────────────────────────────────────────────────────

/// Run [`LOGS_QUERY`] to completion on a current-thread runtime.
fn fetch_logs(credentials: &DbCredentials) -> Result<Vec<RawLogRecord>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(fetch_logs_async(credentials))
}

async fn fetch_logs_async(credentials: &DbCredentials) -> Result<Vec<RawLogRecord>> {
    let (host, port) = credentials.host_and_port()?;
    let options = MySqlConnectOptions::new()
        .host(&host)
        .port(port)
        .username(&credentials.user)
        .password(&credentials.password)
        .database(DATABASE_NAME);

    info!("Connecting to {}", credentials.redacted_url());
    let mut conn = MySqlConnection::connect_with(&options)
        .await
        .map_err(|e| LogsError::Connection(e.to_string()))?;

    let rows = sqlx::query(LOGS_QUERY)
        .fetch_all(&mut conn)
        .await
        .map_err(|e| LogsError::Query(e.to_string()))?;

    if let Err(e) = conn.close().await {
        warn!("Error closing database connection: {}", e);
    }

    let records = rows
        .iter()
        .map(record_from_row)
        .collect::<Result<Vec<_>>>()?;
    debug!("Fetched {} log rows from {}", records.len(), DATABASE_NAME);
    Ok(records)
}

/// Map one joined row onto a [`RawLogRecord`].
fn record_from_row(row: &MySqlRow) -> Result<RawLogRecord> {
    let date = column_text(row, "date")?
        .ok_or_else(|| LogsError::Query("log row with NULL date".to_string()))?;
    let user_id = column_integer(row, "user_id")?
        .ok_or_else(|| LogsError::Query("log row with NULL user_id".to_string()))?;

    Ok(RawLogRecord {
        date,
        time: column_text(row, "time")?,
        path: column_text(row, "path")?,
        user_id,
        cohort_id: column_number(row, "cohort_id")?,
        ip: column_text(row, "ip")?,
        id: column_number(row, "id")?,
        name: column_text(row, "name")?,
        slack: column_text(row, "slack")?,
        start_date: column_text(row, "start_date")?,
        end_date: column_text(row, "end_date")?,
        created_at: column_text(row, "created_at")?,
        updated_at: column_text(row, "updated_at")?,
        deleted_at: column_text(row, "deleted_at")?,
        program_id: column_number(row, "program_id")?,
    })
}

// ── Column decoding ───────────────────────────────────────────────────────────

// sqlx type-checks every decode, so each helper walks the SQL types the
// `logs` and `cohorts` tables may use until one matches.

fn column_text(row: &MySqlRow, column: &str) -> Result<Option<String>> {
    if let Ok(v) = row.try_get::<Option<String>, _>(column) {
        return Ok(v);
    }
    if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(column) {
        return Ok(v.map(|d| d.format("%Y-%m-%d").to_string()));
    }
    if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(column) {
        return Ok(v.map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string()));
    }
    if let Ok(v) = row.try_get::<Option<NaiveTime>, _>(column) {
        return Ok(v.map(|t| t.format("%H:%M:%S").to_string()));
    }
    if let Some(v) = column_integer_opt(row, column) {
        return Ok(v.map(|n| n.to_string()));
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(column) {
        return Ok(v.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()));
    }
    Err(undecodable(column, "text"))
}

fn column_number(row: &MySqlRow, column: &str) -> Result<Option<f64>> {
    if let Some(v) = column_integer_opt(row, column) {
        return Ok(v.map(|n| n as f64));
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(column) {
        return Ok(v);
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(column) {
        return Ok(v.map(f64::from));
    }
    Err(undecodable(column, "a number"))
}

fn column_integer(row: &MySqlRow, column: &str) -> Result<Option<i64>> {
    column_integer_opt(row, column).ok_or_else(|| undecodable(column, "an integer"))
}

/// `None` when the column is not an integer type at all.
fn column_integer_opt(row: &MySqlRow, column: &str) -> Option<Option<i64>> {
    if let Ok(v) = row.try_get::<Option<i64>, _>(column) {
        return Some(v);
    }
    if let Ok(v) = row.try_get::<Option<u64>, _>(column) {
        return Some(v.map(|n| n as i64));
    }
    None
}

fn undecodable(column: &str, expected: &str) -> LogsError {
    LogsError::Query(format!("column {} could not be decoded as {}", column, expected))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
