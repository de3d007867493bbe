use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{LogsError, Result};

/// Date-time layouts accepted for log and cohort dates, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse a date column value into a naive calendar timestamp.
///
/// Accepts a bare `YYYY-MM-DD` (midnight) or a date with a time part
/// separated by a space or `T`, with optional fractional seconds.
/// `column` is only used to label the error.
pub fn parse_timestamp(column: &'static str, value: &str) -> Result<NaiveDateTime> {
    let trimmed = value.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight);
        }
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| LogsError::TimestampParse {
            column,
            value: value.to_string(),
        })
}

/// Like [`parse_timestamp`] but maps a missing or blank value to `None`.
pub fn parse_optional_timestamp(
    column: &'static str,
    value: Option<&str>,
) -> Result<Option<NaiveDateTime>> {
    match value {
        Some(v) if !v.trim().is_empty() => parse_timestamp(column, v).map(Some),
        _ => Ok(None),
    }
}
