//! Cleaning and enrichment of the raw log table.
//!
//! [`wrangle`] drops the cohort audit columns, fills missing cohorts with
//! [`NO_COHORT_ID`], removes root-page hits, derives the `root_path` and
//! `root_path_2` lesson identifiers and parses the three date columns.

use std::collections::BTreeMap;

use logs_core::error::Result;
use logs_core::models::{EnrichedRecord, RawLogRecord, NO_COHORT_ID, ROOT_PATH};
use logs_core::time_utils::{parse_optional_timestamp, parse_timestamp};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ── WrangleStats ──────────────────────────────────────────────────────────────

/// Row counts observed while wrangling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrangleStats {
    pub input_rows: usize,
    /// Rows whose path was exactly `/`.
    pub root_rows_removed: usize,
    /// Rows whose path had fewer than two segments (or no path at all).
    pub short_paths_dropped: usize,
    pub output_rows: usize,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Clean and enrich `raw`, returning a new table.
///
/// Rows whose path cannot be split into two segments are silently dropped;
/// use [`wrangle_with_stats`] to see how many.
pub fn wrangle(raw: &[RawLogRecord]) -> Result<Vec<EnrichedRecord>> {
    wrangle_with_stats(raw).map(|(records, _)| records)
}

/// [`wrangle`] plus the row counts of each filtering step.
pub fn wrangle_with_stats(raw: &[RawLogRecord]) -> Result<(Vec<EnrichedRecord>, WrangleStats)> {
    let mut stats = WrangleStats {
        input_rows: raw.len(),
        ..WrangleStats::default()
    };

    // Steps 1-3: project away audit columns, fill cohorts, drop root hits.
    let cleaned: Vec<CleanRow<'_>> = raw
        .iter()
        .map(CleanRow::from)
        .filter(|row| row.path != Some(ROOT_PATH))
        .collect();
    stats.root_rows_removed = raw.len() - cleaned.len();

    // Step 4: split paths, keyed by position in `cleaned`.
    let segments: BTreeMap<usize, PathSegments<'_>> = cleaned
        .iter()
        .enumerate()
        .filter_map(|(row, rec)| rec.path.and_then(split_path).map(|s| (row, s)))
        .collect();
    stats.short_paths_dropped = cleaned.len() - segments.len();

    // Steps 5-6: positional merge of derived columns, then date parsing.
    let mut records = Vec::with_capacity(segments.len());
    for (row, rec) in cleaned.into_iter().enumerate() {
        let Some(seg) = segments.get(&row) else {
            continue;
        };
        records.push(rec.enrich(seg)?);
    }
    stats.output_rows = records.len();

    debug!(
        input = stats.input_rows,
        root_removed = stats.root_rows_removed,
        short_paths_dropped = stats.short_paths_dropped,
        output = stats.output_rows,
        "wrangled log table"
    );

    Ok((records, stats))
}

/// First two `/`-separated segments of `path`, or `None` when there are
/// fewer than two.
pub fn split_path(path: &str) -> Option<PathSegments<'_>> {
    let mut parts = path.split('/');
    let root = parts.next()?;
    let second = parts.next()?;
    Some(PathSegments { root, second })
}

/// Leading segments of a page path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathSegments<'a> {
    pub root: &'a str,
    pub second: &'a str,
}

impl PathSegments<'_> {
    pub fn root_path(&self) -> String {
        self.root.to_string()
    }

    pub fn root_path_2(&self) -> String {
        format!("{}/{}", self.root, self.second)
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// A raw row without the audit columns and with its cohort filled.
struct CleanRow<'a> {
    date: &'a str,
    time: Option<&'a String>,
    path: Option<&'a str>,
    user_id: i64,
    cohort_id: f64,
    ip: Option<&'a String>,
    id: Option<f64>,
    name: Option<&'a String>,
    start_date: Option<&'a str>,
    end_date: Option<&'a str>,
    program_id: Option<f64>,
}

impl<'a> From<&'a RawLogRecord> for CleanRow<'a> {
    fn from(raw: &'a RawLogRecord) -> Self {
        Self {
            date: &raw.date,
            time: raw.time.as_ref(),
            path: raw.path.as_deref(),
            user_id: raw.user_id,
            cohort_id: raw.cohort_id.unwrap_or(NO_COHORT_ID),
            ip: raw.ip.as_ref(),
            id: raw.id,
            name: raw.name.as_ref(),
            start_date: raw.start_date.as_deref(),
            end_date: raw.end_date.as_deref(),
            program_id: raw.program_id,
        }
    }
}

impl CleanRow<'_> {
    fn enrich(self, segments: &PathSegments<'_>) -> Result<EnrichedRecord> {
        Ok(EnrichedRecord {
            date: parse_timestamp("date", self.date)?,
            time: self.time.cloned(),
            path: self.path.unwrap_or_default().to_string(),
            user_id: self.user_id,
            cohort_id: self.cohort_id,
            ip: self.ip.cloned(),
            id: self.id,
            name: self.name.cloned(),
            start_date: parse_optional_timestamp("start_date", self.start_date)?,
            end_date: parse_optional_timestamp("end_date", self.end_date)?,
            program_id: self.program_id,
            root_path: segments.root_path(),
            root_path_2: segments.root_path_2(),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use logs_core::error::LogsError;
    use logs_core::models::AUDIT_COLUMNS;

    fn raw(path: Option<&str>, cohort: Option<f64>, date: &str) -> RawLogRecord {
        let mut rec = RawLogRecord::new(date, path, 11);
        rec.cohort_id = cohort;
        rec.slack = Some("#cohort".to_string());
        rec.created_at = Some("2016-06-14 19:52:26".to_string());
        rec.updated_at = Some("2016-06-14 19:52:26".to_string());
        rec
    }

    // ── End-to-end example ────────────────────────────────────────────────────

    #[test]
    fn test_wrangle_drops_root_and_fills_cohort() {
        let input = vec![
            raw(Some("javascript-i/loops"), None, "2021-01-05"),
            raw(Some("/"), Some(3.0), "2021-01-06"),
        ];

        let out = wrangle(&input).unwrap();

        assert_eq!(out.len(), 1);
        let rec = &out[0];
        assert_eq!(rec.cohort_id, 0.0);
        assert_eq!(rec.root_path, "javascript-i");
        assert_eq!(rec.root_path_2, "javascript-i/loops");
        assert_eq!(
            rec.date,
            NaiveDate::from_ymd_opt(2021, 1, 5)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    // ── Invariants ────────────────────────────────────────────────────────────

    #[test]
    fn test_wrangle_output_has_no_audit_columns() {
        let input = vec![raw(Some("html-css/elements"), Some(8.0), "2021-01-05")];
        let out = wrangle(&input).unwrap();

        let mut writer = csv::Writer::from_writer(Vec::new());
        for rec in &out {
            writer.serialize(rec).unwrap();
        }
        let bytes = writer.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let header: Vec<&str> = text.lines().next().unwrap().split(',').collect();

        assert_eq!(header, EnrichedRecord::COLUMNS.to_vec());
        for column in AUDIT_COLUMNS {
            assert!(!header.contains(&column));
        }
    }

    #[test]
    fn test_wrangle_root_paths_match_segments() {
        let input = vec![
            raw(Some("java-iii/servlets/intro"), Some(1.0), "2021-01-05"),
            raw(Some("/jquery"), Some(1.0), "2021-01-05"),
            raw(Some("spring/"), Some(1.0), "2021-01-05"),
        ];
        let out = wrangle(&input).unwrap();
        assert_eq!(out.len(), 3);

        for rec in &out {
            let parts: Vec<&str> = rec.path.split('/').collect();
            assert_eq!(rec.root_path, parts[0]);
            assert_eq!(rec.root_path_2, format!("{}/{}", parts[0], parts[1]));
            assert!(rec.path.starts_with(&rec.root_path));
            assert_ne!(rec.path, "/");
        }
        assert_eq!(out[0].root_path_2, "java-iii/servlets");
        assert_eq!(out[1].root_path, "");
        assert_eq!(out[1].root_path_2, "/jquery");
        assert_eq!(out[2].root_path_2, "spring/");
    }

    #[test]
    fn test_wrangle_drops_short_and_missing_paths() {
        let input = vec![
            raw(Some("toc"), Some(1.0), "2021-01-05"),
            raw(None, Some(1.0), "2021-01-05"),
            raw(Some("appendix/git"), None, "2021-01-05"),
            raw(Some("/"), None, "2021-01-05"),
        ];

        let (out, stats) = wrangle_with_stats(&input).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path, "appendix/git");
        assert_eq!(
            stats,
            WrangleStats {
                input_rows: 4,
                root_rows_removed: 1,
                short_paths_dropped: 2,
                output_rows: 1,
            }
        );
    }

    #[test]
    fn test_wrangle_preserves_row_order() {
        let input = vec![
            raw(Some("a/1"), Some(1.0), "2021-01-01"),
            raw(Some("single"), Some(1.0), "2021-01-02"),
            raw(Some("b/2"), Some(2.0), "2021-01-03"),
            raw(Some("/"), Some(2.0), "2021-01-04"),
            raw(Some("c/3"), None, "2021-01-05"),
        ];
        let out = wrangle(&input).unwrap();
        let paths: Vec<&str> = out.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["a/1", "b/2", "c/3"]);
        // Derived columns stay attached to their own row.
        let roots: Vec<&str> = out.iter().map(|r| r.root_path.as_str()).collect();
        assert_eq!(roots, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_wrangle_never_leaves_null_cohort() {
        let input = vec![
            raw(Some("a/b"), None, "2021-01-05"),
            raw(Some("a/c"), Some(28.0), "2021-01-05"),
        ];
        let out = wrangle(&input).unwrap();
        assert_eq!(out[0].cohort_id, NO_COHORT_ID);
        assert_eq!(out[1].cohort_id, 28.0);
    }

    #[test]
    fn test_wrangle_parses_cohort_dates() {
        let mut rec = raw(Some("a/b"), Some(3.0), "2021-01-05 10:00:00");
        rec.start_date = Some("2020-10-01".to_string());
        rec.end_date = Some("2021-03-01".to_string());

        let out = wrangle(&[rec]).unwrap();
        assert!(out[0].start_date.is_some());
        assert!(out[0].end_date.is_some());
        assert!(out[0].is_within_enrollment());
    }

    #[test]
    fn test_wrangle_malformed_date_fails() {
        let input = vec![raw(Some("a/b"), None, "January 5th")];
        let err = wrangle(&input).unwrap_err();
        assert!(matches!(err, LogsError::TimestampParse { column: "date", .. }));
    }

    #[test]
    fn test_wrangle_malformed_date_on_dropped_row_is_ignored() {
        // Dates are parsed after filtering, so dropped rows never fail.
        let input = vec![raw(Some("/"), None, "garbage")];
        assert!(wrangle(&input).unwrap().is_empty());
    }

    #[test]
    fn test_wrangle_does_not_mutate_input() {
        let input = vec![raw(Some("a/b"), None, "2021-01-05")];
        let before = input.clone();
        let _ = wrangle(&input).unwrap();
        assert_eq!(input, before);
    }

    #[test]
    fn test_split_path() {
        assert_eq!(
            split_path("a/b/c"),
            Some(PathSegments {
                root: "a",
                second: "b"
            })
        );
        assert_eq!(split_path("a"), None);
        assert_eq!(split_path(""), None);
    }
}
