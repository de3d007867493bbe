use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Cohort identifier used for staff accounts in the curriculum dataset.
///
/// Staff traffic is excluded from the least-visited lesson report.
pub const STAFF_COHORT_ID: f64 = 28.0;

/// Sentinel written into `cohort_id` when an access has no cohort.
pub const NO_COHORT_ID: f64 = 0.0;

/// The site root; accesses to it carry no lesson information.
pub const ROOT_PATH: &str = "/";

/// Columns removed by enrichment.
pub const AUDIT_COLUMNS: [&str; 4] = ["slack", "created_at", "updated_at", "deleted_at"];

// ── NumericId ─────────────────────────────────────────────────────────────────

/// A float-typed identifier (`cohort_id`, `program_id`) usable as a map key.
///
/// Identifiers arrive as floats because the left join makes them nullable.
/// Ordering is [`f64::total_cmp`], so every value has a defined position.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NumericId(pub f64);

impl NumericId {
    pub fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for NumericId {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NumericId {}

impl PartialOrd for NumericId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NumericId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for NumericId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Debug keeps the trailing ".0" the dataset is known by (e.g. 28.0).
        write!(f, "{:?}", self.0)
    }
}

// ── RawLogRecord ──────────────────────────────────────────────────────────────

/// One page-access event joined with its cohort metadata.
///
/// Field order is the column order of `logs` followed by `cohorts`, which is
/// also the column order of the cache file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLogRecord {
    /// Access date as stored (`YYYY-MM-DD` or a full timestamp).
    pub date: String,
    /// Access time of day, carried through untouched.
    pub time: Option<String>,
    /// Slash-delimited page path; may be null in the source table.
    pub path: Option<String>,
    pub user_id: i64,
    /// `None` when the access is not tied to a cohort.
    pub cohort_id: Option<f64>,
    pub ip: Option<String>,
    /// Cohort primary key from the joined table.
    pub id: Option<f64>,
    /// Cohort name.
    pub name: Option<String>,
    pub slack: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub deleted_at: Option<String>,
    pub program_id: Option<f64>,
}

impl RawLogRecord {
    /// Column names in file order.
    pub const COLUMNS: [&'static str; 15] = [
        "date",
        "time",
        "path",
        "user_id",
        "cohort_id",
        "ip",
        "id",
        "name",
        "slack",
        "start_date",
        "end_date",
        "created_at",
        "updated_at",
        "deleted_at",
        "program_id",
    ];

    /// Minimal record with only the log-side columns set.
    pub fn new(date: impl Into<String>, path: Option<&str>, user_id: i64) -> Self {
        Self {
            date: date.into(),
            time: None,
            path: path.map(str::to_string),
            user_id,
            cohort_id: None,
            ip: None,
            id: None,
            name: None,
            slack: None,
            start_date: None,
            end_date: None,
            created_at: None,
            updated_at: None,
            deleted_at: None,
            program_id: None,
        }
    }
}

// ── EnrichedRecord ────────────────────────────────────────────────────────────

/// A cleaned log row ready for aggregation.
///
/// Audit columns are gone, `cohort_id` is never null, the path has at least
/// two segments and all three dates are calendar timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub date: NaiveDateTime,
    pub time: Option<String>,
    pub path: String,
    pub user_id: i64,
    /// [`NO_COHORT_ID`] when the source row had no cohort.
    pub cohort_id: f64,
    pub ip: Option<String>,
    pub id: Option<f64>,
    pub name: Option<String>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub program_id: Option<f64>,
    /// First path segment.
    pub root_path: String,
    /// First two path segments joined by `/`.
    pub root_path_2: String,
}

impl EnrichedRecord {
    /// Column names in serialization order.
    pub const COLUMNS: [&'static str; 13] = [
        "date",
        "time",
        "path",
        "user_id",
        "cohort_id",
        "ip",
        "id",
        "name",
        "start_date",
        "end_date",
        "program_id",
        "root_path",
        "root_path_2",
    ];

    pub fn cohort_key(&self) -> NumericId {
        NumericId(self.cohort_id)
    }

    pub fn program_key(&self) -> Option<NumericId> {
        self.program_id.map(NumericId)
    }

    /// `true` when the access happened strictly after the cohort ended.
    pub fn is_after_graduation(&self) -> bool {
        self.end_date.is_some_and(|end| end < self.date)
    }

    /// `true` when the access falls inside `[start_date, end_date]`.
    pub fn is_within_enrollment(&self) -> bool {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => start <= self.date && self.date <= end,
            _ => false,
        }
    }
}

// ── Report rows ───────────────────────────────────────────────────────────────

/// Number of accesses to one path within one group (cohort or program).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathCount {
    pub group: NumericId,
    pub path: String,
    pub count: u64,
}

/// Number of accesses to one second-level lesson path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonCount {
    pub root_path_2: String,
    pub count: u64,
}

/// Total root-path accesses by one user during enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEngagement {
    pub user_id: i64,
    /// Number of distinct root paths the user visited.
    pub root_paths: usize,
    pub total_count: u64,
}

// ── ReportKind ────────────────────────────────────────────────────────────────

/// The aggregate views the pipeline can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    PagesByCohort,
    LeastVisited,
    PostGraduation,
    ActiveStudents,
}

impl ReportKind {
    pub const ALL: [ReportKind; 4] = [
        ReportKind::PagesByCohort,
        ReportKind::LeastVisited,
        ReportKind::PostGraduation,
        ReportKind::ActiveStudents,
    ];

    /// Command-line spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::PagesByCohort => "pages-by-cohort",
            ReportKind::LeastVisited => "least-visited",
            ReportKind::PostGraduation => "post-graduation",
            ReportKind::ActiveStudents => "active-students",
        }
    }

    /// Parse the command-line spelling. Returns `None` for unknown names.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    pub fn title(self) -> &'static str {
        match self {
            ReportKind::PagesByCohort => "Pages by cohort",
            ReportKind::LeastVisited => "Least visited lessons (staff excluded)",
            ReportKind::PostGraduation => "Post-graduation access by program",
            ReportKind::ActiveStudents => "Active student engagement",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
