//! Report pipeline for the curriculum logs.
//!
//! Wrangles the raw table once and runs the requested aggregators,
//! returning a [`ReportBundle`] ready for rendering.

use std::time::Instant;

use chrono::{NaiveDateTime, Utc};
use logs_core::error::Result;
use logs_core::models::{
    EnrichedRecord, LessonCount, PathCount, RawLogRecord, ReportKind, UserEngagement,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aggregator::{distinct_users, q1, q3, q4, q5};
use crate::wrangle::{wrangle_with_stats, WrangleStats};

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside the reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// ISO-8601 timestamp when the bundle was generated.
    pub generated_at: String,
    /// Rows in the raw log table.
    pub raw_rows: usize,
    /// Rows that survived wrangling.
    pub enriched_rows: usize,
    /// Distinct users in the enriched table.
    pub users: usize,
    /// Earliest and latest access date in the enriched table.
    pub first_access: Option<NaiveDateTime>,
    pub last_access: Option<NaiveDateTime>,
    /// Row counts of each wrangling step.
    pub wrangle: WrangleStats,
    /// Reports included in the bundle, in canonical order.
    pub reports: Vec<ReportKind>,
    /// Wall-clock seconds spent wrangling.
    pub wrangle_time_seconds: f64,
    /// Wall-clock seconds spent in the aggregators.
    pub aggregate_time_seconds: f64,
}

/// Path counts per group plus each group's most visited path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupedReport {
    pub counts: Vec<PathCount>,
    pub top: Vec<PathCount>,
}

/// Per-user engagement and the active-window rows behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementReport {
    pub engagement: Vec<UserEngagement>,
    /// Number of rows inside an enrollment window.
    pub active_rows: usize,
    #[serde(skip)]
    pub active: Vec<EnrichedRecord>,
}

/// Every report requested for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportBundle {
    pub metadata: ReportMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_by_cohort: Option<GroupedReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub least_visited: Option<Vec<LessonCount>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_graduation: Option<GroupedReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_students: Option<EngagementReport>,
}

// ── Public function ───────────────────────────────────────────────────────────

/// Run the report pipeline.
///
/// 1. Wrangle `raw` into the enriched table.
/// 2. Run each aggregator named in `reports` (duplicates ignored).
/// 3. Return a [`ReportBundle`].
pub fn run_reports(raw: &[RawLogRecord], reports: &[ReportKind]) -> Result<ReportBundle> {
    let mut kinds = reports.to_vec();
    kinds.sort();
    kinds.dedup();

    // ── Step 1: Wrangle ───────────────────────────────────────────────────────
    let wrangle_start = Instant::now();
    let (records, stats) = wrangle_with_stats(raw)?;
    let wrangle_time = wrangle_start.elapsed().as_secs_f64();

    if records.is_empty() {
        warn!("No log rows left after wrangling {} raw rows", raw.len());
    }

    // ── Step 2: Aggregate ─────────────────────────────────────────────────────
    let aggregate_start = Instant::now();
    let mut bundle = ReportBundle {
        metadata: ReportMetadata {
            generated_at: Utc::now().to_rfc3339(),
            raw_rows: raw.len(),
            enriched_rows: records.len(),
            users: distinct_users(&records),
            first_access: records.iter().map(|r| r.date).min(),
            last_access: records.iter().map(|r| r.date).max(),
            wrangle: stats,
            reports: kinds.clone(),
            wrangle_time_seconds: wrangle_time,
            aggregate_time_seconds: 0.0,
        },
        pages_by_cohort: None,
        least_visited: None,
        post_graduation: None,
        active_students: None,
    };

    for kind in &kinds {
        match kind {
            ReportKind::PagesByCohort => {
                let (counts, top) = q1(&records);
                bundle.pages_by_cohort = Some(GroupedReport { counts, top });
            }
            ReportKind::LeastVisited => {
                bundle.least_visited = Some(q3(&records));
            }
            ReportKind::PostGraduation => {
                let (counts, top) = q4(&records);
                bundle.post_graduation = Some(GroupedReport { counts, top });
            }
            ReportKind::ActiveStudents => {
                let (engagement, active) = q5(&records);
                bundle.active_students = Some(EngagementReport {
                    engagement,
                    active_rows: active.len(),
                    active,
                });
            }
        }
        debug!("Computed report {}", kind);
    }

    // ── Step 3: Finish ────────────────────────────────────────────────────────
    bundle.metadata.aggregate_time_seconds = aggregate_start.elapsed().as_secs_f64();
    Ok(bundle)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
