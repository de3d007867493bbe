//! Rendering of a whole [`ReportBundle`] as text tables or JSON.

use logs_core::error::{LogsError, Result};
use logs_core::formatting::{format_count, format_timestamp, percentage};
use logs_core::models::{LessonCount, PathCount, ReportKind, UserEngagement};
use logs_data::analysis::{GroupedReport, ReportBundle, ReportMetadata};

use crate::table_view::{Align, TextTable};

/// Output format for [`render_bundle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    /// Parse `"text"` or `"json"`.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(LogsError::Config(format!("unknown output format: {}", other))),
        }
    }
}

/// Render every report in `bundle`.
///
/// Text output prints at most `limit` rows per table; JSON output always
/// contains every row.
pub fn render_bundle(bundle: &ReportBundle, format: OutputFormat, limit: usize) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(bundle)?),
        OutputFormat::Text => Ok(render_text(bundle, limit)),
    }
}

fn render_text(bundle: &ReportBundle, limit: usize) -> String {
    let mut sections = vec![render_summary(&bundle.metadata)];

    for kind in &bundle.metadata.reports {
        match kind {
            ReportKind::PagesByCohort => {
                if let Some(report) = &bundle.pages_by_cohort {
                    sections.extend(grouped_tables(*kind, "cohort_id", report, limit));
                }
            }
            ReportKind::LeastVisited => {
                if let Some(lessons) = &bundle.least_visited {
                    sections.push(lesson_table(kind.title(), lessons).render(limit));
                }
            }
            ReportKind::PostGraduation => {
                if let Some(report) = &bundle.post_graduation {
                    sections.extend(grouped_tables(*kind, "program_id", report, limit));
                }
            }
            ReportKind::ActiveStudents => {
                if let Some(report) = &bundle.active_students {
                    let title = format!(
                        "{} ({} active rows)",
                        kind.title(),
                        format_count(report.active_rows as u64)
                    );
                    sections.push(engagement_table(&title, &report.engagement).render(limit));
                }
            }
        }
    }

    sections.join("\n")
}

fn render_summary(meta: &ReportMetadata) -> String {
    let dropped = meta.wrangle.root_rows_removed + meta.wrangle.short_paths_dropped;
    let mut summary = format!(
        "Curriculum logs: {} raw rows, {} enriched rows, {} users\n\
         Dropped {} root-page rows and {} short-path rows ({}% of input)\n",
        format_count(meta.raw_rows as u64),
        format_count(meta.enriched_rows as u64),
        format_count(meta.users as u64),
        format_count(meta.wrangle.root_rows_removed as u64),
        format_count(meta.wrangle.short_paths_dropped as u64),
        percentage(dropped as u64, meta.raw_rows as u64, 1),
    );
    if let (Some(first), Some(last)) = (meta.first_access, meta.last_access) {
        summary.push_str(&format!(
            "Accesses from {} to {}\n",
            format_timestamp(&first),
            format_timestamp(&last)
        ));
    }
    summary
}

fn grouped_tables(
    kind: ReportKind,
    group_label: &str,
    report: &GroupedReport,
    limit: usize,
) -> Vec<String> {
    vec![
        path_count_table(kind.title(), group_label, &report.counts).render(limit),
        path_count_table(
            &format!("Most visited path per {}", group_label),
            group_label,
            &report.top,
        )
        .render(limit),
    ]
}

fn path_count_table(title: &str, group_label: &str, rows: &[PathCount]) -> TextTable {
    let mut table = TextTable::new(
        title,
        &[group_label, "path", "count"],
        &[Align::Right, Align::Left, Align::Right],
    );
    for row in rows {
        table.push_row(vec![
            row.group.to_string(),
            row.path.clone(),
            format_count(row.count),
        ]);
    }
    table
}

fn lesson_table(title: &str, rows: &[LessonCount]) -> TextTable {
    let mut table = TextTable::new(title, &["root_path_2", "count"], &[Align::Left, Align::Right]);
    for row in rows {
        table.push_row(vec![row.root_path_2.clone(), format_count(row.count)]);
    }
    table
}

fn engagement_table(title: &str, rows: &[UserEngagement]) -> TextTable {
    let mut table = TextTable::new(
        title,
        &["user_id", "root_paths", "total_count"],
        &[Align::Right, Align::Right, Align::Right],
    );
    for row in rows {
        table.push_row(vec![
            row.user_id.to_string(),
            row.root_paths.to_string(),
            format_count(row.total_count),
        ]);
    }
    table
}
