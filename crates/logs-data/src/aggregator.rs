//! Aggregate views over the enriched log table.
//!
//! Every function here is pure: it borrows the enriched table and returns
//! freshly built report rows.

use std::collections::{BTreeMap, HashMap, HashSet};

use logs_core::models::{
    EnrichedRecord, LessonCount, NumericId, PathCount, UserEngagement, STAFF_COHORT_ID,
};

/// Long-format path counts per group, and the most visited path of each group.
pub type GroupedPathCounts = (Vec<PathCount>, Vec<PathCount>);

// ── q1: pages by cohort ───────────────────────────────────────────────────────

/// Count path accesses per cohort.
///
/// The first table holds one row per (cohort, path) with cohorts ascending
/// and counts descending within a cohort. The second holds each cohort's
/// most visited path.
pub fn q1(records: &[EnrichedRecord]) -> GroupedPathCounts {
    let counts = count_paths_by_group(
        records
            .iter()
            .map(|r| (r.cohort_key(), r.path.as_str())),
    );
    let top = max_per_group(&counts);
    (counts, top)
}

// ── q3: least visited lessons ─────────────────────────────────────────────────

/// Count `root_path_2` accesses outside the staff cohort, least visited first.
pub fn q3(records: &[EnrichedRecord]) -> Vec<LessonCount> {
    q3_excluding(records, STAFF_COHORT_ID)
}

/// [`q3`] with an explicit cohort to exclude.
pub fn q3_excluding(records: &[EnrichedRecord], staff_cohort: f64) -> Vec<LessonCount> {
    let staff = NumericId(staff_cohort);
    let mut tally: HashMap<&str, u64> = HashMap::new();
    for rec in records.iter().filter(|r| r.cohort_key() != staff) {
        *tally.entry(rec.root_path_2.as_str()).or_insert(0) += 1;
    }

    let mut lessons: Vec<LessonCount> = tally
        .into_iter()
        .map(|(lesson, count)| LessonCount {
            root_path_2: lesson.to_string(),
            count,
        })
        .collect();
    lessons.sort_by(|a, b| {
        a.count
            .cmp(&b.count)
            .then_with(|| a.root_path_2.cmp(&b.root_path_2))
    });
    lessons
}

// ── q4: post-graduation access ────────────────────────────────────────────────

/// Count path accesses per program for accesses made after the cohort ended.
///
/// Rows without an end date or program are not post-graduation accesses.
/// Ordering and the top-path table follow [`q1`].
pub fn q4(records: &[EnrichedRecord]) -> GroupedPathCounts {
    let counts = count_paths_by_group(
        post_graduation(records)
            .filter_map(|r| r.program_key().map(|program| (program, r.path.as_str()))),
    );
    let top = max_per_group(&counts);
    (counts, top)
}

/// Rows accessed strictly after their cohort's end date.
pub fn post_graduation(records: &[EnrichedRecord]) -> impl Iterator<Item = &EnrichedRecord> {
    records.iter().filter(|r| r.is_after_graduation())
}

// ── q5: active-student engagement ─────────────────────────────────────────────

/// Total accesses per user during their enrollment window.
///
/// Returns one row per user (ascending) together with the active-window rows
/// the totals were computed from.
pub fn q5(records: &[EnrichedRecord]) -> (Vec<UserEngagement>, Vec<EnrichedRecord>) {
    let active: Vec<EnrichedRecord> = records
        .iter()
        .filter(|r| r.is_within_enrollment())
        .cloned()
        .collect();

    let mut per_user: BTreeMap<i64, HashMap<&str, u64>> = BTreeMap::new();
    for rec in &active {
        *per_user
            .entry(rec.user_id)
            .or_default()
            .entry(rec.root_path.as_str())
            .or_insert(0) += 1;
    }

    let engagement: Vec<UserEngagement> = per_user
        .into_iter()
        .map(|(user_id, roots)| UserEngagement {
            user_id,
            root_paths: roots.len(),
            total_count: roots.values().sum(),
        })
        .collect();

    (engagement, active)
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Value-count `path` within each group.
///
/// Groups ascend; within a group counts descend with ties broken by path.
fn count_paths_by_group<'a>(
    rows: impl Iterator<Item = (NumericId, &'a str)>,
) -> Vec<PathCount> {
    let mut groups: BTreeMap<NumericId, HashMap<&'a str, u64>> = BTreeMap::new();
    for (group, path) in rows {
        *groups.entry(group).or_default().entry(path).or_insert(0) += 1;
    }

    let mut out = Vec::new();
    for (group, paths) in groups {
        let mut group_rows: Vec<PathCount> = paths
            .into_iter()
            .map(|(path, count)| PathCount {
                group,
                path: path.to_string(),
                count,
            })
            .collect();
        group_rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.path.cmp(&b.path)));
        out.extend(group_rows);
    }
    out
}

/// The highest-count row of each group in `counts`.
///
/// Ties go to the lexicographically smallest path.
pub fn max_per_group(counts: &[PathCount]) -> Vec<PathCount> {
    let mut best: BTreeMap<NumericId, &PathCount> = BTreeMap::new();
    for row in counts {
        best.entry(row.group)
            .and_modify(|current| {
                if row.count > current.count
                    || (row.count == current.count && row.path < current.path)
                {
                    *current = row;
                }
            })
            .or_insert(row);
    }
    best.into_values().cloned().collect()
}

/// Number of distinct users in `records`.
pub fn distinct_users(records: &[EnrichedRecord]) -> usize {
    records.iter().map(|r| r.user_id).collect::<HashSet<_>>().len()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn make_record(user_id: i64, cohort_id: f64, path: &str, date: NaiveDateTime) -> EnrichedRecord {
        let mut parts = path.split('/');
        let root = parts.next().unwrap().to_string();
        let second = parts.next().unwrap();
        EnrichedRecord {
            date,
            time: None,
            path: path.to_string(),
            user_id,
            cohort_id,
            ip: None,
            id: Some(cohort_id),
            name: None,
            start_date: Some(day(2021, 1, 1)),
            end_date: Some(day(2021, 3, 31)),
            program_id: Some(2.0),
            root_path_2: format!("{}/{}", root, second),
            root_path: root,
        }
    }

    fn sample() -> Vec<EnrichedRecord> {
        vec![
            make_record(1, 3.0, "javascript-i/loops", day(2021, 1, 5)),
            make_record(1, 3.0, "javascript-i/loops", day(2021, 1, 6)),
            make_record(2, 3.0, "html-css/elements", day(2021, 1, 6)),
            make_record(3, 0.0, "java-ii/arrays", day(2021, 1, 7)),
            make_record(4, 28.0, "spring/fundamentals", day(2021, 1, 8)),
            make_record(4, 28.0, "spring/fundamentals", day(2021, 1, 9)),
            make_record(5, 8.0, "javascript-i/loops", day(2021, 5, 1)),
            make_record(5, 8.0, "html-css/elements", day(2021, 6, 1)),
        ]
    }

    // ── q1 ────────────────────────────────────────────────────────────────────

    #[test]
    fn test_q1_counts_sum_to_cohort_rows() {
        let records = sample();
        let (counts, _) = q1(&records);

        let mut sums: BTreeMap<NumericId, u64> = BTreeMap::new();
        for row in &counts {
            *sums.entry(row.group).or_insert(0) += row.count;
        }
        for (cohort, total) in sums {
            let rows = records.iter().filter(|r| r.cohort_key() == cohort).count() as u64;
            assert_eq!(total, rows, "cohort {}", cohort);
        }
    }

    #[test]
    fn test_q1_sorted_descending_within_cohort() {
        let (counts, _) = q1(&sample());
        let cohort3: Vec<&PathCount> = counts.iter().filter(|c| c.group == NumericId(3.0)).collect();
        assert_eq!(cohort3.len(), 2);
        assert_eq!(cohort3[0].path, "javascript-i/loops");
        assert_eq!(cohort3[0].count, 2);
        assert_eq!(cohort3[1].count, 1);

        let groups: Vec<NumericId> = counts.iter().map(|c| c.group).collect();
        let mut sorted = groups.clone();
        sorted.sort();
        assert_eq!(groups, sorted, "cohorts must be contiguous and ascending");
    }

    #[test]
    fn test_q1_max_per_cohort() {
        let (_, top) = q1(&sample());
        assert_eq!(top.len(), 4);
        let cohort3 = top.iter().find(|t| t.group == NumericId(3.0)).unwrap();
        assert_eq!(cohort3.path, "javascript-i/loops");
        assert_eq!(cohort3.count, 2);
    }

    #[test]
    fn test_q1_max_tie_breaks_on_path() {
        let (_, top) = q1(&sample());
        // Cohort 8 has one hit each on two paths.
        let cohort8 = top.iter().find(|t| t.group == NumericId(8.0)).unwrap();
        assert_eq!(cohort8.path, "html-css/elements");
        assert_eq!(cohort8.count, 1);
    }

    #[test]
    fn test_q1_empty_input() {
        let (counts, top) = q1(&[]);
        assert!(counts.is_empty());
        assert!(top.is_empty());
    }

    // ── q3 ────────────────────────────────────────────────────────────────────

    #[test]
    fn test_q3_excludes_staff() {
        let lessons = q3(&sample());
        assert!(lessons
            .iter()
            .all(|l| l.root_path_2 != "spring/fundamentals"));
    }

    #[test]
    fn test_q3_sorted_ascending() {
        let lessons = q3(&sample());
        let counts: Vec<u64> = lessons.iter().map(|l| l.count).collect();
        let mut sorted = counts.clone();
        sorted.sort();
        assert_eq!(counts, sorted);
        assert_eq!(lessons[0].root_path_2, "java-ii/arrays");
        assert_eq!(lessons.last().unwrap().root_path_2, "javascript-i/loops");
        assert_eq!(lessons.last().unwrap().count, 3);
    }

    #[test]
    fn test_q3_excluding_custom_cohort() {
        let lessons = q3_excluding(&sample(), 3.0);
        assert!(lessons.iter().any(|l| l.root_path_2 == "spring/fundamentals"));
        let loops = lessons
            .iter()
            .find(|l| l.root_path_2 == "javascript-i/loops")
            .unwrap();
        assert_eq!(loops.count, 1);
    }

    // ── q4 ────────────────────────────────────────────────────────────────────

    #[test]
    fn test_q4_only_after_graduation() {
        let records = sample();
        assert!(post_graduation(&records).all(|r| r.end_date.unwrap() < r.date));

        let (counts, top) = q4(&records);
        let total: u64 = counts.iter().map(|c| c.count).sum();
        assert_eq!(total, 2);
        assert!(counts.iter().all(|c| c.group == NumericId(2.0)));
        assert_eq!(top.len(), 1);
    }

    #[test]
    fn test_q4_end_date_itself_is_not_post_graduation() {
        let records = vec![make_record(1, 3.0, "a/b", day(2021, 3, 31))];
        let (counts, _) = q4(&records);
        assert!(counts.is_empty());
    }

    #[test]
    fn test_q4_skips_rows_without_program() {
        let mut rec = make_record(1, 3.0, "a/b", day(2022, 1, 1));
        rec.program_id = None;
        let (counts, top) = q4(&[rec]);
        assert!(counts.is_empty());
        assert!(top.is_empty());
    }

    #[test]
    fn test_q4_groups_by_program() {
        let mut web = make_record(1, 3.0, "a/b", day(2022, 1, 1));
        web.program_id = Some(1.0);
        let data = make_record(2, 4.0, "c/d", day(2022, 1, 1));
        let (counts, top) = q4(&[data, web]);
        assert_eq!(counts[0].group, NumericId(1.0));
        assert_eq!(counts[1].group, NumericId(2.0));
        assert_eq!(top.len(), 2);
    }

    // ── q5 ────────────────────────────────────────────────────────────────────

    #[test]
    fn test_q5_active_rows_within_window() {
        let (_, active) = q5(&sample());
        assert_eq!(active.len(), 6);
        for rec in &active {
            assert!(rec.start_date.unwrap() <= rec.date);
            assert!(rec.date <= rec.end_date.unwrap());
        }
    }

    #[test]
    fn test_q5_sums_match_active_rows_per_user() {
        let (engagement, active) = q5(&sample());
        for row in &engagement {
            let rows = active.iter().filter(|r| r.user_id == row.user_id).count() as u64;
            assert_eq!(row.total_count, rows);
        }
        let users: Vec<i64> = engagement.iter().map(|e| e.user_id).collect();
        assert_eq!(users, vec![1, 2, 3, 4]);
        assert_eq!(engagement[0].total_count, 2);
        assert_eq!(engagement[0].root_paths, 1);
    }

    #[test]
    fn test_q5_bounds_are_inclusive() {
        let records = vec![
            make_record(1, 3.0, "a/b", day(2021, 1, 1)),
            make_record(1, 3.0, "a/c", day(2021, 3, 31)),
            make_record(1, 3.0, "a/d", day(2020, 12, 31)),
        ];
        let (engagement, active) = q5(&records);
        assert_eq!(active.len(), 2);
        assert_eq!(engagement[0].total_count, 2);
    }

    #[test]
    fn test_q5_rows_without_dates_are_inactive() {
        let mut rec = make_record(1, 0.0, "a/b", day(2021, 2, 1));
        rec.start_date = None;
        rec.end_date = None;
        let (engagement, active) = q5(&[rec]);
        assert!(engagement.is_empty());
        assert!(active.is_empty());
    }

    // ── helpers ───────────────────────────────────────────────────────────────

    #[test]
    fn test_distinct_users() {
        assert_eq!(distinct_users(&sample()), 5);
        assert_eq!(distinct_users(&[]), 0);
    }
}
