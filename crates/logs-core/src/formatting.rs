//! Number and timestamp formatting shared by the report renderers.

use chrono::NaiveDateTime;

/// Format an access count with thousands separators.
///
/// # Examples
///
/// ```
/// use logs_core::formatting::format_count;
///
/// assert_eq!(format_count(0), "0");
/// assert_eq!(format_count(1234), "1,234");
/// assert_eq!(format_count(1234567), "1,234,567");
/// ```
pub fn format_count(value: u64) -> String {
    group_thousands(&value.to_string())
}

/// Share of `part` in `whole` as a percentage rounded to `decimal_places`.
///
/// Returns `0.0` when `whole` is zero.
pub fn percentage(part: u64, whole: u64, decimal_places: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let factor = 10_f64.powi(decimal_places as i32);
    ((part as f64 / whole as f64) * 100.0 * factor).round() / factor
}

/// Render a timestamp the way the cache file stores dates.
///
/// Midnight timestamps collapse to the bare date.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    if ts.time() == chrono::NaiveTime::MIN {
        ts.format("%Y-%m-%d").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Insert `,` separators every three digits from the right.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_format_count_small_values() {
        assert_eq!(format_count(7), "7");
        assert_eq!(format_count(999), "999");
    }

    #[test]
    fn test_format_count_grouping() {
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(900_223), "900,223");
        assert_eq!(format_count(12_345_678), "12,345,678");
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(1, 3, 1), 33.3);
        assert_eq!(percentage(5, 0, 2), 0.0);
        assert_eq!(percentage(2, 2, 0), 100.0);
    }

    #[test]
    fn test_format_timestamp_midnight_is_date_only() {
        let ts = NaiveDate::from_ymd_opt(2021, 1, 5)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(format_timestamp(&ts), "2021-01-05");
    }

    #[test]
    fn test_format_timestamp_with_time() {
        let ts = NaiveDate::from_ymd_opt(2021, 1, 5)
            .unwrap()
            .and_hms_opt(14, 3, 9)
            .unwrap();
        assert_eq!(format_timestamp(&ts), "2021-01-05 14:03:09");
    }
}
