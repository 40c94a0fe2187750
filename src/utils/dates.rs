// src/utils/dates.rs

//! Academic-calendar math.
//!
//! The portal serves one page per week, selected by the Monday date. The
//! academic year runs from September 1 to August 31 of the following year.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// The academic year containing `today`: September 1 through August 31.
///
/// Before September 1 the window starts the previous year.
pub fn academic_year_range(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let sept_first = NaiveDate::from_ymd_opt(today.year(), 9, 1).expect("valid date");
    let start_year = if today < sept_first {
        today.year() - 1
    } else {
        today.year()
    };
    let start = NaiveDate::from_ymd_opt(start_year, 9, 1).expect("valid date");
    let end = NaiveDate::from_ymd_opt(start_year + 1, 8, 31).expect("valid date");
    (start, end)
}

/// Every Monday in `[start, end]`, ascending.
pub fn enumerate_mondays(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let days_to_monday = match start.weekday() {
        Weekday::Mon => 0,
        Weekday::Sun => 1,
        other => 8 - other.number_from_monday() as i64,
    };
    let mut monday = start + Duration::days(days_to_monday);
    let mut result = Vec::new();
    while monday <= end {
        result.push(monday);
        monday += Duration::days(7);
    }
    result
}

/// Format a date the way the portal's week selector expects it.
pub fn iso_to_ddmmyyyy(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

/// Normalize a `DD-MM-YYYY` string from the page into ISO `YYYY-MM-DD`.
///
/// Text that does not contain a date is returned untouched, matching the
/// tolerant behavior of the page headers.
pub fn normalize_ddmmyyyy(text: &str) -> String {
    use std::sync::LazyLock;
    static DATE_RE: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"(\d{2})-(\d{2})-(\d{4})").expect("valid regex"));

    match DATE_RE.captures(text) {
        Some(c) => format!("{}-{}-{}", &c[3], &c[2], &c[1]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn range_after_september_starts_current_year() {
        let (start, end) = academic_year_range(d(2025, 10, 15));
        assert_eq!(start, d(2025, 9, 1));
        assert_eq!(end, d(2026, 8, 31));
    }

    #[test]
    fn range_before_september_starts_previous_year() {
        let (start, end) = academic_year_range(d(2026, 3, 2));
        assert_eq!(start, d(2025, 9, 1));
        assert_eq!(end, d(2026, 8, 31));
    }

    #[test]
    fn range_on_september_first_starts_current_year() {
        let (start, _) = academic_year_range(d(2025, 9, 1));
        assert_eq!(start, d(2025, 9, 1));
    }

    #[test]
    fn mondays_are_ascending_and_weekly() {
        // 2025-09-01 is a Monday
        let mondays = enumerate_mondays(d(2025, 9, 1), d(2026, 8, 31));
        assert_eq!(mondays[0], d(2025, 9, 1));
        assert_eq!(mondays[1], d(2025, 9, 8));
        assert!(mondays.windows(2).all(|w| w[1] - w[0] == Duration::days(7)));
        assert!(*mondays.last().unwrap() <= d(2026, 8, 31));
    }

    #[test]
    fn mondays_from_midweek_start() {
        // 2024-09-01 is a Sunday, so the first Monday is the 2nd
        let mondays = enumerate_mondays(d(2024, 9, 1), d(2024, 9, 30));
        assert_eq!(mondays[0], d(2024, 9, 2));
        // 2025-09-03 is a Wednesday, first Monday is the 8th
        let mondays = enumerate_mondays(d(2025, 9, 3), d(2025, 9, 30));
        assert_eq!(mondays[0], d(2025, 9, 8));
    }

    #[test]
    fn date_round_trip() {
        assert_eq!(iso_to_ddmmyyyy(d(2025, 9, 24)), "24-09-2025");
        assert_eq!(normalize_ddmmyyyy("24-09-2025"), "2025-09-24");
        assert_eq!(normalize_ddmmyyyy("Mi\u{e9}rcoles<br>24-09-2025"), "2025-09-24");
        assert_eq!(normalize_ddmmyyyy("not a date"), "not a date");
    }
}
