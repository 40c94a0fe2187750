// src/utils/absences.rs

//! Absence-code extraction and the faltas weighting law.
//!
//! Timetable cells carry the absence type in their CSS class, e.g.
//! `"falta_J"` or `"colblanco falta_R"`. When totaling faltas anywhere in the
//! pipeline, justified absences (`J`) are excluded and late arrivals (`R`)
//! count at a third of their tally; every other code counts in full.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::WeekSessions;

static ABSENCE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"falta_(\w+)").expect("valid regex"));

/// Weight applied to the late-arrival code when totaling faltas.
const LATE_WEIGHT: f64 = 1.0 / 3.0;

/// Pull the absence-type code out of a raw status marker.
pub fn extract_absence_code(css_class: Option<&str>) -> Option<String> {
    let class = css_class?;
    ABSENCE_CODE_RE
        .captures(class)
        .map(|c| c[1].to_string())
}

/// Weight one absence-type code carries when totaling faltas.
pub fn code_weight(code: &str) -> f64 {
    match code {
        "J" => 0.0,
        "R" => LATE_WEIGHT,
        _ => 1.0,
    }
}

/// Weighted faltas total over a code→count map.
///
/// `J` contributes nothing, `R` a third, everything else its full count.
pub fn weighted_faltas(counts: &HashMap<String, u32>) -> f64 {
    counts
        .iter()
        .map(|(code, &n)| f64::from(n) * code_weight(code))
        .sum()
}

/// Absences recorded on one calendar day of a week.
#[derive(Debug, Clone, PartialEq)]
pub struct DayAbsences {
    /// ISO date of the day
    pub date: String,
    /// Number of absent sessions that day (unweighted)
    pub total: u32,
    /// Per-absence-type counts
    pub types: HashMap<String, u32>,
}

/// Per-day absence counts for one crawled week, in weekday order.
pub fn weekly_absence_summary(week: &WeekSessions) -> Vec<DayAbsences> {
    let mut by_date: Vec<DayAbsences> = week
        .days
        .iter()
        .map(|d| DayAbsences {
            date: d.clone(),
            total: 0,
            types: HashMap::new(),
        })
        .collect();

    for cell in &week.sessions {
        let Some(code) = extract_absence_code(cell.css_class.as_deref()) else {
            continue;
        };
        if let Some(day) = by_date.iter_mut().find(|d| d.date == cell.date) {
            day.total += 1;
            *day.types.entry(code).or_insert(0) += 1;
        }
    }

    by_date
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionCell;

    #[test]
    fn extracts_code_from_marker() {
        assert_eq!(extract_absence_code(Some("falta_J")), Some("J".to_string()));
        assert_eq!(
            extract_absence_code(Some("colblanco falta_R")),
            Some("R".to_string())
        );
        assert_eq!(extract_absence_code(Some("colblanco nofalta")), None);
        assert_eq!(extract_absence_code(None), None);
    }

    #[test]
    fn justified_never_counts_and_late_counts_a_third() {
        let counts = HashMap::from([
            ("J".to_string(), 5),
            ("R".to_string(), 3),
            ("F".to_string(), 2),
        ]);
        let total = weighted_faltas(&counts);
        assert!((total - 3.0).abs() < 1e-9); // 0 + 1 + 2
    }

    #[test]
    fn empty_counts_total_zero() {
        assert_eq!(weighted_faltas(&HashMap::new()), 0.0);
    }

    #[test]
    fn summary_buckets_by_day() {
        let week = WeekSessions {
            week_start: "2025-09-22".into(),
            week_end: "2025-09-26".into(),
            days: vec![
                "2025-09-22".into(),
                "2025-09-23".into(),
                "2025-09-24".into(),
                "2025-09-25".into(),
                "2025-09-26".into(),
            ],
            sessions: vec![
                SessionCell {
                    hour: 1,
                    weekday: 1,
                    date: "2025-09-22".into(),
                    title: Some("M1".into()),
                    css_class: Some("falta_F".into()),
                },
                SessionCell {
                    hour: 2,
                    weekday: 1,
                    date: "2025-09-22".into(),
                    title: Some("M1".into()),
                    css_class: Some("falta_J".into()),
                },
                SessionCell {
                    hour: 1,
                    weekday: 2,
                    date: "2025-09-23".into(),
                    title: Some("M2".into()),
                    css_class: Some("colblanco nofalta".into()),
                },
            ],
        };

        let summary = weekly_absence_summary(&week);
        assert_eq!(summary.len(), 5);
        assert_eq!(summary[0].total, 2);
        assert_eq!(summary[0].types.get("F"), Some(&1));
        assert_eq!(summary[0].types.get("J"), Some(&1));
        assert_eq!(summary[1].total, 0);
    }
}
