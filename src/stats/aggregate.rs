// src/stats/aggregate.rs

//! Fold of crawled weeks into per-subject counters.

use crate::models::{AggregatedStats, Legend, ModuleStats, WeekSessions};
use crate::utils::extract_absence_code;

/// Fold all weeks into per-subject session/absence counters plus a global
/// absence-type tally.
///
/// Cells without a subject label are skipped entirely. Every subject code the
/// legend knows appears in the result even with zero counts, so downstream
/// lookups never need existence checks.
pub fn aggregate(weeks: &[WeekSessions], legend: &Legend) -> AggregatedStats {
    let mut stats = AggregatedStats::default();

    for week in weeks {
        for cell in &week.sessions {
            let Some(title) = cell.title.as_deref() else {
                continue;
            };
            let key = title.trim();
            if key.is_empty() {
                continue;
            }

            let entry = stats.modules.entry(key.to_string()).or_default();
            entry.sessions_given += 1;

            if let Some(code) = extract_absence_code(cell.css_class.as_deref()) {
                *entry.absence_counts.entry(code.clone()).or_insert(0) += 1;
                *stats.absence_totals.entry(code).or_insert(0) += 1;
            }
        }
    }

    for code in legend.modules.keys() {
        stats
            .modules
            .entry(code.clone())
            .or_insert_with(ModuleStats::default);
    }

    stats
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::models::SessionCell;

    fn cell(title: Option<&str>, css: Option<&str>) -> SessionCell {
        SessionCell {
            hour: 1,
            weekday: 1,
            date: "2025-09-22".to_string(),
            title: title.map(str::to_string),
            css_class: css.map(str::to_string),
        }
    }

    fn week(sessions: Vec<SessionCell>) -> WeekSessions {
        WeekSessions {
            week_start: "2025-09-22".to_string(),
            week_end: "2025-09-26".to_string(),
            days: Vec::new(),
            sessions,
        }
    }

    #[test]
    fn counts_sessions_and_absences_per_subject() {
        let weeks = vec![week(vec![
            cell(Some("M1"), Some("colblanco nofalta")),
            cell(Some("M1"), Some("colblanco falta_F")),
            cell(Some("M2"), Some("falta_J")),
            cell(None, None),
            cell(Some("   "), None), // blank labels are skipped
        ])];

        let stats = aggregate(&weeks, &Legend::default());
        assert_eq!(stats.modules["M1"].sessions_given, 2);
        assert_eq!(stats.modules["M1"].absence_counts.get("F"), Some(&1));
        assert_eq!(stats.modules["M2"].absence_counts.get("J"), Some(&1));
        assert_eq!(stats.absence_totals.get("F"), Some(&1));
        assert_eq!(stats.absence_totals.get("J"), Some(&1));
    }

    #[test]
    fn unlabeled_cells_are_not_sessions() {
        let weeks = vec![week(vec![cell(None, Some("falta_F"))])];
        let stats = aggregate(&weeks, &Legend::default());
        assert!(stats.modules.is_empty());
        assert!(stats.absence_totals.is_empty());
    }

    #[test]
    fn legend_codes_appear_with_zero_counts() {
        let legend = Legend {
            modules: BTreeMap::from([
                ("M9".to_string(), "Sin clases".to_string()),
            ]),
            absence_types: BTreeMap::new(),
        };
        let stats = aggregate(&[], &legend);
        assert_eq!(stats.modules["M9"].sessions_given, 0);
        assert!(stats.modules["M9"].absence_counts.is_empty());
    }

    #[test]
    fn counts_accumulate_across_weeks() {
        let weeks = vec![
            week(vec![cell(Some("M1"), Some("falta_R"))]),
            week(vec![cell(Some("M1"), Some("falta_R"))]),
        ];
        let stats = aggregate(&weeks, &Legend::default());
        assert_eq!(stats.modules["M1"].sessions_given, 2);
        assert_eq!(stats.modules["M1"].absence_counts.get("R"), Some(&2));
    }
}
