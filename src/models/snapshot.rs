// src/models/snapshot.rs

//! Scraped attendance data and derived statistics.
//!
//! Everything here is rebuilt from scratch on every synchronization; nothing
//! is patched incrementally. `RawSnapshot` is what the crawl produces and
//! what gets persisted; `DistributedSnapshot` additionally carries the reto
//! distribution, so "has distribution run yet" is a type-level fact.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Student identity parsed from the page header. Immutable for the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    /// Full name as displayed
    pub full_name: String,

    /// Stable student identifier (DNI)
    pub dni: String,

    /// Group label from the second header block, if present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// One timetable slot of the weekly grid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionCell {
    /// Hour of day, 1..6
    pub hour: u8,

    /// Weekday, 1 (Monday) .. 5 (Friday)
    pub weekday: u8,

    /// ISO date of the weekday in the chosen week
    pub date: String,

    /// Subject label, `None` for an empty slot or a placeholder dash
    pub title: Option<String>,

    /// Raw status marker (the cell's class attribute), e.g. `"falta_J"`
    pub css_class: Option<String>,
}

/// A Monday-to-Friday window and its timetable cells.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeekSessions {
    /// Monday ISO date
    pub week_start: String,

    /// Friday ISO date
    pub week_end: String,

    /// The 5 ISO dates of the week, Monday..Friday
    pub days: Vec<String>,

    /// Up to 30 cells (6 hours x 5 days)
    pub sessions: Vec<SessionCell>,
}

/// Code legends parsed once per sync; authoritative for the whole snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Legend {
    /// Subject code -> human label
    pub modules: BTreeMap<String, String>,

    /// Absence-type code -> human label
    pub absence_types: BTreeMap<String, String>,
}

/// The portal's own percentage summary table, kept for cross-checking.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Percentages {
    /// Displayed row name (the student)
    pub name: String,

    /// Overall percentage as displayed
    pub total_percent: f64,

    /// Per-subject percentages keyed by column header
    pub by_module: BTreeMap<String, f64>,
}

/// Counters for one subject.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ModuleStats {
    /// Sessions that actually took place for this subject
    pub sessions_given: u32,

    /// Absence-type code -> count
    pub absence_counts: HashMap<String, u32>,
}

/// Per-subject counters plus a global absence-type tally.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AggregatedStats {
    /// Subject code -> counters. Every legend code appears, even at zero.
    pub modules: BTreeMap<String, ModuleStats>,

    /// Absence-type code -> total count across all subjects
    pub absence_totals: HashMap<String, u32>,
}

/// A subject code recognized as a challenge ("reto") module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetoInfo {
    /// Subject code
    pub code: String,

    /// Legend label (falls back to the code)
    pub label: String,

    /// Extracted group token, e.g. `"2DM3"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// Direct and reto-derived counts for one ordinary subject.
///
/// `direct` values come from the subject's own timetable cells; `derived`
/// values are the coefficient-weighted share of every reto targeting it,
/// summed at full precision. Only the totals are rounded (2 decimals).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ModuleCalculation {
    pub direct_faltas: f64,
    pub derived_faltas: f64,
    pub direct_sessions: f64,
    pub derived_sessions: f64,
    pub total_faltas: f64,
    pub total_sessions: f64,

    /// Derived faltas broken down by origin absence type, for audit display
    #[serde(default)]
    pub derived_by_type: BTreeMap<String, f64>,
}

/// Everything a sync produces before distribution runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawSnapshot {
    pub identity: Identity,
    pub legend: Legend,
    pub percentages: Percentages,
    pub weeks: Vec<WeekSessions>,
    pub aggregated: AggregatedStats,
}

/// Output of the reto distribution engine.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Distribution {
    /// Challenge modules found in the aggregate
    pub retos: Vec<RetoInfo>,

    /// reto code -> target subject code -> weight (sums to 1 per reto)
    pub coefficients: BTreeMap<String, BTreeMap<String, f64>>,

    /// Ordinary subject code -> direct/derived breakdown
    pub module_calculations: BTreeMap<String, ModuleCalculation>,
}

/// A raw snapshot with the distribution applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistributedSnapshot {
    #[serde(flatten)]
    pub raw: RawSnapshot,

    pub distribution: Distribution,
}

impl DistributedSnapshot {
    /// Coefficients for one reto, empty if the code is not a reto.
    pub fn coefficients_for(&self, reto: &str) -> Option<&BTreeMap<String, f64>> {
        self.distribution.coefficients.get(reto)
    }

    /// Label for a subject code, falling back to the code itself.
    pub fn label_for<'a>(&'a self, code: &'a str) -> &'a str {
        self.raw
            .legend
            .modules
            .get(code)
            .map(String::as_str)
            .unwrap_or(code)
    }
}

impl WeekSessions {
    /// True if `date` (ISO) falls inside this week's window.
    pub fn contains(&self, date: &str) -> bool {
        self.week_start.as_str() <= date && date <= self.week_end.as_str()
    }
}

/// Index of the week containing `today`, falling back to the last week.
pub fn default_week_index(weeks: &[WeekSessions], today: &str) -> Option<usize> {
    if weeks.is_empty() {
        return None;
    }
    weeks
        .iter()
        .position(|w| w.contains(today))
        .or(Some(weeks.len() - 1))
}
