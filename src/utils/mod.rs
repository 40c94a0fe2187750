// src/utils/mod.rs

//! Shared helpers: calendar math and absence-code handling.

pub mod absences;
pub mod dates;

pub use absences::{
    code_weight, extract_absence_code, weekly_absence_summary, weighted_faltas, DayAbsences,
};
pub use dates::{academic_year_range, enumerate_mondays, iso_to_ddmmyyyy, normalize_ddmmyyyy};
