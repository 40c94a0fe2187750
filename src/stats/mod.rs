// src/stats/mod.rs

//! Statistics over crawled weeks: aggregation, reto distribution and the
//! percentage/projection calculators.

pub mod aggregate;
pub mod calc;
pub mod distribute;

use std::sync::LazyLock;

use regex::Regex;

pub use aggregate::aggregate;
pub use calc::{calculate, compute_plan, percent, round2};
pub use distribute::distribute;

/// Challenge-module token: digit, two letters, digit, bounded by
/// non-alphanumeric context. E.g. `2DM3` inside `"2DM3 - R1"`.
static RETO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^A-Za-z0-9])(\d[A-Za-z]{2}\d)(?:[^A-Za-z0-9]|$)").expect("valid regex")
});

/// Single source of truth for challenge-module classification: the code or
/// its legend label carries a challenge token.
pub fn is_reto(code: &str, label: Option<&str>) -> bool {
    RETO_RE.is_match(code) || label.is_some_and(|l| RETO_RE.is_match(l))
}

/// Extract the challenge group token from a code or label, if any.
pub fn extract_group_token(text: &str) -> Option<String> {
    RETO_RE
        .captures(text)
        .map(|c| c[1].to_ascii_uppercase())
}
