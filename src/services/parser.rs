// src/services/parser.rs

//! Structural parser for the weekly attendance page.
//!
//! One server-rendered HTML document carries everything: the student header,
//! the hour-by-weekday timetable grid, the code legends and the portal's own
//! percentage table. The module legend block is known to ship malformed
//! markup (header text bleeding into the first data line, stray control
//! characters); `parse_module_legend` implements the recovery rule for it.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{Identity, Legend, Percentages, SessionCell, WeekSessions};
use crate::utils::normalize_ddmmyyyy;

static FORM_TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".form-title h2").expect("valid selector"));
static FORM_CONTAINER_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".form-container").expect("valid selector"));
static TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("valid selector"));
static TR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("valid selector"));
static TD_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").expect("valid selector"));
static TH_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").expect("valid selector"));
static H2_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2").expect("valid selector"));
static SPAN_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span").expect("valid selector"));
static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("valid selector"));
static HEADER_CELL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td.colcabecera").expect("valid selector"));
static PERCENT_TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#tablafaltasfija").expect("valid selector"));

static IDENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)\s+(\w{7,9}[A-Z])$").expect("valid regex"));
static HOUR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").expect("valid regex"));
static BR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static LEGEND_PAIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^:]+):\s*(.+)$").expect("valid regex"));
static ABSENCE_PAIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]):\s*(.+)$").expect("valid regex"));

/// Everything extracted from one week page.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPage {
    pub identity: Identity,
    pub week: WeekSessions,
    pub legend: Legend,
    pub percentages: Percentages,
}

/// Parse one week page into its structured parts.
pub fn parse_week_page(html: &str) -> Result<ParsedPage> {
    let document = Html::parse_document(html);

    let identity = parse_identity(&document);

    let timetable = document
        .select(&TABLE_SEL)
        .find(|t| t.text().any(|s| s.contains("Sesiones")))
        .ok_or_else(|| AppError::parse("timetable", "no table containing 'Sesiones'"))?;

    let days = parse_week_days(&timetable)?;
    let sessions = parse_sessions(&timetable, &days);

    let week = WeekSessions {
        week_start: days[0].clone(),
        week_end: days[4].clone(),
        days,
        sessions,
    };

    let legend = parse_legend(&document)?;
    let percentages = parse_percentages(&document)?;

    Ok(ParsedPage {
        identity,
        week,
        legend,
        percentages,
    })
}

/// First two header blocks: "Name Surname DNI" and, if present, the group.
fn parse_identity(document: &Html) -> Identity {
    let titles: Vec<String> = document
        .select(&FORM_TITLE_SEL)
        .map(|el| collect_text(&el))
        .filter(|s| !s.is_empty())
        .collect();

    let first = titles.first().cloned().unwrap_or_default().replace(',', "");
    let (full_name, dni) = match IDENTITY_RE.captures(first.trim()) {
        Some(c) => (c[1].trim().to_string(), c[2].trim().to_string()),
        None => (first.trim().to_string(), String::new()),
    };

    Identity {
        full_name,
        dni,
        group: titles.get(1).cloned(),
    }
}

/// The 5 ISO dates from the weekday header row.
fn parse_week_days(timetable: &ElementRef) -> Result<Vec<String>> {
    let header_row = timetable
        .select(&TR_SEL)
        .find(|row| row.select(&HEADER_CELL_SEL).count() >= 5)
        .ok_or_else(|| AppError::parse("timetable", "no weekday header row"))?;

    let cells: Vec<ElementRef> = header_row.select(&HEADER_CELL_SEL).collect();
    let days: Vec<String> = cells[cells.len() - 5..]
        .iter()
        .map(|cell| {
            // Two-line cell: weekday name <br> DD-MM-YYYY
            let html = cell.inner_html();
            let mut parts = BR_RE.split(&html);
            let first = parts.next().unwrap_or("");
            let date_text = parts.next().unwrap_or(first);
            normalize_ddmmyyyy(TAG_RE.replace_all(date_text, "").trim())
        })
        .collect();

    if days.len() != 5 {
        return Err(AppError::parse("timetable", "expected 5 weekday columns"));
    }
    Ok(days)
}

/// All timetable cells from the hour rows (rows whose first cell is a bare
/// integer).
fn parse_sessions(timetable: &ElementRef, days: &[String]) -> Vec<SessionCell> {
    let mut sessions = Vec::new();

    for row in timetable.select(&TR_SEL) {
        let cells: Vec<ElementRef> = row.select(&TD_SEL).collect();
        let Some(first) = cells.first() else { continue };
        let hour_text = collect_text(first);
        if !HOUR_RE.is_match(&hour_text) {
            continue;
        }
        let hour: u8 = hour_text.parse().unwrap_or(0);

        for (idx, cell) in cells.iter().skip(1).take(5).enumerate() {
            let text = collect_text(cell);
            let title = if text.is_empty() || text == "-" {
                None
            } else {
                Some(text)
            };
            sessions.push(SessionCell {
                hour,
                weekday: (idx + 1) as u8,
                date: days.get(idx).cloned().unwrap_or_default(),
                title,
                css_class: cell.value().attr("class").map(str::to_string),
            });
        }
    }

    sessions
}

fn parse_legend(document: &Html) -> Result<Legend> {
    let container = document
        .select(&FORM_CONTAINER_SEL)
        .find(|c| c.text().any(|s| s.contains("LEYENDA")))
        .ok_or_else(|| AppError::parse("legend", "no container with 'LEYENDA'"))?;

    let modules_td = container
        .select(&TD_SEL)
        .find(|td| has_heading(td, "MODULOS"))
        .ok_or_else(|| AppError::parse("legend", "no MODULOS block"))?;
    let modules = parse_module_legend(&modules_td.inner_html());

    let absence_td = container
        .select(&TD_SEL)
        .find(|td| has_heading(td, "FALTAS"))
        .ok_or_else(|| AppError::parse("legend", "no FALTAS block"))?;

    let mut absence_types = BTreeMap::new();
    for span in absence_td.select(&SPAN_SEL) {
        let text = collect_text(&span);
        if let Some(c) = ABSENCE_PAIR_RE.captures(&text) {
            absence_types.insert(c[1].to_string(), c[2].trim().to_string());
        }
    }

    Ok(Legend {
        modules,
        absence_types,
    })
}

/// Recover `CODE: Description` pairs from the malformed module legend block.
///
/// The block is plain text with `<br>` separators, but the header text bleeds
/// into the first data line and lines may carry stray control characters.
/// Per line: only the text after the last tab is meaningful; lines that do
/// not parse as a pair are discarded.
fn parse_module_legend(fragment: &str) -> BTreeMap<String, String> {
    let mut modules = BTreeMap::new();

    for line in BR_RE.split(fragment) {
        let stripped = TAG_RE.replace_all(line, "");
        let candidate = stripped.rsplit('\t').next().unwrap_or("");
        let candidate: String = candidate.chars().filter(|c| !c.is_control()).collect();
        let candidate = candidate.trim();
        let candidate = candidate
            .strip_prefix("MODULOS")
            .map(str::trim_start)
            .unwrap_or(candidate);

        if let Some(c) = LEGEND_PAIR_RE.captures(candidate) {
            modules.insert(c[1].trim().to_string(), c[2].trim().to_string());
        }
    }

    modules
}

fn parse_percentages(document: &Html) -> Result<Percentages> {
    let table = document
        .select(&PERCENT_TABLE_SEL)
        .next()
        .ok_or_else(|| AppError::parse("percentages", "no #tablafaltasfija table"))?;

    let rows: Vec<ElementRef> = table.select(&TR_SEL).collect();
    if rows.len() < 2 {
        return Err(AppError::parse("percentages", "missing data row"));
    }

    let headers: Vec<String> = rows[0].select(&TH_SEL).skip(2).map(|th| collect_text(&th)).collect();
    let cells: Vec<ElementRef> = rows[1].select(&TD_SEL).collect();
    if cells.len() < 2 {
        return Err(AppError::parse("percentages", "data row too short"));
    }

    let name = cells[0]
        .select(&ANCHOR_SEL)
        .next()
        .map(|a| collect_text(&a))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| collect_text(&cells[0]));

    let total_percent = parse_percent_text(&collect_text(&cells[1]));

    let mut by_module = BTreeMap::new();
    for (idx, key) in headers.iter().enumerate() {
        let value = cells
            .get(idx + 2)
            .map(|td| parse_percent_text(&collect_text(td)))
            .unwrap_or(0.0);
        by_module.insert(key.clone(), value);
    }

    Ok(Percentages {
        name,
        total_percent,
        by_module,
    })
}

/// Parse a displayed percentage, tolerating the locale decimal comma.
fn parse_percent_text(text: &str) -> f64 {
    text.replace('%', "")
        .replace(',', ".")
        .trim()
        .parse()
        .unwrap_or(0.0)
}

fn collect_text(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn has_heading(td: &ElementRef, heading: &str) -> bool {
    td.select(&H2_SEL)
        .any(|h| collect_text(&h).contains(heading))
}
