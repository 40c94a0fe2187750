// src/stats/calc.rs

//! Percentage math and the what-if projection calculators.
//!
//! Both entry points are pure functions over an already-distributed snapshot.
//! Plan entries are best-effort: unknown codes and non-positive hours are
//! skipped, never rejected.

use std::collections::BTreeMap;

use crate::error::{AppError, Result};
use crate::models::{
    CalculateResponse, CountSnapshot, DistributedSnapshot, ModuleMeta, ModuleProjection,
    PlanEntry, PlanKind, PlanResponse, PlanScope, ProjectionTriple, RetoAnalysis,
    RetoTargetProjection, ScopeTotals,
};
use crate::stats::{extract_group_token, is_reto};
use crate::utils::weighted_faltas;

/// Round to 2 decimals, the display precision for all stored totals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Absence percentage, clamped to [0, 100]. Zero when no sessions took place.
pub fn percent(faltas: f64, sessions: f64) -> f64 {
    if sessions <= 0.0 {
        return 0.0;
    }
    round2(100.0 * faltas / sessions).clamp(0.0, 100.0)
}

/// Apply a plan of hypothetical absence/attendance entries and report
/// base/projected/delta for the overall total and every ordinary module.
pub fn compute_plan(snapshot: &DistributedSnapshot, entries: &[PlanEntry]) -> PlanResponse {
    let aggregated = &snapshot.raw.aggregated;
    let base_sessions: f64 = aggregated
        .modules
        .values()
        .map(|m| f64::from(m.sessions_given))
        .sum();
    let base_faltas = weighted_faltas(&aggregated.absence_totals);

    let mut general_sessions_delta = 0.0;
    let mut general_faltas_delta = 0.0;
    let mut sessions_delta: BTreeMap<&str, f64> = BTreeMap::new();
    let mut faltas_delta: BTreeMap<&str, f64> = BTreeMap::new();

    for entry in entries {
        if !entry.hours.is_finite() || entry.hours <= 0.0 {
            continue;
        }
        let hours = entry.hours;
        let adds_faltas = matches!(entry.kind, PlanKind::Absence);

        match entry.scope {
            PlanScope::General => {
                general_sessions_delta += hours;
                if adds_faltas {
                    general_faltas_delta += hours;
                }
            }
            PlanScope::Module => {
                let Some(code) = entry.code.as_deref() else {
                    continue;
                };
                let Some(code) = aggregated.modules.keys().find(|k| k.as_str() == code) else {
                    continue;
                };
                general_sessions_delta += hours;
                *sessions_delta.entry(code).or_insert(0.0) += hours;
                if adds_faltas {
                    general_faltas_delta += hours;
                    *faltas_delta.entry(code).or_insert(0.0) += hours;
                }
            }
            PlanScope::Reto => {
                let Some(code) = entry.code.as_deref() else {
                    continue;
                };
                let Some(coefficients) = snapshot.coefficients_for(code) else {
                    continue;
                };
                // a reto hour counts on the reto's own row and again, split by
                // coefficient, on every target row; the general totals sum all
                // rows, so they move by the hour plus its propagated shares
                general_sessions_delta += hours;
                if adds_faltas {
                    general_faltas_delta += hours;
                }
                for (target, coef) in coefficients {
                    general_sessions_delta += hours * coef;
                    *sessions_delta.entry(target).or_insert(0.0) += hours * coef;
                    if adds_faltas {
                        general_faltas_delta += hours * coef;
                        *faltas_delta.entry(target).or_insert(0.0) += hours * coef;
                    }
                }
            }
        }
    }

    let general = projection(
        base_sessions,
        base_faltas,
        base_sessions + general_sessions_delta,
        base_faltas + general_faltas_delta,
    );

    let by_module = snapshot
        .distribution
        .module_calculations
        .iter()
        .map(|(code, calc)| {
            let ds = sessions_delta.get(code.as_str()).copied().unwrap_or(0.0);
            let df = faltas_delta.get(code.as_str()).copied().unwrap_or(0.0);
            ModuleProjection {
                code: code.clone(),
                label: snapshot.label_for(code).to_string(),
                projection: projection(
                    calc.total_sessions,
                    calc.total_faltas,
                    calc.total_sessions + ds,
                    calc.total_faltas + df,
                ),
            }
        })
        .collect();

    PlanResponse { general, by_module }
}

/// Single-scenario query: "what if `added_absences` more hours of this
/// module are missed". Returns general and module totals, plus the per-target
/// breakdown when the module is a reto.
pub fn calculate(
    snapshot: &DistributedSnapshot,
    module_code: &str,
    added_absences: f64,
) -> Result<CalculateResponse> {
    if !added_absences.is_finite() || added_absences < 0.0 {
        return Err(AppError::validation("added absence count must be >= 0"));
    }
    let aggregated = &snapshot.raw.aggregated;
    let Some(module_stats) = aggregated.modules.get(module_code) else {
        return Err(AppError::validation(format!(
            "unknown module code: {module_code}"
        )));
    };

    let general_sessions: f64 = aggregated
        .modules
        .values()
        .map(|m| f64::from(m.sessions_given))
        .sum();
    let general_faltas = weighted_faltas(&aggregated.absence_totals);
    let general = scope_totals(general_sessions, general_faltas, added_absences);

    let module_is_reto = is_reto(module_code, Some(snapshot.label_for(module_code)));
    let (module_sessions, module_faltas) = match snapshot
        .distribution
        .module_calculations
        .get(module_code)
    {
        Some(calc) if !module_is_reto => (calc.total_sessions, calc.total_faltas),
        _ => (
            f64::from(module_stats.sessions_given),
            weighted_faltas(&module_stats.absence_counts),
        ),
    };
    let module = scope_totals(module_sessions, module_faltas, added_absences);

    let reto_analysis = module_is_reto.then(|| {
        let targets = snapshot
            .coefficients_for(module_code)
            .into_iter()
            .flatten()
            .filter_map(|(target, coef)| {
                let calc = snapshot.distribution.module_calculations.get(target)?;
                Some(RetoTargetProjection {
                    code: target.clone(),
                    label: snapshot.label_for(target).to_string(),
                    current: percent(calc.total_faltas, calc.total_sessions),
                    projected: percent(
                        calc.total_faltas + added_absences * coef,
                        calc.total_sessions,
                    ),
                    sessions: calc.total_sessions,
                })
            })
            .collect();

        RetoAnalysis {
            current: percent(module_faltas, module_sessions),
            projected: percent(module_faltas + added_absences, module_sessions),
            sessions: round2(module_sessions),
            targets,
        }
    });

    let module_meta = aggregated
        .modules
        .iter()
        .map(|(code, stats)| {
            let label = snapshot.label_for(code);
            let reto = is_reto(code, Some(label));
            let sessions = match snapshot.distribution.module_calculations.get(code) {
                Some(calc) if !reto => calc.total_sessions,
                _ => f64::from(stats.sessions_given),
            };
            ModuleMeta {
                code: code.clone(),
                label: label.to_string(),
                sessions,
                direct_faltas: round2(weighted_faltas(&stats.absence_counts)),
                is_reto: reto,
                group: extract_group_token(code).or_else(|| extract_group_token(label)),
            }
        })
        .collect();

    Ok(CalculateResponse {
        general,
        module,
        reto_analysis,
        module_meta,
    })
}

fn projection(
    base_sessions: f64,
    base_faltas: f64,
    projected_sessions: f64,
    projected_faltas: f64,
) -> ProjectionTriple {
    let base = CountSnapshot {
        sessions: round2(base_sessions),
        faltas: round2(base_faltas),
        percent: percent(base_faltas, base_sessions),
    };
    let projected = CountSnapshot {
        sessions: round2(projected_sessions),
        faltas: round2(projected_faltas),
        percent: percent(projected_faltas, projected_sessions),
    };
    let delta = CountSnapshot {
        sessions: round2(projected_sessions - base_sessions),
        faltas: round2(projected_faltas - base_faltas),
        // percentage-point movement, not the percent of the delta counts
        percent: round2(projected.percent - base.percent),
    };
    ProjectionTriple {
        base,
        projected,
        delta,
    }
}

fn scope_totals(sessions: f64, faltas: f64, added: f64) -> ScopeTotals {
    ScopeTotals {
        total_sessions: round2(sessions),
        total_faltas: round2(faltas),
        current_percent: percent(faltas, sessions),
        projected_percent: percent(faltas + added, sessions),
    }
}
