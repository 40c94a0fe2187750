// src/stats/distribute.rs

//! Reto distribution: spreading challenge-module absences onto the ordinary
//! subjects they stand in for.
//!
//! Coefficients are kept at full precision so they sum to 1 per reto; only
//! the final per-module totals are rounded to 2 decimals.

use std::collections::BTreeMap;

use crate::models::{
    AggregatedStats, Distribution, Legend, ModuleCalculation, RetoInfo, StudentConfig,
};
use crate::stats::{extract_group_token, is_reto, round2};
use crate::utils::{code_weight, weighted_faltas};

/// Compute coefficients and per-module direct/derived breakdowns.
pub fn distribute(
    aggregated: &AggregatedStats,
    legend: &Legend,
    config: &StudentConfig,
) -> Distribution {
    let label_of = |code: &str| legend.modules.get(code).map(String::as_str);

    let mut retos = Vec::new();
    let mut ordinary = Vec::new();
    for code in aggregated.modules.keys() {
        if is_reto(code, label_of(code)) {
            retos.push(RetoInfo {
                code: code.clone(),
                label: label_of(code).unwrap_or(code).to_string(),
                group: extract_group_token(code)
                    .or_else(|| label_of(code).and_then(extract_group_token)),
            });
        } else {
            ordinary.push(code.clone());
        }
    }

    let mut coefficients: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    for reto in &retos {
        let coefs = coefficients_for(&reto.code, &ordinary, config);
        if !coefs.is_empty() {
            coefficients.insert(reto.code.clone(), coefs);
        }
    }

    let mut module_calculations: BTreeMap<String, ModuleCalculation> = BTreeMap::new();
    for code in &ordinary {
        let stats = &aggregated.modules[code];
        let mut calc = ModuleCalculation {
            direct_faltas: weighted_faltas(&stats.absence_counts),
            direct_sessions: f64::from(stats.sessions_given),
            ..ModuleCalculation::default()
        };

        for reto in &retos {
            let Some(coef) = coefficients.get(&reto.code).and_then(|c| c.get(code)) else {
                continue;
            };
            if *coef == 0.0 {
                continue;
            }
            let reto_stats = &aggregated.modules[&reto.code];
            calc.derived_faltas += weighted_faltas(&reto_stats.absence_counts) * coef;
            calc.derived_sessions += f64::from(reto_stats.sessions_given) * coef;

            for (absence_code, &count) in &reto_stats.absence_counts {
                let contribution = f64::from(count) * code_weight(absence_code) * coef;
                if contribution > 0.0 {
                    *calc.derived_by_type.entry(absence_code.clone()).or_insert(0.0) +=
                        contribution;
                }
            }
        }

        calc.total_faltas = round2(calc.direct_faltas + calc.derived_faltas);
        calc.total_sessions = round2(calc.direct_sessions + calc.derived_sessions);
        module_calculations.insert(code.clone(), calc);
    }

    Distribution {
        retos,
        coefficients,
        module_calculations,
    }
}

/// Weight inputs per target: reto-specific hour override, else general weekly
/// hours, else 0. Zero total weight falls back to an equal split.
fn coefficients_for(
    reto: &str,
    ordinary: &[String],
    config: &StudentConfig,
) -> BTreeMap<String, f64> {
    let targets: Vec<&str> = match config.selected_targets(reto) {
        Some(selected) => selected
            .into_iter()
            .filter(|t| ordinary.iter().any(|o| o == t))
            .collect(),
        None => ordinary.iter().map(String::as_str).collect(),
    };
    if targets.is_empty() {
        return BTreeMap::new();
    }

    let weights: Vec<f64> = targets
        .iter()
        .map(|t| config.weight_for(reto, t))
        .collect();
    let sum: f64 = weights.iter().sum();

    if sum > 0.0 {
        targets
            .iter()
            .zip(&weights)
            .map(|(t, w)| (t.to_string(), w / sum))
            .collect()
    } else {
        let equal = 1.0 / targets.len() as f64;
        targets.iter().map(|t| (t.to_string(), equal)).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use super::*;
    use crate::models::ModuleStats;

    fn stats_with(modules: Vec<(&str, u32, Vec<(&str, u32)>)>) -> AggregatedStats {
        let mut aggregated = AggregatedStats::default();
        for (code, sessions, absences) in modules {
            let mut counts = HashMap::new();
            for (absence_code, n) in absences {
                counts.insert(absence_code.to_string(), n);
                *aggregated
                    .absence_totals
                    .entry(absence_code.to_string())
                    .or_insert(0) += n;
            }
            aggregated.modules.insert(
                code.to_string(),
                ModuleStats {
                    sessions_given: sessions,
                    absence_counts: counts,
                },
            );
        }
        aggregated
    }

    #[test]
    fn equal_split_fallback() {
        // reto 2DM3 weighted total 9, no hours configured anywhere
        let aggregated = stats_with(vec![
            ("2DM3", 12, vec![("F", 9)]),
            ("M1", 10, vec![]),
            ("M2", 10, vec![]),
            ("M3", 10, vec![]),
        ]);
        let dist = distribute(&aggregated, &Legend::default(), &StudentConfig::default());

        let coefs = &dist.coefficients["2DM3"];
        assert_eq!(coefs.len(), 3);
        for c in coefs.values() {
            assert!((c - 1.0 / 3.0).abs() < 1e-9);
        }
        for code in ["M1", "M2", "M3"] {
            assert!((dist.module_calculations[code].derived_faltas - 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn weighted_split_follows_hours() {
        // weighted total 10, hours M1=2 M2=3
        let aggregated = stats_with(vec![
            ("2DM3", 15, vec![("F", 10)]),
            ("M1", 10, vec![]),
            ("M2", 10, vec![]),
        ]);
        let config = StudentConfig {
            hours_per_module: BTreeMap::from([
                ("M1".to_string(), 2.0),
                ("M2".to_string(), 3.0),
            ]),
            ..StudentConfig::default()
        };
        let dist = distribute(&aggregated, &Legend::default(), &config);

        let coefs = &dist.coefficients["2DM3"];
        assert!((coefs["M1"] - 0.4).abs() < 1e-9);
        assert!((coefs["M2"] - 0.6).abs() < 1e-9);
        assert!((dist.module_calculations["M1"].derived_faltas - 4.0).abs() < 1e-9);
        assert!((dist.module_calculations["M2"].derived_faltas - 6.0).abs() < 1e-9);
    }

    #[test]
    fn coefficients_sum_to_one() {
        let aggregated = stats_with(vec![
            ("2DM3", 5, vec![("F", 1)]),
            ("1AB2", 5, vec![("R", 3)]),
            ("M1", 10, vec![]),
            ("M2", 10, vec![]),
            ("M3", 10, vec![]),
        ]);
        let config = StudentConfig {
            hours_per_module: BTreeMap::from([
                ("M1".to_string(), 7.0),
                ("M2".to_string(), 1.0),
                ("M3".to_string(), 5.0),
            ]),
            reto_module_hours: BTreeMap::from([(
                "1AB2".to_string(),
                BTreeMap::from([("M1".to_string(), 2.5)]),
            )]),
            ..StudentConfig::default()
        };
        let dist = distribute(&aggregated, &Legend::default(), &config);

        for coefs in dist.coefficients.values() {
            let sum: f64 = coefs.values().sum();
            assert!((sum - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn explicit_targets_limit_the_split() {
        let aggregated = stats_with(vec![
            ("2DM3", 6, vec![("F", 6)]),
            ("M1", 10, vec![]),
            ("M2", 10, vec![]),
        ]);
        let config = StudentConfig {
            reto_targets: BTreeMap::from([(
                "2DM3".to_string(),
                BTreeMap::from([("M1".to_string(), true), ("M2".to_string(), false)]),
            )]),
            ..StudentConfig::default()
        };
        let dist = distribute(&aggregated, &Legend::default(), &config);

        assert_eq!(dist.coefficients["2DM3"].len(), 1);
        assert!((dist.module_calculations["M1"].derived_faltas - 6.0).abs() < 1e-9);
        assert_eq!(dist.module_calculations["M2"].derived_faltas, 0.0);
    }

    #[test]
    fn justified_absences_never_derive_and_late_counts_a_third() {
        let aggregated = stats_with(vec![
            ("2DM3", 9, vec![("J", 6), ("R", 3)]),
            ("M1", 10, vec![]),
        ]);
        let dist = distribute(&aggregated, &Legend::default(), &StudentConfig::default());

        let calc = &dist.module_calculations["M1"];
        // weighted total = 0 + 3/3 = 1, single target gets it all
        assert!((calc.derived_faltas - 1.0).abs() < 1e-9);
        assert!(!calc.derived_by_type.contains_key("J"));
        assert!((calc.derived_by_type["R"] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn totals_are_direct_plus_derived() {
        let aggregated = stats_with(vec![
            ("2DM3", 7, vec![("F", 2)]),
            ("M1", 40, vec![("F", 3), ("R", 3)]),
            ("M2", 30, vec![]),
        ]);
        let dist = distribute(&aggregated, &Legend::default(), &StudentConfig::default());

        for calc in dist.module_calculations.values() {
            let exact_faltas = calc.direct_faltas + calc.derived_faltas;
            let exact_sessions = calc.direct_sessions + calc.derived_sessions;
            assert!((calc.total_faltas - exact_faltas).abs() < 0.005 + 1e-9);
            assert!((calc.total_sessions - exact_sessions).abs() < 0.005 + 1e-9);
        }
        // M1 direct weighted: 3 + 3/3 = 4
        assert!((dist.module_calculations["M1"].direct_faltas - 4.0).abs() < 1e-9);
    }

    #[test]
    fn distribution_is_idempotent() {
        let aggregated = stats_with(vec![
            ("2DM3", 9, vec![("F", 4), ("R", 2)]),
            ("M1", 20, vec![("F", 1)]),
            ("M2", 25, vec![]),
        ]);
        let config = StudentConfig {
            hours_per_module: BTreeMap::from([
                ("M1".to_string(), 3.0),
                ("M2".to_string(), 4.0),
            ]),
            ..StudentConfig::default()
        };

        let first = distribute(&aggregated, &Legend::default(), &config);
        let second = distribute(&aggregated, &Legend::default(), &config);
        assert_eq!(first.module_calculations, second.module_calculations);
        assert_eq!(first.coefficients, second.coefficients);
    }

    #[test]
    fn reto_detected_via_legend_label() {
        let aggregated = stats_with(vec![
            ("RT", 4, vec![("F", 2)]),
            ("M1", 10, vec![]),
        ]);
        let legend = Legend {
            modules: BTreeMap::from([(
                "RT".to_string(),
                "Retos Transversales 2DM3".to_string(),
            )]),
            absence_types: BTreeMap::new(),
        };
        let dist = distribute(&aggregated, &legend, &StudentConfig::default());

        assert_eq!(dist.retos.len(), 1);
        assert_eq!(dist.retos[0].code, "RT");
        assert_eq!(dist.retos[0].group.as_deref(), Some("2DM3"));
        assert!(!dist.module_calculations.contains_key("RT"));
    }
}
