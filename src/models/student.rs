// src/models/student.rs

//! Per-student configuration supplied by the external configuration store.
//!
//! Read-only input to the distribution engine; the persisted JSON documents
//! (`hoursPerModule.json`, `retoTargets.json`, `retoModuleHours.json`) are the
//! source of truth, never the computed coefficients.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Hour weights and reto target selection for one student.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StudentConfig {
    /// Subject code -> general weekly hours
    #[serde(default)]
    pub hours_per_module: BTreeMap<String, f64>,

    /// Reto code -> subject code -> selected as distribution target
    #[serde(default)]
    pub reto_targets: BTreeMap<String, BTreeMap<String, bool>>,

    /// Reto code -> subject code -> hour override for that reto only
    #[serde(default)]
    pub reto_module_hours: BTreeMap<String, BTreeMap<String, f64>>,
}

impl StudentConfig {
    /// Weight input for `module` when distributing `reto`: the reto-specific
    /// override if configured, else the module's general weekly hours, else 0.
    pub fn weight_for(&self, reto: &str, module: &str) -> f64 {
        self.reto_module_hours
            .get(reto)
            .and_then(|m| m.get(module))
            .or_else(|| self.hours_per_module.get(module))
            .copied()
            .unwrap_or(0.0)
            .max(0.0)
    }

    /// Subject codes explicitly marked as targets for `reto`, if any are.
    pub fn selected_targets(&self, reto: &str) -> Option<Vec<&str>> {
        let selection = self.reto_targets.get(reto)?;
        let selected: Vec<&str> = selection
            .iter()
            .filter(|&(_, &on)| on)
            .map(|(code, _)| code.as_str())
            .collect();
        if selected.is_empty() {
            None
        } else {
            Some(selected)
        }
    }

    /// True if no weekly hours are configured, or every configured value is 0.
    pub fn schedule_missing(&self) -> bool {
        self.hours_per_module.is_empty()
            || self.hours_per_module.values().all(|&h| h == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_beats_general_hours() {
        let mut cfg = StudentConfig::default();
        cfg.hours_per_module.insert("M1".into(), 4.0);
        cfg.reto_module_hours
            .entry("2DM3".into())
            .or_default()
            .insert("M1".into(), 2.0);

        assert_eq!(cfg.weight_for("2DM3", "M1"), 2.0);
        assert_eq!(cfg.weight_for("1GB2", "M1"), 4.0);
        assert_eq!(cfg.weight_for("2DM3", "M9"), 0.0);
    }

    #[test]
    fn all_false_selection_means_no_targets() {
        let mut cfg = StudentConfig::default();
        cfg.reto_targets
            .entry("2DM3".into())
            .or_default()
            .insert("M1".into(), false);

        assert!(cfg.selected_targets("2DM3").is_none());

        cfg.reto_targets
            .get_mut("2DM3")
            .unwrap()
            .insert("M2".into(), true);
        assert_eq!(cfg.selected_targets("2DM3"), Some(vec!["M2"]));
    }

    #[test]
    fn schedule_missing_detection() {
        let mut cfg = StudentConfig::default();
        assert!(cfg.schedule_missing());

        cfg.hours_per_module.insert("M1".into(), 0.0);
        assert!(cfg.schedule_missing());

        cfg.hours_per_module.insert("M2".into(), 3.0);
        assert!(!cfg.schedule_missing());
    }
}
