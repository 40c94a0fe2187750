// src/pipeline/status.rs

//! Configuration status advisory.
//!
//! Missing hour weights never block use of already-crawled data; they only
//! degrade the distribution (equal-split fallback). The advisory lists the
//! specific missing pieces so a frontend can prompt for them.

use serde::Serialize;

use crate::models::{DistributedSnapshot, StudentConfig};

/// Non-blocking advisory about incomplete per-student configuration.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConfigStatus {
    /// False when any advisory applies
    pub configured: bool,

    /// Human-readable list of what is missing
    pub reasons: Vec<String>,
}

/// Inspect a snapshot against the student's configuration.
pub fn config_status(snapshot: &DistributedSnapshot, config: &StudentConfig) -> ConfigStatus {
    let mut reasons = Vec::new();

    if config.schedule_missing() {
        reasons.push("schedule not configured".to_string());
    }

    for reto in &snapshot.distribution.retos {
        if config.selected_targets(&reto.code).is_none() {
            reasons.push(format!("challenge {} has no assigned modules", reto.code));
        }
    }

    ConfigStatus {
        configured: reasons.is_empty(),
        reasons,
    }
}
