// src/models/plan.rs

//! Request and response shapes of the calculation surface.

use serde::{Deserialize, Serialize};

/// What a hypothetical plan entry adds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanKind {
    /// Extra missed hours: raises both sessions and faltas
    Absence,
    /// Extra attended hours: raises sessions only
    Attendance,
}

/// Where a plan entry applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanScope {
    General,
    Module,
    Reto,
}

/// One hypothetical "what if" entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanEntry {
    pub kind: PlanKind,
    pub scope: PlanScope,

    /// Subject or reto code; required unless scope is `general`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Hours added by this entry
    pub hours: f64,
}

/// A sessions/faltas pair with its percentage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CountSnapshot {
    pub sessions: f64,
    pub faltas: f64,
    pub percent: f64,
}

/// Base state, projected state, and their difference.
///
/// `delta.percent` is the percentage-point movement (projected minus base),
/// not the percentage of the delta counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectionTriple {
    pub base: CountSnapshot,
    pub projected: CountSnapshot,
    pub delta: CountSnapshot,
}

/// Projection for one ordinary subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleProjection {
    pub code: String,
    pub label: String,
    #[serde(flatten)]
    pub projection: ProjectionTriple,
}

/// Response of the multi-entry plan computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResponse {
    pub general: ProjectionTriple,
    pub by_module: Vec<ModuleProjection>,
}

/// Current and projected totals for one scope of the single-scenario query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeTotals {
    pub total_sessions: f64,
    pub total_faltas: f64,
    pub current_percent: f64,
    pub projected_percent: f64,
}

/// Per-target breakdown when the queried module is a reto.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetoTargetProjection {
    pub code: String,
    pub label: String,
    pub current: f64,
    pub projected: f64,
    pub sessions: f64,
}

/// Reto-specific analysis of the single-scenario query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetoAnalysis {
    pub current: f64,
    pub projected: f64,
    pub sessions: f64,
    pub targets: Vec<RetoTargetProjection>,
}

/// Metadata row for every known subject, for UI-facing selection lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleMeta {
    pub code: String,
    pub label: String,
    pub sessions: f64,
    pub direct_faltas: f64,
    pub is_reto: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// Response of the single-scenario query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculateResponse {
    pub general: ScopeTotals,
    pub module: ScopeTotals,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reto_analysis: Option<RetoAnalysis>,
    pub module_meta: Vec<ModuleMeta>,
}
