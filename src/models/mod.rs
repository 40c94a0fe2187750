// src/models/mod.rs

//! Domain models for the synchronization engine.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod plan;
mod snapshot;
mod student;

// Re-export all public types
pub use config::{Config, CrawlerConfig, PortalConfig};
pub use plan::{
    CalculateResponse, CountSnapshot, ModuleMeta, ModuleProjection, PlanEntry, PlanKind,
    PlanResponse, PlanScope, ProjectionTriple, RetoAnalysis, RetoTargetProjection, ScopeTotals,
};
pub use snapshot::{
    default_week_index, AggregatedStats, DistributedSnapshot, Distribution, Identity, Legend,
    ModuleCalculation, ModuleStats, Percentages, RawSnapshot, RetoInfo, SessionCell, WeekSessions,
};
pub use student::StudentConfig;
