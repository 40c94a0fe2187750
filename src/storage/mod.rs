// src/storage/mod.rs

//! Persistence contracts for snapshots and per-student configuration.

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{RawSnapshot, StudentConfig};

pub use local::LocalStorage;

/// Snapshot and per-student configuration persistence.
///
/// Snapshots are stored raw; the distribution is recomputed from the stored
/// configuration on load, so edited hours take effect without re-crawling.
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Persist the crawl result for a student.
    async fn save_snapshot(&self, dni: &str, snapshot: &RawSnapshot) -> Result<()>;

    /// Load the last persisted snapshot, `None` if the student has none.
    async fn load_snapshot(&self, dni: &str) -> Result<Option<RawSnapshot>>;

    /// Persist the student's hour weights and reto target selection.
    async fn save_student_config(&self, dni: &str, config: &StudentConfig) -> Result<()>;

    /// Load the student's configuration, defaulting missing pieces.
    async fn load_student_config(&self, dni: &str) -> Result<StudentConfig>;
}
