// src/storage/local.rs

//! Local filesystem storage backend.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! └── {dni}/
//!     ├── snapshot.json          # Raw crawl result
//!     ├── hoursPerModule.json    # General weekly hours per subject
//!     ├── retoTargets.json       # Per-reto target selection
//!     └── retoModuleHours.json   # Per-reto hour overrides
//! ```
//!
//! All writes are atomic (temp file then rename) so a crash mid-write never
//! leaves a truncated document behind. The three configuration documents are
//! stored separately so each can be edited independently.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{RawSnapshot, StudentConfig};
use crate::storage::SnapshotStorage;

const SNAPSHOT_FILE: &str = "snapshot.json";
const HOURS_FILE: &str = "hoursPerModule.json";
const TARGETS_FILE: &str = "retoTargets.json";
const RETO_HOURS_FILE: &str = "retoModuleHours.json";

/// Per-student JSON documents under a root directory.
#[derive(Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    fn student_path(&self, dni: &str, file: &str) -> Result<PathBuf> {
        // the identifier becomes a directory name, so reject anything that
        // could escape the root
        if dni.is_empty() || !dni.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::validation(format!(
                "invalid student identifier: {dni:?}"
            )));
        }
        Ok(self.root_dir.join(dni).join(file))
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &PathBuf, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn write_json<T: Serialize + ?Sized>(&self, path: &PathBuf, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(path, &bytes).await
    }

    /// Read JSON, returning None if the file doesn't exist.
    async fn read_json<T: DeserializeOwned>(&self, path: &PathBuf) -> Result<Option<T>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl SnapshotStorage for LocalStorage {
    async fn save_snapshot(&self, dni: &str, snapshot: &RawSnapshot) -> Result<()> {
        let path = self.student_path(dni, SNAPSHOT_FILE)?;
        self.write_json(&path, snapshot).await?;
        log::info!(
            "Snapshot with {} weeks written for {}",
            snapshot.weeks.len(),
            dni
        );
        Ok(())
    }

    async fn load_snapshot(&self, dni: &str) -> Result<Option<RawSnapshot>> {
        let path = self.student_path(dni, SNAPSHOT_FILE)?;
        self.read_json(&path).await
    }

    async fn save_student_config(&self, dni: &str, config: &StudentConfig) -> Result<()> {
        let hours = self.student_path(dni, HOURS_FILE)?;
        self.write_json(&hours, &config.hours_per_module).await?;

        let targets = self.student_path(dni, TARGETS_FILE)?;
        self.write_json(&targets, &config.reto_targets).await?;

        let reto_hours = self.student_path(dni, RETO_HOURS_FILE)?;
        self.write_json(&reto_hours, &config.reto_module_hours).await?;

        Ok(())
    }

    async fn load_student_config(&self, dni: &str) -> Result<StudentConfig> {
        let hours = self.student_path(dni, HOURS_FILE)?;
        let targets = self.student_path(dni, TARGETS_FILE)?;
        let reto_hours = self.student_path(dni, RETO_HOURS_FILE)?;

        Ok(StudentConfig {
            hours_per_module: self.read_json(&hours).await?.unwrap_or_default(),
            reto_targets: self.read_json(&targets).await?.unwrap_or_default(),
            reto_module_hours: self.read_json(&reto_hours).await?.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::models::{AggregatedStats, Identity, Legend, Percentages};
    use tempfile::TempDir;

    fn snapshot() -> RawSnapshot {
        RawSnapshot {
            identity: Identity {
                full_name: "GARCIA LOPEZ MIKEL".to_string(),
                dni: "12345678Z".to_string(),
                group: Some("2DAM - D".to_string()),
            },
            legend: Legend::default(),
            percentages: Percentages::default(),
            weeks: Vec::new(),
            aggregated: AggregatedStats::default(),
        }
    }

    #[tokio::test]
    async fn snapshot_round_trip() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.save_snapshot("12345678Z", &snapshot()).await.unwrap();
        let loaded = storage.load_snapshot("12345678Z").await.unwrap().unwrap();
        assert_eq!(loaded.identity.full_name, "GARCIA LOPEZ MIKEL");
    }

    #[tokio::test]
    async fn missing_snapshot_is_none() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let loaded = storage.load_snapshot("12345678Z").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn student_config_round_trip() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let config = StudentConfig {
            hours_per_module: BTreeMap::from([("M1".to_string(), 5.0)]),
            reto_targets: BTreeMap::from([(
                "2DM3".to_string(),
                BTreeMap::from([("M1".to_string(), true)]),
            )]),
            reto_module_hours: BTreeMap::new(),
        };
        storage.save_student_config("12345678Z", &config).await.unwrap();

        let loaded = storage.load_student_config("12345678Z").await.unwrap();
        assert_eq!(loaded.hours_per_module.get("M1"), Some(&5.0));
        assert_eq!(loaded.reto_targets["2DM3"].get("M1"), Some(&true));
    }

    #[tokio::test]
    async fn missing_config_defaults_empty() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let loaded = storage.load_student_config("12345678Z").await.unwrap();
        assert!(loaded.hours_per_module.is_empty());
        assert!(loaded.schedule_missing());
    }

    #[tokio::test]
    async fn rejects_path_escaping_identifiers() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        assert!(storage.load_snapshot("").await.is_err());
        assert!(storage.load_snapshot("../evil").await.is_err());
    }
}
