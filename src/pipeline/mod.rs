// src/pipeline/mod.rs

//! End-to-end flows: full synchronization and snapshot reload.

pub mod status;
pub mod sync;

pub use status::{config_status, ConfigStatus};
pub use sync::{load_processed, run_sync, SyncReport};
