// src/lib.rs

//! faltas-sync Library
//!
//! Crawls the faltas attendance portal one page per academic week, parses the
//! server-rendered HTML into structured attendance data, and computes
//! reto-distributed statistics and what-if projections.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod stats;
pub mod storage;
pub mod utils;
