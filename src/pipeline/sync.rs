// src/pipeline/sync.rs

//! Full synchronization: authenticate, crawl the academic year, aggregate,
//! distribute, persist.
//!
//! Every sync rebuilds the snapshot from scratch. The raw crawl result is
//! what gets persisted; the distribution is recomputed from the stored
//! per-student configuration on load, so edited hours take effect without
//! re-crawling.

use chrono::NaiveDate;

use crate::error::{AppError, Result};
use crate::models::{Config, DistributedSnapshot, RawSnapshot};
use crate::pipeline::status::{config_status, ConfigStatus};
use crate::services::{Role, SessionClient, WeekCrawler};
use crate::stats::{aggregate, distribute};
use crate::storage::SnapshotStorage;
use crate::utils::{academic_year_range, enumerate_mondays};

/// Outcome of one synchronization run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub snapshot: DistributedSnapshot,
    pub config_status: ConfigStatus,
    pub attempted_weeks: usize,
    /// Monday dates that failed all retry attempts
    pub failed_weeks: Vec<NaiveDate>,
    /// Session token as of the end of the crawl (the portal may renew it)
    pub session_token: Option<String>,
}

/// Run a full synchronization for one student.
pub async fn run_sync(
    config: &Config,
    storage: &dyn SnapshotStorage,
    role: Role,
    username: &str,
    password: &str,
    today: NaiveDate,
) -> Result<SyncReport> {
    config.validate()?;
    if username.trim().is_empty() {
        return Err(AppError::validation("username is empty"));
    }

    let session = SessionClient::new(&config.portal)?;
    session.authenticate(role, username, password).await?;

    let (start, end) = academic_year_range(today);
    let mondays = enumerate_mondays(start, end);
    log::info!(
        "Crawling {} weeks ({} to {})",
        mondays.len(),
        start,
        end
    );

    let crawler = WeekCrawler::new(config.crawler.clone());
    let outcome = crawler.crawl(&session, &mondays).await?;
    if !outcome.failed_weeks.is_empty() {
        log::warn!(
            "{}/{} weeks failed and were skipped",
            outcome.failed_weeks.len(),
            outcome.attempted_weeks
        );
    }

    let aggregated = aggregate(&outcome.weeks, &outcome.legend);
    let raw = RawSnapshot {
        identity: outcome.identity,
        legend: outcome.legend,
        percentages: outcome.percentages,
        weeks: outcome.weeks,
        aggregated,
    };

    let dni = if raw.identity.dni.is_empty() {
        username.to_string()
    } else {
        raw.identity.dni.clone()
    };
    storage.save_snapshot(&dni, &raw).await?;

    let student_config = storage.load_student_config(&dni).await?;
    let distribution = distribute(&raw.aggregated, &raw.legend, &student_config);
    let snapshot = DistributedSnapshot { raw, distribution };
    let config_status = config_status(&snapshot, &student_config);

    Ok(SyncReport {
        snapshot,
        config_status,
        attempted_weeks: outcome.attempted_weeks,
        failed_weeks: outcome.failed_weeks,
        session_token: session.session(),
    })
}

/// Load the persisted snapshot for a student and re-apply the distribution
/// with the current configuration.
pub async fn load_processed(
    storage: &dyn SnapshotStorage,
    dni: &str,
) -> Result<Option<(DistributedSnapshot, ConfigStatus)>> {
    let Some(raw) = storage.load_snapshot(dni).await? else {
        return Ok(None);
    };

    let student_config = storage.load_student_config(dni).await?;
    let distribution = distribute(&raw.aggregated, &raw.legend, &student_config);
    let snapshot = DistributedSnapshot { raw, distribution };
    let status = config_status(&snapshot, &student_config);

    Ok(Some((snapshot, status)))
}
